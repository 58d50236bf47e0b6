use std::time::Duration;

use crate::{error::ConfigError, limits::Limits, parser::DEFAULT_BUFFER_SIZE};

/// Top-level multipart decoding configuration.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartConfig {
    /// Initial read-ahead window in bytes.
    pub buffer_size: usize,
    /// Upper bound for each read from the underlying byte source.
    pub read_timeout: Option<Duration>,
    /// Accept a body whose first boundary is the closing boundary.
    pub allow_empty: bool,
    /// Size and count limits.
    pub limits: Limits,
}

impl MultipartConfig {
    /// Creates a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates buffer size and limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::InvalidBufferSize);
        }
        self.limits.validate()
    }
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            read_timeout: None,
            allow_empty: true,
            limits: Limits::default(),
        }
    }
}
