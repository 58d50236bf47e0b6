use std::time::Duration;

use tokio::io::AsyncRead;

use crate::{
    config::MultipartConfig,
    error::{ConfigError, MultipartError},
    limits::Limits,
    multipart::MultipartContent,
};

/// Builder for configuring multipart decoding.
#[derive(Debug, Clone, Default)]
pub struct MultipartBuilder {
    config: MultipartConfig,
}

impl MultipartBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current builder configuration snapshot.
    pub fn config(&self) -> &MultipartConfig {
        &self.config
    }

    /// Replaces the full builder configuration.
    pub fn with_config(mut self, config: MultipartConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the initial read-ahead window in bytes.
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.config.buffer_size = buffer_size;
        self
    }

    /// Bounds every read from the underlying byte source.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = Some(timeout);
        self
    }

    /// Sets whether a body made of only the closing boundary is accepted.
    pub fn allow_empty(mut self, allow_empty: bool) -> Self {
        self.config.allow_empty = allow_empty;
        self
    }

    /// Sets all limits at once.
    pub fn limits(mut self, limits: Limits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Sets the maximum size of one part header block.
    pub fn max_header_size(mut self, max_header_size: usize) -> Self {
        self.config.limits.max_header_size = Some(max_header_size);
        self
    }

    /// Sets the maximum number of parts.
    pub fn max_parts(mut self, max_parts: usize) -> Self {
        self.config.limits.max_parts = Some(max_parts);
        self
    }

    /// Sets the maximum size of one part body.
    pub fn max_part_size(mut self, max_part_size: u64) -> Self {
        self.config.limits.max_part_size = Some(max_part_size);
        self
    }

    /// Validates builder configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.config.validate()
    }

    /// Finalizes and returns validated configuration.
    pub fn build_config(self) -> Result<MultipartConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Builds a [`MultipartContent`] over `reader` for the given `Content-Type`.
    pub fn build<R>(
        self,
        reader: R,
        content_type: &str,
    ) -> Result<MultipartContent<R>, MultipartError>
    where
        R: AsyncRead + Unpin,
    {
        MultipartContent::with_config(reader, content_type, self.build_config()?)
    }
}
