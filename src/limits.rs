use crate::error::ConfigError;

/// Bounds enforced while parts are read.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Limits {
    /// Maximum size in bytes of one part header block.
    pub max_header_size: Option<usize>,
    /// Maximum number of parts in a body.
    pub max_parts: Option<usize>,
    /// Maximum size in bytes of one part body.
    pub max_part_size: Option<u64>,
}

impl Limits {
    /// Creates a permissive limits configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that every configured limit is greater than zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_header_size == Some(0) {
            return Err(ConfigError::InvalidLimitValue {
                limit: "max_header_size",
            });
        }
        if self.max_parts == Some(0) {
            return Err(ConfigError::InvalidLimitValue { limit: "max_parts" });
        }
        if self.max_part_size == Some(0) {
            return Err(ConfigError::InvalidLimitValue {
                limit: "max_part_size",
            });
        }
        Ok(())
    }

    /// Returns `true` when `size` bytes of header block are still acceptable.
    pub(crate) fn header_size_allowed(&self, size: usize) -> bool {
        self.max_header_size.map_or(true, |max| size <= max)
    }

    /// Returns `true` when a part with zero-based `index` is still acceptable.
    pub(crate) fn part_allowed(&self, index: usize) -> bool {
        let allowed = self.max_parts.map_or(true, |max| index < max);

        #[cfg(feature = "tracing")]
        if !allowed {
            tracing::debug!(index, max_parts = ?self.max_parts, "limits: part count exceeded");
        }

        allowed
    }

    /// Returns `true` when `size` bytes of part body are still acceptable.
    pub(crate) fn part_size_allowed(&self, size: u64) -> bool {
        self.max_part_size.map_or(true, |max| size <= max)
    }
}
