//! Store configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;

/// Records per timer block.
pub const DEFAULT_BLOCK_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Capacity of every timer block opened by a chain
    pub block_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::with_block_capacity(DEFAULT_BLOCK_CAPACITY)
    }
}

impl StoreConfig {
    #[must_use]
    pub const fn with_block_capacity(block_capacity: usize) -> Self {
        Self { block_capacity }
    }

    /// # Errors
    /// Returns [`ConfigError::ZeroBlockCapacity`] for an empty block size.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.block_capacity == 0 {
            return Err(ConfigError::ZeroBlockCapacity);
        }
        Ok(self)
    }

    /// Load and validate a JSON config file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`StoreConfig::validate`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let read_error = |source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        };
        let content = std::fs::read_to_string(path).map_err(read_error)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()
    }
}
