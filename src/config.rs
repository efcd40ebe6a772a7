//! Sorter configuration
//!
//! Loaded from TOML (or built in code) once per scene load. Everything here is
//! fixed for the lifetime of the sorter's buffers.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{status, tiles};
use crate::error::{SortError, SortResult};

/// Direction of the final key order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Most negative view-space z first. For a right-handed view looking down -z
    /// this is back-to-front.
    #[default]
    Ascending,
    /// Every key is bit-inverted, reversing the order.
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    /// Draw order of the sorted entries
    pub order: SortOrder,

    /// Entries per tile (one workgroup per tile on the device)
    pub tile_size: u32,

    /// Polls of a single predecessor before its raw aggregate is read instead
    pub lookback_spin_limit: u32,

    /// Vertex count written into the indirect draw record
    pub vertices_per_splat: u32,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            order: SortOrder::Ascending,
            tile_size: tiles::DEFAULT_TILE_SIZE,
            lookback_spin_limit: status::DEFAULT_SPIN_LIMIT,
            vertices_per_splat: 4,
        }
    }
}

impl SortConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> SortResult<Self> {
        let config: SortConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> SortResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|error| SortError::ConfigIo {
            path: path.display().to_string(),
            error,
        })?;

        log::debug!("[SortConfig] Loading {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> SortResult<String> {
        toml::to_string(self).map_err(|e| SortError::InvalidConfig(e.to_string()))
    }

    /// Check the settings every sorter relies on
    pub fn validate(&self) -> SortResult<()> {
        if self.tile_size == 0 || !self.tile_size.is_power_of_two() {
            return Err(SortError::InvalidConfig(format!(
                "tile_size must be a power of two, got {}",
                self.tile_size
            )));
        }

        if self.tile_size > tiles::MAX_TILE_SIZE {
            return Err(SortError::InvalidConfig(format!(
                "tile_size {} exceeds the maximum of {}",
                self.tile_size,
                tiles::MAX_TILE_SIZE
            )));
        }

        if self.lookback_spin_limit == 0 {
            return Err(SortError::InvalidConfig(
                "lookback_spin_limit must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Additional constraints of the device kernels
    pub fn validate_for_device(&self) -> SortResult<()> {
        self.validate()?;

        if self.tile_size < tiles::MIN_DEVICE_TILE_SIZE {
            return Err(SortError::InvalidConfig(format!(
                "device sorting needs tile_size >= {}, got {}",
                tiles::MIN_DEVICE_TILE_SIZE,
                self.tile_size
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = SortConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.validate_for_device().is_ok());
        assert_eq!(config.tile_size, 256);
        assert_eq!(config.order, SortOrder::Ascending);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SortConfig::from_toml_str("order = \"descending\"\n").unwrap();
        assert_eq!(config.order, SortOrder::Descending);
        assert_eq!(config.tile_size, SortConfig::default().tile_size);
        assert_eq!(config.lookback_spin_limit, SortConfig::default().lookback_spin_limit);
    }

    #[test]
    fn test_rejects_bad_tile_sizes() {
        for tile_size in [0, 3, 100, 512] {
            let config = SortConfig {
                tile_size,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "tile_size {} accepted", tile_size);
        }

        let small = SortConfig {
            tile_size: 4,
            ..Default::default()
        };
        assert!(small.validate().is_ok());
        assert!(small.validate_for_device().is_err());
    }

    #[test]
    fn test_rejects_zero_spin_limit() {
        let err = SortConfig::from_toml_str("lookback_spin_limit = 0").unwrap_err();
        assert!(matches!(err, SortError::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_order_is_parse_error() {
        let err = SortConfig::from_toml_str("order = \"sideways\"").unwrap_err();
        assert!(matches!(err, SortError::ConfigParse(_)));
    }

    #[test]
    fn test_load_from_file_round_trip() {
        let config = SortConfig {
            order: SortOrder::Descending,
            tile_size: 64,
            lookback_spin_limit: 8,
            vertices_per_splat: 6,
        };

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes()).unwrap();

        let loaded = SortConfig::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = SortConfig::load("/definitely/not/here/sort.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here/sort.toml"));
    }
}
