//! Configuration for the marketplace engine

use pricing_engine::RapConfig;
use serde::{Deserialize, Serialize};

/// Marketplace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Recent-average-price window configuration
    pub rap: RapConfig,

    /// Notification bus capacity
    pub event_capacity: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            rap: RapConfig::default(),
            event_capacity: 256,
        }
    }
}

impl MarketConfig {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;
        let config: MarketConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MarketConfig::default();
        assert_eq!(config.rap.window_days, 60);
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = MarketConfig::default();
        let rendered = toml::to_string(&config).unwrap();
        let parsed: MarketConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.rap.window_days, config.rap.window_days);
    }
}
