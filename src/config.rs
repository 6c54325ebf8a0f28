//! Index configuration.
//!
//! The configuration is serializable so it can be loaded from JSON or any
//! other serde format.
//!
//! # Example
//!
//! ```rust
//! use poidex::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.page_capacity, 32);
//!
//! let json = r#"{ "page_capacity": 16 }"#;
//! let config: Config = serde_json::from_str(json).unwrap();
//! assert_eq!(config.page_capacity, 16);
//! assert_eq!(config.cooperating_siblings, 2);
//! ```

use serde::{Deserialize, Serialize};

/// Tuning knobs for the Hilbert R-tree and the category-aware indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of entries a page holds before its sibling window must
    /// cooperate. Pages are split only when the whole window is full.
    #[serde(default = "Config::default_page_capacity")]
    pub page_capacity: usize,

    /// Number of neighboring pages consulted during overflow and underflow
    /// handling. The cooperation window spans `cooperating_siblings + 1`
    /// pages.
    #[serde(default = "Config::default_cooperating_siblings")]
    pub cooperating_siblings: usize,

    /// Multiplier applied to category order numbers before they are used as
    /// the third axis of a combined location/category key.
    #[serde(default = "Config::default_category_spread_factor")]
    pub category_spread_factor: u32,
}

impl Config {
    const fn default_page_capacity() -> usize {
        32
    }

    const fn default_cooperating_siblings() -> usize {
        2
    }

    const fn default_category_spread_factor() -> u32 {
        5
    }

    /// Set the page capacity.
    pub fn with_page_capacity(mut self, capacity: usize) -> Self {
        self.page_capacity = capacity;
        self
    }

    /// Set the number of cooperating siblings.
    pub fn with_cooperating_siblings(mut self, siblings: usize) -> Self {
        self.cooperating_siblings = siblings;
        self
    }

    /// Set the category spread factor.
    pub fn with_category_spread_factor(mut self, factor: u32) -> Self {
        self.category_spread_factor = factor;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.page_capacity < 2 {
            return Err("Page capacity must be at least 2".to_string());
        }
        if self.cooperating_siblings < 1 {
            return Err("At least one cooperating sibling is required".to_string());
        }
        if self.category_spread_factor < 1 {
            return Err("Category spread factor must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_capacity: Self::default_page_capacity(),
            cooperating_siblings: Self::default_cooperating_siblings(),
            category_spread_factor: Self::default_category_spread_factor(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = Config::default()
            .with_page_capacity(8)
            .with_cooperating_siblings(3)
            .with_category_spread_factor(10);
        assert_eq!(config.page_capacity, 8);
        assert_eq!(config.cooperating_siblings, 3);
        assert_eq!(config.category_spread_factor, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::default().with_page_capacity(1).validate().is_err());
        assert!(
            Config::default()
                .with_cooperating_siblings(0)
                .validate()
                .is_err()
        );
        assert!(
            Config::default()
                .with_category_spread_factor(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.page_capacity, 32);
        assert_eq!(config.cooperating_siblings, 2);
        assert_eq!(config.category_spread_factor, 5);
    }
}
