use crate::adapter::{sites, Selectors, SiteAdapter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown site '{0}'")]
    UnknownSite(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    // Per-site selector overrides, keyed by adapter name
    #[serde(default)]
    pub sites: HashMap<String, SelectorOverrides>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_scroll_debounce")]
    pub scroll_debounce_ms: u64,

    // Failed cards are retried on every trigger unless capped
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            scroll_debounce_ms: default_scroll_debounce(),
            max_attempts: None,
        }
    }
}

fn default_poll_interval() -> u64 {
    5000
}

fn default_scroll_debounce() -> u64 {
    300
}

/// Replacement selectors for a built-in adapter; absent fields keep the built-in value
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SelectorOverrides {
    pub card: Option<String>,
    pub price: Option<String>,
    pub discount_price: Option<String>,
    pub name: Option<String>,
    pub volume: Option<String>,
    pub price_unit: Option<String>,
    pub render_root: Option<String>,
    pub observe_root: Option<String>,
}

impl SelectorOverrides {
    pub fn apply_to(&self, selectors: &mut Selectors) {
        fn replace(target: &mut String, value: &Option<String>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }
        fn replace_opt(target: &mut Option<String>, value: &Option<String>) {
            if value.is_some() {
                *target = value.clone();
            }
        }

        replace(&mut selectors.card, &self.card);
        replace(&mut selectors.price, &self.price);
        replace(&mut selectors.name, &self.name);
        replace_opt(&mut selectors.discount_price, &self.discount_price);
        replace_opt(&mut selectors.volume, &self.volume);
        replace_opt(&mut selectors.price_unit, &self.price_unit);
        replace_opt(&mut selectors.render_root, &self.render_root);
        replace_opt(&mut selectors.observe_root, &self.observe_root);
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content)
    }

    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn empty() -> Self {
        Self {
            engine: EngineConfig::default(),
            sites: HashMap::new(),
        }
    }

    /// Every override must name a built-in adapter
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names: Vec<_> = self.sites.keys().collect();
        names.sort();
        for name in names {
            if sites::by_name(name).is_none() {
                return Err(ConfigError::UnknownSite(name.clone()));
            }
        }
        Ok(())
    }

    /// Built-in adapter `name` with this config's overrides applied
    pub fn adapter(&self, name: &str) -> Result<SiteAdapter, ConfigError> {
        let mut adapter = sites::by_name(name).ok_or_else(|| ConfigError::UnknownSite(name.to_string()))?;
        if let Some(overrides) = self.sites.get(name) {
            overrides.apply_to(&mut adapter.selectors);
        }
        Ok(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_defaults() {
        let config = Config::load_from_str("").unwrap();
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.engine.poll_interval_ms, 5000);
        assert_eq!(config.engine.scroll_debounce_ms, 300);
        assert_eq!(config.engine.max_attempts, None);
        assert!(config.sites.is_empty());
    }

    #[test]
    fn test_engine_and_site_overrides() {
        let config = Config::load_from_str(
            r##"
[engine]
poll_interval_ms = 2000
max_attempts = 3

[sites.ozon]
price = ".new-price"
observe_root = "#catalog"
"##,
        )
        .unwrap();

        assert_eq!(config.engine.poll_interval_ms, 2000);
        assert_eq!(config.engine.scroll_debounce_ms, 300);
        assert_eq!(config.engine.max_attempts, Some(3));

        let ozon = config.adapter("ozon").unwrap();
        assert_eq!(ozon.selectors.price, ".new-price");
        assert_eq!(ozon.selectors.observe_root.as_deref(), Some("#catalog"));
        assert_eq!(ozon.selectors.card, sites::ozon().selectors.card);

        // sites without overrides are untouched
        assert_eq!(config.adapter("lenta").unwrap(), sites::lenta());
    }

    #[test]
    fn test_unknown_site() {
        let err = Config::load_from_str("[sites.amazon]\ncard = \".x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSite(ref name) if name == "amazon"));
        assert!(matches!(Config::empty().adapter("amazon"), Err(ConfigError::UnknownSite(_))));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            Config::load_from_str("[engine\npoll_interval_ms = 1"),
            Err(ConfigError::Parse(_))
        ));
    }
}
