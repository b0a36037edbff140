//! Application configuration.
//!
//! Sources, lowest priority first: built-in defaults, an optional
//! `salesdesk.toml` (or the file named by `SALESDESK_CONFIG`), then
//! `SALESDESK_*` environment variables.

use serde::Deserialize;

use salesdesk_forecast::MissingProductPolicy;
use salesdesk_observability::LogFormat;
use salesdesk_products::Category;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_CONFIG_FILE: &str = "salesdesk";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Postgres connection string. In-memory stores are used when absent.
    pub database_url: Option<String>,
    pub missing_product_policy: MissingProductPolicy,
    /// Item groups always shown on the dashboard, even with no sales.
    pub known_categories: Vec<String>,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_url: None,
            missing_product_policy: MissingProductPolicy::default(),
            known_categories: Category::KNOWN.iter().map(|c| c.to_string()).collect(),
            log_format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let file = std::env::var("SALESDESK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_sources(
            config::Config::builder()
                .add_source(config::File::with_name(&file).required(false))
                .add_source(
                    config::Environment::with_prefix("SALESDESK")
                        .try_parsing(true)
                        .list_separator(",")
                        .with_list_parse_key("known_categories"),
                ),
        )
    }

    /// Build from an arbitrary source stack; missing keys keep their defaults.
    pub fn from_sources(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.known_categories.iter().any(|c| c.trim().is_empty()) {
            return Err(config::ConfigError::Message(
                "known_categories must not contain blank entries".to_string(),
            ));
        }
        if matches!(&self.database_url, Some(url) if url.trim().is_empty()) {
            return Err(config::ConfigError::Message(
                "database_url must not be empty when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured item groups as categories; blank entries were rejected at load.
    pub fn seeded_categories(&self) -> Vec<Category> {
        self.known_categories
            .iter()
            .filter_map(|c| Category::parse(c.as_str()).ok())
            .collect()
    }
}
