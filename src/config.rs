use anyhow::{anyhow, Context, Result};
use config::{Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::BTreeMap;

const CONFIG_FILE: &str = "config/vsp";
const ENV_PREFIX: &str = "APP";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres URL; the in-memory store is used when unset
    pub url: Option<String>,
    pub max_connections: u32,
}

/// Gateway settings and process-wide transaction defaults
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Transaction registration endpoint
    pub url: String,
    /// Merchant vendor name, sent as `Vendor`
    pub vendor: Option<String>,
    /// Base for relative notification and redirect URLs
    pub base_url: Option<String>,
    /// Where the customer is sent when no better target is known
    pub default_redirect_url: Option<String>,
    pub timeout_secs: u64,
    /// Extra gateway fields sent with every transaction (e.g. `Currency`)
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
}

impl GatewayConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            vendor: None,
            base_url: None,
            default_redirect_url: None,
            timeout_secs: 30,
            defaults: BTreeMap::new(),
        }
    }

    /// Configured default redirect, or the root of `base_url`
    pub fn default_redirect_url(&self) -> String {
        match (&self.default_redirect_url, &self.base_url) {
            (Some(url), _) => url.clone(),
            (None, Some(base)) => format!("{}/", base.trim_end_matches('/')),
            (None, None) => "/".to_string(),
        }
    }

    /// Configured layer of the request field merge
    pub fn default_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        if let Some(vendor) = &self.vendor {
            fields.insert("Vendor".to_string(), vendor.clone());
        }
        fields.extend(self.defaults.clone());
        fields
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl Config {
    /// Load from `config/vsp.toml` (optional) then `APP__SECTION__KEY`
    /// environment variables, after reading any `.env` file
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let builder = Self::builder_with_defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        Self::finish(builder)
    }

    /// Load from a TOML document layered over the built-in defaults
    pub fn from_toml(source: &str) -> Result<Self> {
        let builder =
            Self::builder_with_defaults()?.add_source(File::from_str(source, FileFormat::Toml));
        Self::finish(builder)
    }

    fn builder_with_defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.environment", "development")?
            .set_default("database.max_connections", 20)?
            .set_default("gateway.timeout_secs", 30)?;
        Ok(builder)
    }

    fn finish(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let config: Config = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("server.port must be greater than 0"));
        }

        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        if self.database.max_connections == 0 {
            return Err(anyhow!("database.max_connections must be greater than 0"));
        }

        if let Some(url) = &self.database.url {
            if url.trim().is_empty() {
                return Err(anyhow!("database.url cannot be empty when set"));
            }
        }

        if self.gateway.url.trim().is_empty() {
            return Err(anyhow!("gateway.url cannot be empty"));
        }
        require_absolute("gateway.url", &self.gateway.url)?;

        if let Some(base) = &self.gateway.base_url {
            require_absolute("gateway.base_url", base)?;
        }
        if let Some(redirect) = &self.gateway.default_redirect_url {
            require_absolute("gateway.default_redirect_url", redirect)?;
        }
        if self.gateway.default_redirect_url.is_none() && self.gateway.base_url.is_none() {
            return Err(anyhow!(
                "gateway.default_redirect_url or gateway.base_url must be set"
            ));
        }

        if self.gateway.timeout_secs == 0 {
            return Err(anyhow!("gateway.timeout_secs must be greater than 0"));
        }

        Ok(())
    }
}

fn require_absolute(name: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value).with_context(|| format!("{} is not a valid URL", name))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!("{} must be an http(s) URL, got {}", name, value));
    }
    Ok(())
}
