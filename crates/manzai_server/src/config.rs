//! Layered service configuration.
//!
//! Sources, lowest to highest precedence:
//! - Bundled defaults (include_str! from manzai.toml)
//! - `~/.config/manzai/manzai.toml`
//! - `./manzai.toml`, or an explicit `--config` file
//! - `MANZAI__SECTION__KEY` environment variables
//! - The legacy variable names captured in [`LegacyEnv`]

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use manzai_core::LengthSettings;
use manzai_error::{ConfigError, ManzaiResult};
use manzai_ledger::{LedgerSettings, SupabaseConfig};
use manzai_models::ProviderConfig;
use manzai_script::PipelineSettings;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const DEFAULT_CONFIG: &str = include_str!("../manzai.toml");
const PRODUCTION: &str = "production";

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: String,
    /// Deployment environment; `production` hides error detail
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            environment: "development".to_string(),
        }
    }
}

impl ServerConfig {
    /// Whether error detail must be withheld from responses.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case(PRODUCTION)
    }
}

/// Which row store backs the credit gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Supabase when it is fully configured, otherwise none
    #[default]
    Auto,
    /// No store: generation is ungated
    None,
    /// Process-local map
    Memory,
    /// Supabase REST
    Supabase,
    /// PostgreSQL through diesel (feature `postgres`)
    Postgres,
}

/// Credit ledger settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Row store backend
    pub store: StoreBackend,
    /// Generations allowed before paid credits are needed
    pub free_quota: u64,
    /// The single purchasable product
    pub product_id: String,
    /// Credits granted per purchase
    pub grant_amount: u64,
    /// Supabase connection
    pub supabase: SupabaseConfig,
    /// PostgreSQL connection string
    #[serde(skip_serializing)]
    pub database_url: Option<String>,
    /// PostgreSQL pool size
    pub pool_size: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let policy = LedgerSettings::default();
        Self {
            store: StoreBackend::Auto,
            free_quota: policy.free_quota,
            product_id: policy.product_id,
            grant_amount: policy.grant_amount,
            supabase: SupabaseConfig::default(),
            database_url: None,
            pool_size: 4,
        }
    }
}

impl LedgerConfig {
    /// Quota and product policy.
    pub fn settings(&self) -> LedgerSettings {
        LedgerSettings {
            free_quota: self.free_quota,
            product_id: self.product_id.clone(),
            grant_amount: self.grant_amount,
        }
    }

    /// Backend after resolving `auto`.
    pub fn resolved_store(&self) -> StoreBackend {
        match self.store {
            StoreBackend::Auto if self.supabase.is_complete() => StoreBackend::Supabase,
            StoreBackend::Auto => StoreBackend::None,
            other => other,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Values read from the legacy, unprefixed environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyEnv {
    /// `XAI_API_KEY`
    pub xai_api_key: Option<String>,
    /// `XAI_MODEL`
    pub xai_model: Option<String>,
    /// `SUPABASE_URL`
    pub supabase_url: Option<String>,
    /// `SUPABASE_SERVICE_ROLE_KEY`
    pub supabase_service_role_key: Option<String>,
    /// `DATABASE_URL`
    pub database_url: Option<String>,
    /// `MANZAI_ENV`, falling back to `NODE_ENV`
    pub environment: Option<String>,
}

impl LegacyEnv {
    /// Capture the legacy variables from the process environment.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            xai_api_key: var("XAI_API_KEY"),
            xai_model: var("XAI_MODEL"),
            supabase_url: var("SUPABASE_URL"),
            supabase_service_role_key: var("SUPABASE_SERVICE_ROLE_KEY"),
            database_url: var("DATABASE_URL"),
            environment: var("MANZAI_ENV").or_else(|| var("NODE_ENV")),
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener
    pub server: ServerConfig,
    /// Text generation provider
    pub model: ProviderConfig,
    /// Length band policy
    pub length: LengthSettings,
    /// Pipeline stages and wording
    pub pipeline: PipelineSettings,
    /// Credit ledger
    pub ledger: LedgerConfig,
    /// Log output
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load the layered configuration.
    ///
    /// `explicit` replaces the `./manzai.toml` lookup and must exist.
    #[instrument(skip(legacy))]
    pub fn load(explicit: Option<&Path>, legacy: &LegacyEnv) -> ManzaiResult<Self> {
        debug!("Loading configuration: env > explicit or current dir > home dir > bundled defaults");

        let mut builder = Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config").join("manzai").join("manzai.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = match explicit {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("manzai").required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix("MANZAI")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let overrides = [
            ("model.api_key", &legacy.xai_api_key),
            ("model.model", &legacy.xai_model),
            ("ledger.supabase.url", &legacy.supabase_url),
            ("ledger.supabase.service_role_key", &legacy.supabase_service_role_key),
            ("ledger.database_url", &legacy.database_url),
            ("server.environment", &legacy.environment),
        ];
        for (key, value) in overrides {
            builder = builder
                .set_override_option(key, value.clone())
                .map_err(|e| ConfigError::new(format!("Invalid override for {key}: {e}")))?;
        }

        let config: AppConfig = builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build configuration: {e}")))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {e}")))?;

        debug!(
            environment = %config.server.environment,
            store = ?config.ledger.resolved_store(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> ManzaiResult<()> {
        let fail = |field: &str, reason: String| -> ManzaiResult<()> {
            Err(ConfigError::invalid_field(field, reason).into())
        };

        if self.length.max_target == 0 {
            return fail("length.max_target", "must be positive".into());
        }
        for (field, value) in [
            ("pipeline.initial_temperature", self.pipeline.initial_temperature),
            ("pipeline.continuation_temperature", self.pipeline.continuation_temperature),
            ("pipeline.verification_temperature", self.pipeline.verification_temperature),
            ("pipeline.title_temperature", self.pipeline.title_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return fail(field, format!("must be within 0.0..=2.0, got {value}"));
            }
        }
        if self.pipeline.closing_phrase.trim().is_empty() {
            return fail("pipeline.closing_phrase", "must not be empty".into());
        }
        if self.ledger.product_id.trim().is_empty() {
            return fail("ledger.product_id", "must not be empty".into());
        }
        match self.ledger.resolved_store() {
            StoreBackend::Supabase if !self.ledger.supabase.is_complete() => {
                fail("ledger.supabase", "needs url and service_role_key for store = supabase".into())
            }
            StoreBackend::Postgres if self.ledger.database_url.is_none() => {
                fail("ledger.database_url", "is required for store = postgres".into())
            }
            StoreBackend::Postgres if !cfg!(feature = "postgres") => {
                fail("ledger.store", "= postgres needs the `postgres` feature".into())
            }
            _ => Ok(()),
        }
    }

    /// Pretty JSON of everything except secrets.
    pub fn redacted_json(&self) -> ManzaiResult<String> {
        Ok(serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::new(format!("Failed to render configuration: {e}")))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_defaults_parse() {
        let config = AppConfig::load(None, &LegacyEnv::default()).unwrap();
        assert_eq!(config.model.model, "grok-4-fast-reasoning");
        assert_eq!(config.length.default_target, 350);
        assert_eq!(config.ledger.free_quota, 20);
        assert_eq!(config.pipeline.banned_words, vec!["比喩", "皮肉", "風刺"]);
        assert!(config.pipeline.continuation);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_legacy_env_overrides() {
        let legacy = LegacyEnv {
            xai_api_key: Some("xai-secret".into()),
            xai_model: Some("grok-custom".into()),
            supabase_url: Some("https://example.supabase.co".into()),
            supabase_service_role_key: Some("service-secret".into()),
            database_url: None,
            environment: Some("production".into()),
        };
        let config = AppConfig::load(None, &legacy).unwrap();

        assert_eq!(config.model.api_key.as_deref(), Some("xai-secret"));
        assert_eq!(config.model.model, "grok-custom");
        assert_eq!(config.ledger.resolved_store(), StoreBackend::Supabase);
        assert!(config.server.is_production());

        let rendered = config.redacted_json().unwrap();
        assert!(!rendered.contains("xai-secret"));
        assert!(!rendered.contains("service-secret"));
    }

    #[test]
    fn test_auto_store_without_supabase_is_none() {
        let config = AppConfig::default();
        assert_eq!(config.ledger.resolved_store(), StoreBackend::None);
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut config = AppConfig::default();
        config.pipeline.continuation_temperature = 3.5;
        assert!(config.validate().is_err());
    }
}
