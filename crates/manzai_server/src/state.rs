//! Shared handler state.

use std::sync::Arc;

use manzai_core::LengthSettings;
use manzai_error::{ConfigError, ManzaiResult};
use manzai_interface::{TextGenerator, UsageStore};
use manzai_ledger::{CreditGate, InMemoryUsageStore, SupabaseUsageStore};
use manzai_models::OpenAICompatibleClient;
use manzai_script::ScriptPipeline;
use tracing::{info, instrument};

use crate::{AppConfig, StoreBackend};

/// Everything a handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    /// Script generation pipeline
    pub pipeline: Arc<ScriptPipeline>,
    /// Credit gate
    pub gate: Arc<CreditGate>,
    /// Length clamp and band policy
    pub length: LengthSettings,
    /// Withhold error detail from responses
    pub production: bool,
}

impl AppState {
    /// Assemble state from already-built parts.
    pub fn new(pipeline: ScriptPipeline, gate: CreditGate, length: LengthSettings, production: bool) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            gate: Arc::new(gate),
            length,
            production,
        }
    }

    /// Build the generator, store, pipeline, and gate from configuration.
    #[instrument(skip(config), fields(provider = %config.model.provider, model = %config.model.model))]
    pub fn from_config(config: &AppConfig) -> ManzaiResult<Self> {
        let generator: Arc<dyn TextGenerator> = Arc::new(OpenAICompatibleClient::new(config.model.clone())?);
        let pipeline = ScriptPipeline::new(generator, config.pipeline.clone());

        let backend = config.ledger.resolved_store();
        let settings = config.ledger.settings();
        let gate = match build_store(config, backend)? {
            Some(store) => CreditGate::new(store, settings),
            None => CreditGate::disabled(settings),
        };
        info!(?backend, gated = gate.is_enabled(), "Application state ready");

        Ok(Self::new(
            pipeline,
            gate,
            config.length,
            config.server.is_production(),
        ))
    }
}

fn build_store(config: &AppConfig, backend: StoreBackend) -> ManzaiResult<Option<Arc<dyn UsageStore>>> {
    let store: Arc<dyn UsageStore> = match backend {
        StoreBackend::Auto | StoreBackend::None => return Ok(None),
        StoreBackend::Memory => Arc::new(InMemoryUsageStore::new()),
        StoreBackend::Supabase => Arc::new(SupabaseUsageStore::new(config.ledger.supabase.clone())?),
        StoreBackend::Postgres => return postgres_store(config),
    };
    Ok(Some(store))
}

#[cfg(feature = "postgres")]
fn postgres_store(config: &AppConfig) -> ManzaiResult<Option<Arc<dyn UsageStore>>> {
    let url = config
        .ledger
        .database_url
        .as_deref()
        .ok_or_else(|| ConfigError::new("ledger.database_url is required for the postgres store"))?;
    let store = manzai_ledger::PostgresUsageStore::connect(url, config.ledger.pool_size)?;
    Ok(Some(Arc::new(store)))
}

#[cfg(not(feature = "postgres"))]
fn postgres_store(_config: &AppConfig) -> ManzaiResult<Option<Arc<dyn UsageStore>>> {
    Err(ConfigError::new("ledger.store = postgres needs the `postgres` feature"))?
}
