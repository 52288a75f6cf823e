//! HTTP surface for the manzai script generation service.
//!
//! Routes:
//! - `POST /api/generate`: generate a script, or grant credits when the
//!   body carries `action: "add_credit"`
//! - `POST /api/credit/add`: grant credits
//! - `GET /health`: liveness probe
//!
//! Any other method on an API route answers 405.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod logging;
mod routes;
mod state;

pub use config::{AppConfig, LedgerConfig, LegacyEnv, LoggingConfig, ServerConfig, StoreBackend};
pub use error::ApiError;
pub use logging::init_logging;
pub use routes::router;
pub use state::AppState;
