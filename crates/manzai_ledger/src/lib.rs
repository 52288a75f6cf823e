//! Usage and credit ledger for the manzai service.
//!
//! [`CreditGate`] decides whether a user may generate, charges a
//! generation once it has succeeded, and applies purchase top-ups. Rows
//! live behind the [`UsageStore`](manzai_interface::UsageStore) trait:
//!
//! - [`InMemoryUsageStore`] for local runs and tests
//! - [`SupabaseUsageStore`] over the Supabase REST interface
//! - `PostgresUsageStore` over diesel (feature `postgres`)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod gate;
mod settings;
mod stores;

pub use gate::{Consumption, CreditCheck, CreditGate, GrantReceipt};
pub use settings::LedgerSettings;
#[cfg(feature = "postgres")]
pub use stores::PostgresUsageStore;
pub use stores::{InMemoryUsageStore, SupabaseConfig, SupabaseUsageStore};
