//! [`UsageStore`](manzai_interface::UsageStore) backends.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod supabase;

pub use memory::InMemoryUsageStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresUsageStore;
pub use supabase::{SupabaseConfig, SupabaseUsageStore};
