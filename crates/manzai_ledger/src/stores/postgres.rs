//! PostgreSQL row store via diesel and an r2d2 pool.
//!
//! Expects a table created by `sql/user_usage.sql`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use manzai_core::UsageRecord;
use manzai_error::{StorageError, StorageErrorKind};
use manzai_interface::UsageStore;
use tracing::{debug, instrument};

diesel::table! {
    user_usage (user_id) {
        user_id -> Text,
        output_count -> Int8,
        paid_credits -> Int8,
        updated_at -> Timestamptz,
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_usage)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct UsageRow {
    user_id: String,
    output_count: i64,
    paid_credits: i64,
}

impl From<UsageRow> for UsageRecord {
    fn from(row: UsageRow) -> Self {
        UsageRecord {
            user_id: row.user_id,
            output_count: row.output_count.max(0) as u64,
            paid_credits: row.paid_credits.max(0) as u64,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_usage)]
struct NewUsageRow {
    user_id: String,
    output_count: i64,
    paid_credits: i64,
    updated_at: DateTime<Utc>,
}

impl From<&UsageRecord> for NewUsageRow {
    fn from(record: &UsageRecord) -> Self {
        let clamp = |value: u64| i64::try_from(value).unwrap_or(i64::MAX);
        NewUsageRow {
            user_id: record.user_id.clone(),
            output_count: clamp(record.output_count),
            paid_credits: clamp(record.paid_credits),
            updated_at: Utc::now(),
        }
    }
}

/// [`UsageStore`] backed by a PostgreSQL table.
#[derive(Clone)]
pub struct PostgresUsageStore {
    pool: Pool<ConnectionManager<PgConnection>>,
}

impl PostgresUsageStore {
    /// Create a store with the given connection pool.
    pub fn new(pool: Pool<ConnectionManager<PgConnection>>) -> Self {
        Self { pool }
    }

    /// Open a pool of at most `max_size` connections to `database_url`.
    pub fn connect(database_url: &str, max_size: u32) -> Result<Self, StorageError> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(max_size)
            .build(manager)
            .map_err(|e| StorageError::new(StorageErrorKind::Connection(e.to_string())))?;
        Ok(Self::new(pool))
    }

    async fn with_connection<T, F>(&self, operation: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> QueryResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| StorageError::new(StorageErrorKind::Connection(e.to_string())))?;
            operation(&mut conn).map_err(|e| StorageError::new(StorageErrorKind::Query(e.to_string())))
        })
        .await
        .map_err(|e| StorageError::new(StorageErrorKind::Unavailable(e.to_string())))?
    }
}

#[async_trait]
impl UsageStore for PostgresUsageStore {
    #[instrument(skip(self))]
    async fn get(&self, user_id: &str) -> Result<Option<UsageRecord>, StorageError> {
        let user_id = user_id.to_string();
        let row = self
            .with_connection(move |conn| {
                user_usage::table
                    .find(user_id)
                    .select(UsageRow::as_select())
                    .first(conn)
                    .optional()
            })
            .await?;

        debug!(found = row.is_some(), "Usage row fetched");
        Ok(row.map(UsageRecord::from))
    }

    #[instrument(skip(self, record), fields(user_id = %record.user_id))]
    async fn upsert(&self, record: &UsageRecord) -> Result<(), StorageError> {
        let row = NewUsageRow::from(record);
        self.with_connection(move |conn| {
            diesel::insert_into(user_usage::table)
                .values(&row)
                .on_conflict(user_usage::user_id)
                .do_update()
                .set((
                    user_usage::output_count.eq(row.output_count),
                    user_usage::paid_credits.eq(row.paid_credits),
                    user_usage::updated_at.eq(row.updated_at),
                ))
                .execute(conn)
        })
        .await?;

        debug!("Usage row upserted");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
