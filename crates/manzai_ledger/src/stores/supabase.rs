//! Supabase row store over the PostgREST HTTP interface.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use manzai_core::UsageRecord;
use manzai_error::{StorageError, StorageErrorKind};
use manzai_interface::UsageStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const REST_PATH: &str = "rest/v1";

/// Connection settings for a Supabase project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Service role key; never serialized back out
    #[serde(skip_serializing)]
    pub service_role_key: String,
    /// Table holding usage rows
    pub table: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_role_key: String::new(),
            table: "user_usage".to_string(),
            timeout_secs: 10,
        }
    }
}

impl SupabaseConfig {
    /// Both the URL and the key are present.
    pub fn is_complete(&self) -> bool {
        !self.url.trim().is_empty() && !self.service_role_key.trim().is_empty()
    }

    fn table_url(&self) -> String {
        format!("{}/{}/{}", self.url.trim_end_matches('/'), REST_PATH, self.table)
    }
}

/// Row shape as returned by PostgREST; counters may be null.
#[derive(Debug, Deserialize)]
struct UsageRow {
    user_id: String,
    #[serde(default)]
    output_count: Option<i64>,
    #[serde(default)]
    paid_credits: Option<i64>,
}

impl From<UsageRow> for UsageRecord {
    fn from(row: UsageRow) -> Self {
        let count = |value: Option<i64>| value.unwrap_or(0).max(0) as u64;
        UsageRecord {
            user_id: row.user_id,
            output_count: count(row.output_count),
            paid_credits: count(row.paid_credits),
        }
    }
}

#[derive(Debug, Serialize)]
struct UpsertRow<'a> {
    user_id: &'a str,
    output_count: u64,
    paid_credits: u64,
    updated_at: String,
}

/// [`UsageStore`] backed by a Supabase table.
#[derive(Debug, Clone)]
pub struct SupabaseUsageStore {
    client: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseUsageStore {
    /// Build a store; fails when the URL or key is missing.
    pub fn new(config: SupabaseConfig) -> Result<Self, StorageError> {
        if !config.is_complete() {
            return Err(StorageError::new(StorageErrorKind::Unavailable(
                "supabase url and service role key are required".to_string(),
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StorageError::new(StorageErrorKind::Connection(e.to_string())))?;
        Ok(Self { client, config })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::new(StorageErrorKind::Query(format!(
            "{}: {}",
            status.as_u16(),
            body
        ))))
    }
}

#[async_trait]
impl UsageStore for SupabaseUsageStore {
    #[instrument(skip(self), fields(table = %self.config.table))]
    async fn get(&self, user_id: &str) -> Result<Option<UsageRecord>, StorageError> {
        let request = self.client.get(self.config.table_url()).query(&[
            ("select", "user_id,output_count,paid_credits".to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("limit", "1".to_string()),
        ]);
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::Http(e.to_string())))?;
        let rows: Vec<UsageRow> = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::Deserialization(e.to_string())))?;

        debug!(found = !rows.is_empty(), "Usage row fetched");
        Ok(rows.into_iter().next().map(UsageRecord::from))
    }

    #[instrument(skip(self, record), fields(table = %self.config.table, user_id = %record.user_id))]
    async fn upsert(&self, record: &UsageRecord) -> Result<(), StorageError> {
        let row = UpsertRow {
            user_id: &record.user_id,
            output_count: record.output_count,
            paid_credits: record.paid_credits,
            updated_at: Utc::now().to_rfc3339(),
        };
        let request = self
            .client
            .post(self.config.table_url())
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[row]);
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::Http(e.to_string())))?;
        Self::check_status(response).await?;

        debug!("Usage row upserted");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "supabase"
    }
}
