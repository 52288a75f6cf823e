//! Pre-check, post-success consumption, and purchase top-ups.
//!
//! The gate never blocks a request because the store misbehaved: a failed
//! read counts as an empty row and a failed write after a successful
//! generation is logged and dropped. Only a credit grant surfaces store
//! failures, since nothing has been delivered yet at that point.

use std::sync::Arc;

use manzai_core::UsageRecord;
use manzai_error::{LedgerError, LedgerErrorKind, ManzaiResult};
use manzai_interface::UsageStore;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::LedgerSettings;

/// Outcome of the read-only pre-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditCheck {
    /// Whether generation may proceed
    pub allowed: bool,
    /// Snapshot of the user's row; `None` when the gate is not in effect
    pub record: Option<UsageRecord>,
}

impl CreditCheck {
    fn ungated() -> Self {
        Self {
            allowed: true,
            record: None,
        }
    }
}

/// Which balance a successful generation was charged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Consumption {
    /// Counted against the free quota
    Free,
    /// Charged one paid credit
    Paid,
}

/// Body of a successful credit grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantReceipt {
    /// Always `true`
    pub ok: bool,
    /// Product that was granted
    pub product_id: String,
    /// Paid credit balance after the grant
    pub paid_credits: u64,
    /// Credits added by this grant
    pub added: u64,
}

/// Credit gate over an optional [`UsageStore`].
///
/// Without a store every request is allowed and nothing is recorded.
#[derive(Clone)]
pub struct CreditGate {
    store: Option<Arc<dyn UsageStore>>,
    settings: LedgerSettings,
}

impl CreditGate {
    /// Gate backed by `store`.
    pub fn new(store: Arc<dyn UsageStore>, settings: LedgerSettings) -> Self {
        Self {
            store: Some(store),
            settings,
        }
    }

    /// Gate with no store: generation is ungated, grants are refused.
    pub fn disabled(settings: LedgerSettings) -> Self {
        Self {
            store: None,
            settings,
        }
    }

    /// Policy values in effect.
    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Whether a store is configured.
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    fn gated(&self, user_id: Option<&str>) -> Option<(&Arc<dyn UsageStore>, String)> {
        let user_id = user_id.map(str::trim).filter(|id| !id.is_empty())?;
        self.store.as_ref().map(|store| (store, user_id.to_string()))
    }

    /// Fetch a row; a failed read counts as an empty row.
    async fn read_or_empty(store: &Arc<dyn UsageStore>, user_id: &str) -> UsageRecord {
        match store.get(user_id).await {
            Ok(Some(record)) => record,
            Ok(None) => UsageRecord::empty(user_id),
            Err(e) => {
                warn!(user_id, backend = store.backend_name(), error = %e, "Usage read failed, treating as empty row");
                UsageRecord::empty(user_id)
            }
        }
    }

    /// Whether `record` may generate under the quota policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use manzai_core::UsageRecord;
    /// use manzai_ledger::{CreditGate, LedgerSettings};
    ///
    /// let gate = CreditGate::disabled(LedgerSettings::default());
    /// let mut record = UsageRecord::empty("u1");
    /// record.output_count = 20;
    /// assert!(!gate.permits(&record));
    /// record.paid_credits = 1;
    /// assert!(gate.permits(&record));
    /// ```
    pub fn permits(&self, record: &UsageRecord) -> bool {
        record.output_count < self.settings.free_quota || record.paid_credits > 0
    }

    /// Read-only pre-check. Never mutates the store.
    #[instrument(skip(self), fields(enabled = self.is_enabled()))]
    pub async fn check_allowed(&self, user_id: Option<&str>) -> CreditCheck {
        let Some((store, user_id)) = self.gated(user_id) else {
            debug!("Gate not in effect");
            return CreditCheck::ungated();
        };

        let record = Self::read_or_empty(store, &user_id).await;
        let allowed = self.permits(&record);
        debug!(
            output_count = record.output_count,
            paid_credits = record.paid_credits,
            allowed,
            "Credit pre-check"
        );
        CreditCheck {
            allowed,
            record: Some(record),
        }
    }

    /// Charge one successful generation.
    ///
    /// Returns the row as it stands afterwards, or `None` when nothing was
    /// recorded. Store failures are logged and swallowed. A failed read
    /// skips the write so the stored row is never replaced by an empty one.
    #[instrument(skip(self), fields(enabled = self.is_enabled()))]
    pub async fn consume_on_success(&self, user_id: Option<&str>) -> Option<UsageRecord> {
        let (store, user_id) = self.gated(user_id)?;

        let mut record = match store.get(&user_id).await {
            Ok(Some(record)) => record,
            Ok(None) => UsageRecord::empty(&user_id),
            Err(e) => {
                warn!(backend = store.backend_name(), error = %e, "Usage read failed after successful generation, nothing charged");
                return None;
            }
        };
        let consumption = if record.output_count < self.settings.free_quota {
            Consumption::Free
        } else if record.paid_credits > 0 {
            record.paid_credits -= 1;
            Consumption::Paid
        } else {
            warn!(
                output_count = record.output_count,
                "No balance left at consumption time, nothing charged"
            );
            return Some(record);
        };
        record.output_count += 1;

        if let Err(e) = store.upsert(&record).await {
            warn!(backend = store.backend_name(), error = %e, "Usage write failed after successful generation");
            return None;
        }

        info!(
            ?consumption,
            output_count = record.output_count,
            paid_credits = record.paid_credits,
            "Generation charged"
        );
        Some(record)
    }

    /// Add the fixed grant for a recognised product. Usage is left as is.
    #[instrument(skip(self), fields(enabled = self.is_enabled()))]
    pub async fn grant_credits(&self, user_id: Option<&str>, product_id: Option<&str>) -> ManzaiResult<GrantReceipt> {
        let user_id = user_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| LedgerError::new(LedgerErrorKind::MissingUserId))?;

        let product_id = product_id.unwrap_or_default();
        if !self.settings.is_recognized_product(product_id) {
            warn!(product_id, "Rejected unsupported product");
            return Err(LedgerError::new(LedgerErrorKind::UnsupportedProduct(product_id.to_string())).into());
        }

        let store = self
            .store
            .as_ref()
            .ok_or_else(|| LedgerError::new(LedgerErrorKind::StoreNotConfigured))?;

        let mut record = store
            .get(user_id)
            .await?
            .unwrap_or_else(|| UsageRecord::empty(user_id));
        record.paid_credits += self.settings.grant_amount;
        store.upsert(&record).await?;

        info!(
            user_id,
            product_id,
            paid_credits = record.paid_credits,
            added = self.settings.grant_amount,
            "Credits granted"
        );
        Ok(GrantReceipt {
            ok: true,
            product_id: self.settings.product_id.clone(),
            paid_credits: record.paid_credits,
            added: self.settings.grant_amount,
        })
    }
}
