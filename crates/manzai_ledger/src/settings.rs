//! Ledger policy values.

use serde::{Deserialize, Serialize};

/// Quota and product policy for the credit gate.
///
/// # Examples
///
/// ```
/// use manzai_ledger::LedgerSettings;
///
/// let settings = LedgerSettings::default();
/// assert_eq!(settings.free_quota, 20);
/// assert!(settings.is_recognized_product("credit_100"));
/// assert!(!settings.is_recognized_product("credit_1000"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Generations allowed before paid credits are needed
    pub free_quota: u64,
    /// The single purchasable product
    pub product_id: String,
    /// Credits granted per purchase of that product
    pub grant_amount: u64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            free_quota: 20,
            product_id: "credit_100".to_string(),
            grant_amount: 100,
        }
    }
}

impl LedgerSettings {
    /// Whether `product_id` is on the allow-list.
    pub fn is_recognized_product(&self, product_id: &str) -> bool {
        !product_id.is_empty() && product_id == self.product_id
    }
}
