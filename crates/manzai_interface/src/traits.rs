//! Trait definitions for external collaborators.

use async_trait::async_trait;
use manzai_core::{CompletionRequest, UsageRecord};
use manzai_error::{GeneratorError, StorageError};
use rand::Rng;
use rand::seq::SliceRandom;

/// A black-box text generator with a prompt/response contract.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send the messages and return the single generated text blob.
    async fn complete(&self, req: &CompletionRequest) -> Result<String, GeneratorError>;

    /// Provider name (e.g., "xai", "openai").
    fn provider_name(&self) -> &'static str;

    /// Model identifier (e.g., "grok-4-fast-reasoning").
    fn model_name(&self) -> &str;
}

/// Get/put row store for per-user usage counters.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Fetch the row for a user, `None` when the user has no row yet.
    async fn get(&self, user_id: &str) -> Result<Option<UsageRecord>, StorageError>;

    /// Insert or replace the row for `record.user_id`.
    async fn upsert(&self, record: &UsageRecord) -> Result<(), StorageError>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}

/// Random-choice capability used by the fallback technique set.
///
/// Injected so tests can substitute a deterministic source.
pub trait TechniquePicker: Send + Sync {
    /// Return `pool` in a shuffled order.
    fn shuffle(&self, pool: &[&'static str]) -> Vec<&'static str>;

    /// Choose how many extra techniques to take, within `min..=max`.
    fn extra_count(&self, min: usize, max: usize) -> usize;
}

/// [`TechniquePicker`] backed by the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPicker;

impl TechniquePicker for RandomPicker {
    fn shuffle(&self, pool: &[&'static str]) -> Vec<&'static str> {
        let mut shuffled = pool.to_vec();
        shuffled.shuffle(&mut rand::thread_rng());
        shuffled
    }

    fn extra_count(&self, min: usize, max: usize) -> usize {
        if max <= min {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }
}
