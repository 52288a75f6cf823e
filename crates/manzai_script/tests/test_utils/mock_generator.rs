//! Scripted text generator for testing.

use async_trait::async_trait;
use manzai_core::CompletionRequest;
use manzai_error::{GeneratorError, GeneratorErrorKind};
use manzai_interface::{TechniquePicker, TextGenerator};
use std::sync::{Arc, Mutex};

/// A single scripted reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Text(String),
    Error(GeneratorErrorKind),
}

/// Replays a fixed sequence of replies and records every request.
///
/// Calls past the end of the sequence fail with an empty-response error.
#[derive(Clone)]
pub struct MockGenerator {
    responses: Vec<MockResponse>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockGenerator {
    /// Replies with each response in turn.
    pub fn new_sequence(responses: Vec<MockResponse>) -> Self {
        Self {
            responses,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replies once with `text`.
    pub fn new_success(text: impl Into<String>) -> Self {
        Self::new_sequence(vec![MockResponse::Text(text.into())])
    }

    /// Fails the first call with `error`.
    #[allow(dead_code)]
    pub fn new_error(error: GeneratorErrorKind) -> Self {
        Self::new_sequence(vec![MockResponse::Error(error)])
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn complete(&self, req: &CompletionRequest) -> Result<String, GeneratorError> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(req.clone());
            requests.len() - 1
        };

        match self.responses.get(index) {
            Some(MockResponse::Text(text)) => Ok(text.clone()),
            Some(MockResponse::Error(kind)) => Err(GeneratorError::new(kind.clone())),
            None => Err(GeneratorError::new(GeneratorErrorKind::EmptyResponse)),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Deterministic picker: keeps pool order and a fixed extra count.
#[derive(Debug, Clone, Copy)]
pub struct FixedPicker {
    pub extra: usize,
}

impl TechniquePicker for FixedPicker {
    fn shuffle(&self, pool: &[&'static str]) -> Vec<&'static str> {
        pool.to_vec()
    }

    fn extra_count(&self, _min: usize, _max: usize) -> usize {
        self.extra
    }
}
