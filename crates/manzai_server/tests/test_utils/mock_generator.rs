//! Scripted text generator for HTTP tests.

use async_trait::async_trait;
use manzai_core::CompletionRequest;
use manzai_error::{GeneratorError, GeneratorErrorKind};
use manzai_interface::{TechniquePicker, TextGenerator};
use std::sync::{Arc, Mutex};

/// A single scripted reply.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum MockResponse {
    Text(String),
    Error(GeneratorErrorKind),
}

/// Replays a fixed sequence of replies and counts calls.
///
/// Calls past the end of the sequence fail with an empty-response error.
#[derive(Clone)]
pub struct MockGenerator {
    responses: Vec<MockResponse>,
    calls: Arc<Mutex<usize>>,
}

impl MockGenerator {
    pub fn new_sequence(responses: Vec<MockResponse>) -> Self {
        Self {
            responses,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn new_success(text: impl Into<String>) -> Self {
        Self::new_sequence(vec![MockResponse::Text(text.into())])
    }

    #[allow(dead_code)]
    pub fn new_error(error: GeneratorErrorKind) -> Self {
        Self::new_sequence(vec![MockResponse::Error(error)])
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn complete(&self, _req: &CompletionRequest) -> Result<String, GeneratorError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls - 1
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
