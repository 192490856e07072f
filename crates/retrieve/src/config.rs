use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::RetrieveError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// `n_results` used by callers that don't pass one.
    pub default_n_results: usize,
    /// Characters of joined passage text kept in the answer context.
    pub context_char_budget: usize,
    /// Deadline for embedding the query, in milliseconds.
    pub embed_timeout_ms: Option<u64>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_n_results: 5,
            context_char_budget: 1500,
            embed_timeout_ms: None,
        }
    }
}

impl RetrievalConfig {
    pub fn with_default_n_results(mut self, n: usize) -> Self {
        self.default_n_results = n;
        self
    }

    pub fn with_context_char_budget(mut self, budget: usize) -> Self {
        self.context_char_budget = budget;
        self
    }

    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn embed_timeout(&self) -> Option<Duration> {
        self.embed_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), RetrieveError> {
        if self.default_n_results == 0 {
            return Err(RetrieveError::InvalidConfig(
                "default_n_results must be greater than zero".into(),
            ));
        }
        if self.context_char_budget == 0 {
            return Err(RetrieveError::InvalidConfig(
                "context_char_budget must be greater than zero".into(),
            ));
        }
        if self.embed_timeout_ms == Some(0) {
            return Err(RetrieveError::InvalidConfig(
                "embed_timeout_ms must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }
}
