//! Executor configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Executor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum sibling fields or list items resolved concurrently.
    pub max_concurrent_fields: usize,
    /// Deadline for a single resolver call in milliseconds. No deadline when unset.
    pub field_timeout_ms: Option<u64>,
    /// Turn resolver panics into field errors.
    pub catch_panics: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fields: 100,
            field_timeout_ms: None,
            catch_panics: true,
        }
    }
}

impl ExecutorConfig {
    /// Sets the concurrency limit. Zero is treated as one.
    #[must_use]
    pub fn with_max_concurrent_fields(mut self, limit: usize) -> Self {
        self.max_concurrent_fields = limit;
        self
    }

    /// Sets the per-resolver deadline.
    #[must_use]
    pub fn with_field_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.field_timeout_ms = Some(timeout_ms);
        self
    }

    /// Sets whether resolver panics are caught.
    #[must_use]
    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }

    pub(crate) fn concurrency(&self) -> usize {
        self.max_concurrent_fields.max(1)
    }

    /// Returns the per-resolver deadline, if any.
    pub fn field_timeout(&self) -> Option<Duration> {
        self.field_timeout_ms.map(Duration::from_millis)
    }
}
