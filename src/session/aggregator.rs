//! Error aggregator
//!
//! Holds the one error message shown to the user. Every report overwrites the
//! previous one; nothing clears it except a newer report.

use crate::utils::error::UiError;

#[derive(Debug, Default)]
pub struct ErrorAggregator {
    current: Option<UiError>,
}

impl ErrorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, error: UiError) {
        tracing::warn!("{:?} error: {}", error.source, error.message);
        self.current = Some(error);
    }

    pub fn current(&self) -> Option<&UiError> {
        self.current.as_ref()
    }

    pub fn message(&self) -> Option<&str> {
        self.current.as_ref().map(|e| e.message.as_str())
    }
}
