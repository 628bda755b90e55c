//! Local handler that records every outcome it receives.

use async_trait::async_trait;
use capture_core::models::DispatchOutcome;
use capture_core::{AppError, LocalHandler};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct RecordingHandler {
    outcomes: Arc<Mutex<Vec<DispatchOutcome>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> Arc<dyn LocalHandler> {
        Arc::new(self.clone())
    }

    pub fn outcomes(&self) -> Vec<DispatchOutcome> {
        self.outcomes.lock().unwrap().clone()
    }
}

#[async_trait]
impl LocalHandler for RecordingHandler {
    async fn deliver(&self, outcome: DispatchOutcome) -> Result<(), AppError> {
        self.outcomes.lock().unwrap().push(outcome);
        Ok(())
    }
}
