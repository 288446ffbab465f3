//! Result reporting boundary.
//!
//! On game over the session hands a `SessionOutcome` to an external
//! persistence collaborator. The core does not retry and does not
//! guarantee delivery: a failed report is logged and the player still
//! returns to idle. Anything else would hold the session hostage to a
//! backend hiccup.

use log::{info, warn};
use thiserror::Error;

use crate::types::SessionOutcome;

/// Failure to deliver a result to the external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// The collaborator rejected the payload.
    #[error("result rejected: {0}")]
    Rejected(String),
    /// The collaborator could not be reached.
    #[error("result sink unavailable")]
    Unavailable,
}

/// Destination for finished-session results.
pub trait ResultSink {
    fn report(&mut self, outcome: &SessionOutcome) -> Result<(), ReportError>;
}

/// Reports an outcome, absorbing failure.
///
/// Returns whether delivery succeeded; the caller proceeds to idle either
/// way.
pub fn report_outcome(sink: &mut dyn ResultSink, outcome: &SessionOutcome) -> bool {
    match sink.report(outcome) {
        Ok(()) => {
            info!(
                "reported result: game={} score={} calories={}",
                outcome.game_type, outcome.score, outcome.calories_estimate
            );
            true
        }
        Err(err) => {
            warn!("result report failed ({}), continuing to idle", err);
            false
        }
    }
}

/// In-memory sink that records JSON payloads. Test double and demo sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Serialized payloads, in delivery order.
    pub payloads: Vec<String>,
    /// When set, every report fails with this error.
    pub fail_with: Option<ReportError>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for MemorySink {
    fn report(&mut self, outcome: &SessionOutcome) -> Result<(), ReportError> {
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        let json = serde_json::to_string(outcome)
            .map_err(|e| ReportError::Rejected(e.to_string()))?;
        self.payloads.push(json);
        Ok(())
    }
}
