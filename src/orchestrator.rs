// Request lifecycle for one form instance: Idle -> Loading -> Success/Failed,
// re-entrant from either terminal state.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use thiserror::Error;

use crate::{
    interval::{ConfidenceInterval, derive_interval},
    models::NormalizedPredictionRequest,
    prediction_api::{PredictionError, PredictionService},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Idle,
    Loading,
    Success,
    Failed,
}

/// Result of the latest settled request cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PredictionOutcome {
    Pending,
    Success {
        price: f64,
        interval: ConfidenceInterval,
    },
    Failure {
        reason: String,
    },
}

impl PredictionOutcome {
    fn from_result(result: Result<f64, PredictionError>) -> Self {
        match result {
            Ok(price) => PredictionOutcome::Success {
                price,
                interval: derive_interval(price),
            },
            Err(error) => PredictionOutcome::Failure {
                reason: error.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PredictionOutcome::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PredictionOutcome::Failure { .. })
    }
}

/// Returned when a submission arrives while another one is still in flight.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("a prediction request is already in flight")]
pub struct Busy;

#[derive(Debug)]
struct Lifecycle {
    state: RequestState,
    outcome: PredictionOutcome,
}

pub struct PredictionOrchestrator<S> {
    service: S,
    lifecycle: Mutex<Lifecycle>,
}

impl<S: PredictionService> PredictionOrchestrator<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            lifecycle: Mutex::new(Lifecycle {
                state: RequestState::Idle,
                outcome: PredictionOutcome::Pending,
            }),
        }
    }

    // Never held across an await point.
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> (RequestState, PredictionOutcome) {
        let lifecycle = self.lifecycle();
        (lifecycle.state, lifecycle.outcome.clone())
    }

    /// Issues exactly one request to the prediction service and settles the
    /// lifecycle with its result.
    ///
    /// The previous outcome stays visible while the request is in flight. A
    /// service failure replaces it with `Failure`, so a stale price is never
    /// shown next to newer inputs.
    ///
    /// # Errors
    ///
    /// Returns [`Busy`] without contacting the service if a request is
    /// already in flight.
    pub async fn submit(&self, payload: NormalizedPredictionRequest) -> Result<PredictionOutcome, Busy> {
        let in_flight = self.begin()?;
        let result = self.service.predict(&payload).await;
        Ok(in_flight.settle(result))
    }

    fn begin(&self) -> Result<InFlight<'_, S>, Busy> {
        let mut lifecycle = self.lifecycle();
        if lifecycle.state == RequestState::Loading {
            tracing::warn!("Rejected prediction submit: a request is still in flight");
            return Err(Busy);
        }
        let previous = lifecycle.state;
        lifecycle.state = RequestState::Loading;
        tracing::info!("Prediction request issued (was {:?})", previous);
        Ok(InFlight {
            orchestrator: self,
            previous,
            settled: false,
        })
    }
}

// Tracks the single outstanding submission; `begin` admits at most one at a
// time, so whoever holds this owns the lifecycle until it settles or drops.
// If the submitting future is dropped before the service answers, the
// lifecycle falls back to its prior state instead of staying in Loading.
struct InFlight<'a, S: PredictionService> {
    orchestrator: &'a PredictionOrchestrator<S>,
    previous: RequestState,
    settled: bool,
}

impl<S: PredictionService> InFlight<'_, S> {
    fn settle(mut self, result: Result<f64, PredictionError>) -> PredictionOutcome {
        self.settled = true;
        let outcome = PredictionOutcome::from_result(result);

        let mut lifecycle = self.orchestrator.lifecycle();
        match &outcome {
            PredictionOutcome::Success { price, interval } => {
                tracing::info!(
                    "Prediction request succeeded: {} ({} - {})",
                    price,
                    interval.min,
                    interval.max
                );
                lifecycle.state = RequestState::Success;
            }
            PredictionOutcome::Failure { reason } => {
                tracing::warn!("Prediction request failed: {}", reason);
                lifecycle.state = RequestState::Failed;
            }
            PredictionOutcome::Pending => {}
        }
        lifecycle.outcome = outcome.clone();
        outcome
    }
}

impl<S: PredictionService> Drop for InFlight<'_, S> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut lifecycle = self.orchestrator.lifecycle();
        if lifecycle.state == RequestState::Loading {
            tracing::warn!("Prediction request abandoned before the service answered");
            lifecycle.state = self.previous;
        }
    }
}
