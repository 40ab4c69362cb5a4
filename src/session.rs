// In-memory form sessions. Each session owns exactly one draft and one
// request lifecycle; nothing is persisted.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use cached::{Cached, TimedSizedCache};
use thiserror::Error;

use crate::{
    form::{FieldName, FormError, FormModel, VehicleAttributes},
    orchestrator::{Busy, PredictionOrchestrator, PredictionOutcome},
    prediction_api::PredictionService,
    results::OutcomeView,
};

pub type SessionId = u64;

#[derive(Debug, Error, PartialEq)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] FormError),
    #[error(transparent)]
    Busy(#[from] Busy),
}

pub struct FormSession<S> {
    form: Mutex<FormModel>,
    orchestrator: PredictionOrchestrator<S>,
}

impl<S: PredictionService> FormSession<S> {
    pub fn new(form: FormModel, service: S) -> Self {
        Self {
            form: Mutex::new(form),
            orchestrator: PredictionOrchestrator::new(service),
        }
    }

    fn form(&self) -> MutexGuard<'_, FormModel> {
        self.form.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn draft(&self) -> VehicleAttributes {
        self.form().draft().clone()
    }

    pub fn update_field(&self, field: FieldName, raw: impl Into<String>) -> VehicleAttributes {
        let mut form = self.form();
        form.update_field(field, raw);
        form.draft().clone()
    }

    pub fn view(&self) -> OutcomeView {
        let (state, outcome) = self.orchestrator.snapshot();
        OutcomeView::new(state, outcome)
    }

    /// Normalizes the current draft and submits it.
    pub async fn predict(&self) -> Result<PredictionOutcome, SubmitError> {
        let payload = self.form().normalize()?;
        Ok(self.orchestrator.submit(payload).await?)
    }
}

/// Owns every live session. `S` is cloned into each new session.
///
/// A session expires once it has gone `idle_secs` without being looked up,
/// and at most `capacity` sessions are kept: creating one more evicts the
/// least recently used. A submission already in flight keeps its own handle
/// and finishes even if its session is evicted meanwhile.
pub struct SessionStore<S> {
    service: S,
    sessions: Mutex<TimedSizedCache<SessionId, Arc<FormSession<S>>>>,
    next_id: AtomicU64,
}

impl<S: PredictionService + Clone> SessionStore<S> {
    pub fn new(service: S, capacity: usize, idle_secs: u64) -> Self {
        // Lookups refresh the idle timer.
        let sessions = TimedSizedCache::with_size_and_lifespan_and_refresh(capacity.max(1), idle_secs.max(1), true);
        Self {
            service,
            sessions: Mutex::new(sessions),
            next_id: AtomicU64::new(1),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, TimedSizedCache<SessionId, Arc<FormSession<S>>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create(&self) -> (SessionId, Arc<FormSession<S>>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(FormSession::new(FormModel::new(), self.service.clone()));

        let mut sessions = self.sessions();
        sessions.flush();
        sessions.cache_set(id, session.clone());
        tracing::info!("Form session {} created ({} live)", id, sessions.cache_size());
        (id, session)
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<FormSession<S>>> {
        self.sessions().cache_get(&id).cloned()
    }

    pub fn remove(&self, id: SessionId) -> bool {
        let removed = self.sessions().cache_remove(&id).is_some();
        if removed {
            tracing::info!("Form session {} closed", id);
        }
        removed
    }

    /// Number of sessions that have not expired.
    pub fn len(&self) -> usize {
        let mut sessions = self.sessions();
        sessions.flush();
        sessions.cache_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        form::current_year,
        models::NormalizedPredictionRequest,
        orchestrator::RequestState,
        prediction_api::PredictionError,
    };
    use std::{future::Future, thread, time::Duration};

    #[derive(Clone)]
    struct FixedPrice(f64);

    impl PredictionService for FixedPrice {
        fn predict(
            &self,
            _request: &NormalizedPredictionRequest,
        ) -> impl Future<Output = Result<f64, PredictionError>> + Send {
            let price = self.0;
            async move { Ok(price) }
        }
    }

    fn fill_corolla<S: PredictionService>(session: &FormSession<S>) {
        for (field, raw) in [
            (FieldName::Brand, "Toyota"),
            (FieldName::Model, "corolla"),
            (FieldName::YearOfManufacture, "2020"),
            (FieldName::Mileage, "45000"),
            (FieldName::Engine, "1500"),
            (FieldName::Fuel, "Petrol"),
            (FieldName::Gear, "Manual"),
            (FieldName::Condition, "Used"),
        ] {
            session.update_field(field, raw);
        }
    }

    fn store(price: f64) -> SessionStore<FixedPrice> {
        SessionStore::new(FixedPrice(price), 64, 600)
    }

    #[test]
    fn sessions_are_independent() {
        let store = store(1.0);
        let (first_id, first) = store.create();
        let (second_id, second) = store.create();
        assert_ne!(first_id, second_id);

        first.update_field(FieldName::Model, "aqua");
        assert_eq!(first.draft().model, "aqua");
        assert!(second.draft().model.is_empty());
        assert_eq!(second.draft().year_of_manufacture, current_year().to_string());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn removed_sessions_are_gone() {
        let store = store(1.0);
        let (id, _) = store.create();
        assert!(store.get(id).is_some());
        assert!(store.remove(id));
        assert!(store.get(id).is_none());
        assert!(!store.remove(id));
    }

    #[test]
    fn idle_sessions_expire() {
        let store = SessionStore::new(FixedPrice(1.0), 8, 1);
        let (idle, _) = store.create();
        let (busy, _) = store.create();
        assert_eq!(store.len(), 2);

        thread::sleep(Duration::from_millis(700));
        assert!(store.get(busy).is_some());
        thread::sleep(Duration::from_millis(700));

        assert!(store.get(idle).is_none());
        assert!(store.get(busy).is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_stays_within_capacity() {
        let store = SessionStore::new(FixedPrice(1.0), 3, 600);
        let ids: Vec<SessionId> = (0..50).map(|_| store.create().0).collect();

        assert_eq!(store.len(), 3);
        assert!(store.get(ids[0]).is_none());
        for id in &ids[47..] {
            assert!(store.get(*id).is_some());
        }
    }

    #[test]
    fn lookups_protect_a_session_from_eviction() {
        let store = SessionStore::new(FixedPrice(1.0), 2, 600);
        let (kept, _) = store.create();
        let (dropped, _) = store.create();
        assert!(store.get(kept).is_some());

        store.create();
        assert!(store.get(kept).is_some());
        assert!(store.get(dropped).is_none());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn predict_normalizes_then_submits() {
        let store = store(3_500_000.0);
        let (_, session) = store.create();
        fill_corolla(&session);

        let outcome = session.predict().await.expect("valid draft");
        assert!(outcome.is_success());

        let view = session.view();
        assert_eq!(view.state, RequestState::Success);
        assert_eq!(
            view.display.expect("display").estimated_value,
            "LKR 3,500,000"
        );
    }

    #[tokio::test]
    async fn invalid_draft_never_reaches_the_service() {
        let store = store(1.0);
        let (_, session) = store.create();
        fill_corolla(&session);
        session.update_field(FieldName::Mileage, "");

        assert_eq!(
            session.predict().await,
            Err(SubmitError::Invalid(FormError::Missing(FieldName::Mileage)))
        );
        assert_eq!(session.view().state, RequestState::Idle);
    }
}
