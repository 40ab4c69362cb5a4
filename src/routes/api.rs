// Handlers for the prediction form API

use std::sync::Arc;

use axum::{
    extract::{Json as JsonExtract, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::Settings,
    error::{AppError, AppResult},
    form::{FieldName, FormOptions, VehicleAttributes},
    prediction_api::PredictionClient,
    results::OutcomeView,
    session::{FormSession, SessionId, SessionStore},
};

type Sessions = Arc<SessionStore<PredictionClient>>;

// --- Response Wrappers ---

#[derive(Serialize)]
pub struct SessionResponse {
    id: SessionId,
    draft: VehicleAttributes,
    #[serde(flatten)]
    outcome: OutcomeView,
}

impl SessionResponse {
    fn new(id: SessionId, session: &FormSession<PredictionClient>) -> Self {
        Self {
            id,
            draft: session.draft(),
            outcome: session.view(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    prediction_url: String,
    active_sessions: usize,
}

// --- Request Structs ---

// Raw field input. JSON clients may send numbers or booleans; they are kept
// in their textual form until normalization.
#[derive(Deserialize, Debug)]
pub struct FieldUpdate {
    #[serde(default)]
    value: Value,
}

impl FieldUpdate {
    fn into_raw(self) -> String {
        match self.value {
            Value::Null => String::new(),
            Value::String(raw) => raw,
            Value::Bool(flag) => (if flag { "1" } else { "0" }).to_string(),
            // 2020.0 is stored as "2020" so integer fields still parse.
            Value::Number(number) => match number.as_f64() {
                Some(whole) if !number.is_i64() && !number.is_u64() && whole.fract() == 0.0 && whole.abs() < 1e15 => {
                    format!("{whole:.0}")
                }
                _ => number.to_string(),
            },
            other => other.to_string(),
        }
    }
}

fn find_session(sessions: &Sessions, id: SessionId) -> AppResult<Arc<FormSession<PredictionClient>>> {
    sessions
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("No form session with id {}", id)))
}

// --- API Handlers ---

pub async fn health(
    State(settings): State<Arc<Settings>>,
    State(sessions): State<Sessions>,
) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        prediction_url: settings.prediction_url.clone(),
        active_sessions: sessions.len(),
    })
}

pub async fn get_options() -> impl IntoResponse {
    tracing::debug!("[HANDLER] /api/options - Building form options.");
    Json(FormOptions::current())
}

pub async fn create_session(State(sessions): State<Sessions>) -> impl IntoResponse {
    let (id, session) = sessions.create();
    (StatusCode::CREATED, Json(SessionResponse::new(id, &session)))
}

pub async fn get_session(
    State(sessions): State<Sessions>,
    Path(id): Path<SessionId>,
) -> AppResult<Json<SessionResponse>> {
    let session = find_session(&sessions, id)?;
    Ok(Json(SessionResponse::new(id, &session)))
}

pub async fn delete_session(
    State(sessions): State<Sessions>,
    Path(id): Path<SessionId>,
) -> AppResult<StatusCode> {
    if sessions.remove(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("No form session with id {}", id)))
    }
}

pub async fn update_field(
    State(sessions): State<Sessions>,
    Path((id, name)): Path<(SessionId, String)>,
    JsonExtract(update): JsonExtract<FieldUpdate>,
) -> AppResult<Json<SessionResponse>> {
    let field: FieldName = name
        .parse()
        .map_err(|e: crate::form::UnknownField| AppError::NotFound(e.to_string()))?;
    let session = find_session(&sessions, id)?;

    session.update_field(field, update.into_raw());
    Ok(Json(SessionResponse::new(id, &session)))
}

pub async fn predict(
    State(sessions): State<Sessions>,
    Path(id): Path<SessionId>,
) -> AppResult<Json<SessionResponse>> {
    let session = find_session(&sessions, id)?;
    tracing::info!("[HANDLER] /api/sessions/{}/predict - Submitting draft.", id);

    let outcome = session.predict().await?;
    if outcome.is_success() {
        tracing::info!("[HANDLER] /api/sessions/{}/predict - Prediction succeeded.", id);
    } else {
        // Still a 200: the failure is reported in the body and the form stays usable.
        tracing::warn!("[HANDLER] /api/sessions/{}/predict - Prediction failed: {:?}", id, outcome);
    }

    Ok(Json(SessionResponse::new(id, &session)))
}
