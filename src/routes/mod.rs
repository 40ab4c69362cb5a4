// Route definitions

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::AppState;

mod api;

pub fn create_router(app_state: AppState) -> Router {
    // Form sessions and options; handlers pull what they need out of AppState.
    let api_router = Router::new()
        .route("/options", get(api::get_options))
        .route("/sessions", post(api::create_session))
        .route(
            "/sessions/:id",
            get(api::get_session).delete(api::delete_session),
        )
        .route("/sessions/:id/fields/:name", put(api::update_field))
        .route("/sessions/:id/predict", post(api::predict));

    Router::new()
        .route("/health", get(api::health))
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
