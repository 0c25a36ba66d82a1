use axum::Router;
use axum::routing::get;

use crate::presentation::AppState;
use crate::presentation::http::handlers::health::healthz;

pub(crate) mod auth;
pub(crate) mod posts;

pub(crate) fn router(state: AppState) -> Router<AppState> {
    let api = Router::new()
        .nest("/auth", auth::router(state.clone()))
        .nest("/posts", posts::router(state));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api/v1", api)
}
