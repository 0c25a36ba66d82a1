use axum::{Router, middleware, routing::post};

use crate::presentation::AppState;
use crate::presentation::http::handlers::auth::{check, refresh, sign_in, sign_up};
use crate::presentation::http::middleware::auth::jwt_auth_middleware;

pub(crate) fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/signup", post(sign_up))
        .route("/signin", post(sign_in))
        .route("/refresh", post(refresh));

    let protected = Router::new()
        .route("/check", post(check))
        .layer(middleware::from_fn_with_state(state, jwt_auth_middleware));

    public.merge(protected)
}
