use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::middleware;
use tokio::net::TcpListener;
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::application::auth_service::AuthService;
use crate::application::post_service::PostService;
use crate::data::post_repository::PostRepository;
use crate::data::repositories::memory::post_repository::MemoryPostRepository;
use crate::data::repositories::memory::user_repository::MemoryUserRepository;
use crate::data::repositories::postgres::post_repository::PostgresPostRepository;
use crate::data::repositories::postgres::user_repository::PostgresUserRepository;
use crate::data::user_repository::UserRepository;
use crate::infrastructure::database::{create_pool, run_migrations};
use crate::infrastructure::jwt::JwtService;
use crate::infrastructure::settings::{DatabaseDriver, Settings};
use crate::presentation::AppState;
use crate::presentation::http::app_error::AppError;
use crate::presentation::http::middleware::cors::apply_cors;
use crate::presentation::http::middleware::rate_limit::{RateLimiter, rate_limit_middleware};
use crate::presentation::http::middleware::security::apply_security;
use crate::presentation::http::middleware::trace::apply_trace;
use crate::presentation::http::openapi::ApiDoc;
use crate::presentation::http::routes;

/// Picks the storage backend named by `DATABASE_DRIVER` and wires services.
pub(crate) async fn build_state(settings: &Settings) -> Result<AppState> {
    let users: Arc<dyn UserRepository>;
    let posts: Arc<dyn PostRepository>;
    match settings.database_driver {
        DatabaseDriver::Postgres => {
            let url = settings
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow!("DATABASE_URL is required for the postgres driver"))?;
            let pool = create_pool(url, settings.database_max_connections).await?;
            run_migrations(&pool).await?;
            info!(max_connections = settings.database_max_connections, "using postgres storage");
            users = Arc::new(PostgresUserRepository::new(pool.clone()));
            posts = Arc::new(PostgresPostRepository::new(pool));
        }
        DatabaseDriver::Memory => {
            info!("using in-memory storage, data is lost on restart");
            users = Arc::new(MemoryUserRepository::new());
            posts = Arc::new(MemoryPostRepository::new());
        }
    }

    let jwt = JwtService::new(
        &settings.jwt_secret,
        settings.jwt_access_ttl_seconds,
        settings.jwt_refresh_ttl_seconds,
    );

    Ok(AppState::new(
        Arc::new(AuthService::new(users, jwt)),
        Arc::new(PostService::new(posts)),
        Arc::new(RateLimiter::new(settings.rate_limit_per_second)),
    ))
}

/// Router with the full middleware stack. Outermost first: trace, CORS,
/// security headers, gzip, rate limit, timeout, concurrency limit, body limit.
pub(crate) fn build_app(state: AppState, settings: &Settings) -> Result<Router> {
    let app = routes::router(state.clone())
        .with_state(state.clone())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(RequestBodyLimitLayer::new(settings.http_request_body_limit_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(Duration::from_secs(settings.http_request_timeout_secs))
                .concurrency_limit(settings.http_concurrency_limit),
        )
        .layer(middleware::from_fn_with_state(state, rate_limit_middleware));

    let app = apply_security(app);
    let app = apply_cors(app, &settings.cors_origins)?;
    Ok(apply_trace(app))
}

async fn handle_middleware_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::Timeout
    } else {
        AppError::Internal(anyhow!("unhandled middleware error: {err}"))
    }
}

pub(crate) async fn run_http(settings: &Settings, state: AppState) -> Result<()> {
    let app = build_app(state, settings)?;

    let listener = TcpListener::bind(&settings.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.http_addr))?;

    info!("HTTP server listening on {}", settings.http_addr);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, draining connections");
}
