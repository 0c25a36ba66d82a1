use std::sync::Arc;

use crate::application::auth_service::AuthService;
use crate::application::post_service::PostService;
use crate::data::post_repository::PostRepository;
use crate::data::user_repository::UserRepository;
use crate::presentation::http::middleware::rate_limit::RateLimiter;

pub(crate) mod http;

pub(crate) type SharedAuthService = Arc<AuthService<Arc<dyn UserRepository>>>;
pub(crate) type SharedPostService = Arc<PostService<Arc<dyn PostRepository>>>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) auth_service: SharedAuthService,
    pub(crate) post_service: SharedPostService,
    pub(crate) rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub(crate) fn new(
        auth_service: SharedAuthService,
        post_service: SharedPostService,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            auth_service,
            post_service,
            rate_limiter,
        }
    }
}
