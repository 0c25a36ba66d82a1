use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Mutex;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::presentation::AppState;
use crate::presentation::http::app_error::AppError;

/// Windows older than the current second are swept once the map grows past this.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    second: u64,
    count: u64,
}

/// Fixed one-second window per client address.
#[derive(Debug)]
pub(crate) struct RateLimiter {
    per_second: u64,
    started: Instant,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub(crate) fn new(per_second: u64) -> Self {
        Self {
            per_second,
            started: Instant::now(),
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn try_acquire(&self, client: IpAddr) -> bool {
        self.try_acquire_at(client, self.started.elapsed().as_secs())
    }

    fn try_acquire_at(&self, client: IpAddr, second: u64) -> bool {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if windows.len() > SWEEP_THRESHOLD {
            windows.retain(|_, window| window.second >= second);
        }

        let window = windows.entry(client).or_insert(Window { second, count: 0 });
        if window.second < second {
            *window = Window { second, count: 0 };
        }
        if window.count >= self.per_second {
            return false;
        }
        window.count += 1;
        true
    }
}

/// Requests without a peer address (in-process callers) share one bucket.
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub(crate) async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_ip(&request);
    if !state.rate_limiter.try_acquire(client) {
        warn!(client = %client, path = %request.uri().path(), "rate limit exceeded");
        return Err(AppError::TooManyRequests);
    }

    Ok(next.run(request).await)
}
