//! Access control for the HTTP API: an optional shared bearer key and a
//! per-client request budget.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

/// Requests per minute when MINTEL_RATE_LIMIT is unset.
const DEFAULT_RATE_LIMIT: u32 = 100;

#[derive(Clone, Debug)]
pub struct SecurityConfig {
    /// Shared key clients send as `Authorization: Bearer <key>` (MINTEL_API_KEY)
    pub api_key: Option<String>,
    /// Allowed CORS origins (MINTEL_CORS_ORIGINS, comma-separated). `None` is permissive.
    pub cors_origins: Option<Vec<String>>,
    pub rate_limiter: Option<RateLimiter>,
}

impl SecurityConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("MINTEL_API_KEY").map(|key| key.trim().to_string());
        let cors_origins = get("MINTEL_CORS_ORIGINS").map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect()
        });

        let per_minute = match get("MINTEL_RATE_LIMIT").map(|raw| raw.trim().parse::<u32>()) {
            Some(Ok(limit)) => limit,
            Some(Err(_)) => {
                tracing::warn!(
                    "Invalid MINTEL_RATE_LIMIT, using {} requests per minute",
                    DEFAULT_RATE_LIMIT
                );
                DEFAULT_RATE_LIMIT
            }
            None => DEFAULT_RATE_LIMIT,
        };

        // Without a key the server is meant for local use only
        let rate_limiter = api_key.as_ref().map(|_| RateLimiter::per_minute(per_minute));

        Self {
            api_key,
            cors_origins,
            rate_limiter,
        }
    }

    /// Open access: no key, permissive CORS, no request budget.
    pub fn disabled() -> Self {
        Self {
            api_key: None,
            cors_origins: None,
            rate_limiter: None,
        }
    }

    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Self::disabled()
        }
    }

    pub fn with_rate_limit(per_minute: u32) -> Self {
        Self {
            rate_limiter: Some(RateLimiter::per_minute(per_minute)),
            ..Self::disabled()
        }
    }
}

/// Fixed-window request counter keyed by client address.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    clients: Arc<Mutex<HashMap<IpAddr, Window>>>,
}

#[derive(Clone, Copy, Debug)]
struct Window {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    /// Count one request from `client`. False once its window is used up.
    pub fn check(&self, client: IpAddr) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().expect("rate limiter lock poisoned");
        let window = clients.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= self.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }
        if window.count >= self.limit {
            return false;
        }
        window.count += 1;
        true
    }

    /// Forget clients whose window has expired.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.clients
            .lock()
            .expect("rate limiter lock poisoned")
            .retain(|_, window| now.duration_since(window.started) < self.window);
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().expect("rate limiter lock poisoned").len()
    }
}

/// The bearer token of a request, or why there is none.
fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or("missing Authorization header")?
        .to_str()
        .map_err(|_| "unreadable Authorization header")?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or("Authorization header is not a bearer token")
}

pub async fn auth_middleware(
    State(config): State<SecurityConfig>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = config.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    match bearer_token(request.headers()).map(|token| token == expected) {
        Ok(true) => Ok(next.run(request).await),
        Ok(false) => {
            tracing::warn!(path = %request.uri().path(), "Rejected request with wrong API key");
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(reason) => {
            tracing::warn!(path = %request.uri().path(), "Rejected request: {}", reason);
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let client = client_ip(request.headers());
    if !limiter.check(client) {
        tracing::warn!(%client, "Rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }
    Ok(next.run(request).await)
}

/// Client address from proxy headers. Direct connections count as localhost.
fn client_ip(headers: &HeaderMap) -> IpAddr {
    let from = |name: &str| {
        headers
            .get(name)?
            .to_str()
            .ok()?
            .split(',')
            .next()?
            .trim()
            .parse::<IpAddr>()
            .ok()
    };

    from("X-Forwarded-For")
        .or_else(|| from("X-Real-IP"))
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}
