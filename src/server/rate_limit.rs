use axum::{
    extract::{ ConnectInfo, Request, State },
    http::{ HeaderMap, HeaderValue, StatusCode },
    middleware::Next,
    response::{ IntoResponse, Response },
    Json,
};
use governor::{ clock::{ Clock, DefaultClock }, DefaultKeyedRateLimiter, Quota, RateLimiter };
use log::{ debug, warn };
use serde_json::json;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use super::guard::GUARDED_PREFIX;

pub const PRUNE_INTERVAL: Duration = Duration::from_secs(5 * 60);

const fn nz(n: u32) -> NonZeroU32 {
    match NonZeroU32::new(n) {
        Some(v) => v,
        None => panic!("rate limit quota must be non-zero"),
    }
}

struct RouteLimit {
    limit: u32,
    limiter: DefaultKeyedRateLimiter<String>,
}

impl RouteLimit {
    fn per_minute(limit: u32) -> Self {
        Self {
            limit,
            limiter: RateLimiter::keyed(Quota::per_minute(nz(limit))),
        }
    }

    fn burst_then_per_minute(burst: u32, per_minute: u32) -> Self {
        Self {
            limit: burst,
            limiter: RateLimiter::keyed(Quota::per_minute(nz(per_minute)).allow_burst(nz(burst))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttled {
    pub limit: u32,
    pub retry_after_secs: u64,
}

/// Token buckets keyed by `client-ip:path`, one bucket family per route class.
pub struct ApiRateLimiter {
    routes: Vec<(&'static str, RouteLimit)>,
    fallback: RouteLimit,
    clock: DefaultClock,
}

impl Default for ApiRateLimiter {
    fn default() -> Self {
        Self {
            routes: vec![
                ("/api/assistant", RouteLimit::per_minute(10)),
                ("/api/chat", RouteLimit::per_minute(10)),
                ("/api/feedback", RouteLimit::burst_then_per_minute(5, 1)),
                ("/api/telegram-notify", RouteLimit::per_minute(20))
            ],
            fallback: RouteLimit::per_minute(30),
            clock: DefaultClock::default(),
        }
    }
}

impl ApiRateLimiter {
    fn route_for(&self, path: &str) -> &RouteLimit {
        self.routes
            .iter()
            .find(|(prefix, _)| path == *prefix || path.starts_with(&format!("{}/", prefix)))
            .map(|(_, route)| route)
            .unwrap_or(&self.fallback)
    }

    pub fn check(&self, client_ip: &str, path: &str) -> Result<(), Throttled> {
        let route = self.route_for(path);
        let key = format!("{}:{}", client_ip, path);
        route.limiter.check_key(&key).map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            Throttled {
                limit: route.limit,
                retry_after_secs: wait.as_secs_f64().ceil().max(1.0) as u64,
            }
        })
    }

    /// Drops buckets that have fully refilled.
    pub fn prune(&self) {
        for (_, route) in &self.routes {
            route.limiter.retain_recent();
            route.limiter.shrink_to_fit();
        }
        self.fallback.limiter.retain_recent();
        self.fallback.limiter.shrink_to_fit();
    }

    pub fn tracked_keys(&self) -> usize {
        self.routes.iter().map(|(_, r)| r.limiter.len()).sum::<usize>() + self.fallback.limiter.len()
    }

    pub fn spawn_pruner(self: &Arc<Self>) {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.prune();
                debug!("Rate limiter pruned, {} client keys tracked", limiter.tracked_keys());
            }
        });
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// First `X-Forwarded-For` entry, then `X-Real-IP`, then the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
            return first.to_string();
        }
    }
    if let Some(real) = header_str(headers, "x-real-ip") {
        return real.to_string();
    }
    peer.map(|addr| addr.ip().to_string()).unwrap_or_else(|| "unknown".to_string())
}

fn throttled_response(throttled: Throttled) -> Response {
    let body = json!({
        "error": "Too many requests",
        "message": format!("Rate limit exceeded. Try again in {} seconds.", throttled.retry_after_secs),
        "retryAfter": throttled.retry_after_secs,
    });
    let mut resp = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    let headers = resp.headers_mut();
    headers.insert("retry-after", HeaderValue::from(throttled.retry_after_secs));
    headers.insert("x-ratelimit-limit", HeaderValue::from(throttled.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
    resp
}

pub async fn rate_limit(
    State(limiter): State<Arc<ApiRateLimiter>>,
    req: Request,
    next: Next
) -> Response {
    let path = req.uri().path().to_string();
    if !path.starts_with(GUARDED_PREFIX) {
        return next.run(req).await;
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(req.headers(), peer);

    match limiter.check(&ip, &path) {
        Ok(()) => next.run(req).await,
        Err(throttled) => {
            warn!("Rate limit exceeded for {} on {}", ip, path);
            throttled_response(throttled)
        }
    }
}
