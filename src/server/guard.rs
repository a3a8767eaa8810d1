use axum::{
    extract::{ Request, State },
    http::{ header, HeaderMap, HeaderName, Method, StatusCode },
    middleware::Next,
    response::{ IntoResponse, Response },
    Json,
};
use log::warn;
use serde_json::json;
use std::sync::Arc;
use url::Url;

pub const GUARDED_PREFIX: &str = "/api/";

/// How the `Origin` header is compared with `Host`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Origin must contain Host anywhere in the string.
    Substring,
    /// Origin must parse as a URL whose host[:port] equals Host.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Reject(&'static str),
}

#[derive(Debug, Clone)]
pub struct OriginGuard {
    policy: OriginPolicy,
    custom_header: HeaderName,
    prefix: String,
}

impl OriginGuard {
    pub fn new(policy: OriginPolicy, custom_header: &str) -> Result<Self, header::InvalidHeaderName> {
        Ok(Self {
            policy,
            custom_header: HeaderName::from_bytes(custom_header.trim().as_bytes())?,
            prefix: GUARDED_PREFIX.to_string(),
        })
    }

    pub fn applies_to(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    /// `authority` is the request URI authority. HTTP/2 clients send it in
    /// place of a `Host` header.
    pub fn evaluate(&self, method: &Method, headers: &HeaderMap, authority: Option<&str>) -> GuardDecision {
        if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
            return GuardDecision::Allow;
        }

        let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or(authority)
            .map(str::trim)
            .filter(|h| !h.is_empty());

        match (origin, host) {
            (Some(_), None) => GuardDecision::Reject("Missing Host header"),
            (Some(origin), Some(host)) => {
                let same_site = match self.policy {
                    OriginPolicy::Substring => origin.contains(host),
                    OriginPolicy::Strict => origin_matches_host(origin, host),
                };
                if same_site {
                    GuardDecision::Allow
                } else {
                    GuardDecision::Reject("Invalid origin")
                }
            }
            (None, _) => {
                if headers.contains_key(&self.custom_header) {
                    GuardDecision::Allow
                } else {
                    GuardDecision::Reject("Missing required headers")
                }
            }
        }
    }
}

fn split_host_port(host: &str) -> (&str, Option<u16>) {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) =>
            match port.parse() {
                Ok(p) => (name, Some(p)),
                Err(_) => (host, None),
            },
        _ => (host, None),
    }
}

fn origin_matches_host(origin: &str, host: &str) -> bool {
    let Ok(url) = Url::parse(origin) else {
        return false;
    };
    let Some(origin_host) = url.host_str() else {
        return false;
    };
    let (host_name, host_port) = split_host_port(host);
    if !origin_host.eq_ignore_ascii_case(host_name) {
        return false;
    }
    match host_port {
        Some(port) => url.port_or_known_default() == Some(port),
        None => url.port().is_none(),
    }
}

pub async fn origin_guard(
    State(guard): State<Arc<OriginGuard>>,
    req: Request,
    next: Next
) -> Response {
    if !guard.applies_to(req.uri().path()) {
        return next.run(req).await;
    }

    let authority = req.uri().authority().map(|a| a.as_str());
    match guard.evaluate(req.method(), req.headers(), authority) {
        GuardDecision::Allow => next.run(req).await,
        GuardDecision::Reject(reason) => {
            warn!(
                "Origin guard rejected {} {}: {} (origin={:?})",
                req.method(),
                req.uri().path(),
                reason,
                req.headers().get(header::ORIGIN)
            );
            (StatusCode::FORBIDDEN, Json(json!({ "error": reason }))).into_response()
        }
    }
}
