//! Audit logging middleware.
//!
//! Logs every API request with a request id, the caller (when the auth
//! layer identified one), method, path, status and latency. Runs
//! outermost so rejected requests are logged too.

use std::time::Instant;

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::api::types::{RequestId, UserContext};

pub async fn log_access(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let started = Instant::now();
    let mut response = next.run(req).await;
    let latency_ms = started.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    let (email, role) = response
        .extensions()
        .get::<UserContext>()
        .map(|u| (u.user.email.clone(), u.user.role.as_str()))
        .unwrap_or_else(|| ("-".to_string(), "-"));

    if status >= 500 {
        tracing::error!(request_id, email, role, method, path, status, latency_ms, "API request");
    } else if status >= 400 {
        tracing::warn!(request_id, email, role, method, path, status, latency_ms, "API request");
    } else {
        tracing::info!(request_id, email, role, method, path, status, latency_ms, "API request");
    }

    if let Ok(val) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("X-Request-Id", val);
    }
    response
}
