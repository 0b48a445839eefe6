use crate::config::ServerConfig;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

#[derive(Clone)]
pub struct AuthState {
    pub config: ServerConfig,
}

pub fn create_auth_state(config: ServerConfig) -> Arc<AuthState> {
    Arc::new(AuthState { config })
}

/// 🔐 AUTHENTICATION MIDDLEWARE: primary security enforcement point
/// AUDIT CHECKPOINT: every request to a protected route passes through here
/// Verify: API key validation, header parsing, authentication logging, timing attack prevention
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let path = request.uri().path().to_string();
    let client_ip = headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    if !auth_state.config.enable_auth {
        return Ok(next.run(request).await);
    }

    // 🌐 CORS PREFLIGHT BYPASS: let OPTIONS through without auth so browser
    // CORS preflight succeeds; the real request still needs a key.
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let unauthorized = || {
        (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"}))).into_response()
    };

    // 🔑 API KEY EXTRACTION: accept either a raw x-api-key header or a
    // standard Bearer authorization header.
    let provided_key = if let Some(value) = headers.get("x-api-key") {
        value.to_str().map_err(|_| {
            warn!("malformed x-api-key header from {} for {}", client_ip, path);
            unauthorized()
        })?
    } else if let Some(value) = headers.get("authorization") {
        let value = value.to_str().map_err(|_| {
            warn!("malformed authorization header from {} for {}", client_ip, path);
            unauthorized()
        })?;
        value.strip_prefix("Bearer ").ok_or_else(|| {
            warn!("authorization header missing Bearer prefix from {} for {}", client_ip, path);
            unauthorized()
        })?
    } else {
        warn!("missing API key from {} for {}", client_ip, path);
        return Err(unauthorized());
    };

    let Some(expected_key) = &auth_state.config.api_key else {
        warn!("auth enabled but no API key configured");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Internal Server Error"})),
        )
            .into_response());
    };

    // 🏗️ ARCHITECTURE DECISION: constant-time key comparison
    // Why: a `==` comparison on the raw bytes lets an attacker recover the
    // key one byte at a time from response-timing differences.
    // Alternative: plain `==` (rejected: vulnerable to timing attacks)
    if provided_key.as_bytes().ct_eq(expected_key.as_bytes()).into() {
        Ok(next.run(request).await)
    } else {
        warn!("authentication failed for {} from {} (invalid key)", path, client_ip);
        Err(unauthorized())
    }
}
