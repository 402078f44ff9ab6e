//! # Authentication
//!
//! Optional API key check. Browsers cannot set headers on a WebSocket
//! handshake, so the key is accepted either as
//! `Authorization: Bearer <key>` or as a `?key=<key>` query parameter.
//! `/health` is always open.

use super::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

/// Key presented by the client, header first.
fn provided_key(request: &Request<Body>) -> Option<&str> {
    let from_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v));
    from_header.or_else(|| {
        request
            .uri()
            .query()?
            .split('&')
            .find_map(|pair| pair.strip_prefix("key="))
    })
}

/// Constant-time key comparison over equal-length padded buffers.
pub fn keys_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    let len = provided.len().max(expected.len());
    let mut a = vec![0u8; len];
    let mut b = vec![0u8; len];
    a[..provided.len()].copy_from_slice(provided);
    b[..expected.len()].copy_from_slice(expected);
    let equal: bool = a.ct_eq(&b).into();
    equal && provided.len() == expected.len()
}

pub async fn api_key_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let Some(expected) = state.config.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    match provided_key(&request) {
        Some(key) if keys_match(key, expected) => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(event = "auth_failure", reason = "invalid_api_key", "Authentication failed");
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
        None => {
            tracing::warn!(event = "auth_failure", reason = "missing_api_key", "Missing API key");
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_comparison() {
        assert!(keys_match("abc", "abc"));
        assert!(!keys_match("abc", "abcd"));
        assert!(!keys_match("", "abc"));
    }

    #[test]
    fn key_from_query_or_header() {
        let request = Request::builder()
            .uri("/ws?x=1&key=secret")
            .body(Body::empty())
            .expect("request");
        assert_eq!(provided_key(&request), Some("secret"));

        let request = Request::builder()
            .uri("/ws?key=query")
            .header(header::AUTHORIZATION, "Bearer header")
            .body(Body::empty())
            .expect("request");
        assert_eq!(provided_key(&request), Some("header"));
    }
}
