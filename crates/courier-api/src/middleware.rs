//! Request guards: host allow-list and token authentication.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::{ApiError, INVALID_TOKEN, NOT_AUTHENTICATED};
use crate::handlers::ApiState;

const INVALID_HOST: &str = "Invalid HTTP_HOST header";

/// Reject requests whose `Host` is not in the allow-list.
pub async fn check_host(State(state): State<ApiState>, request: Request, next: Next) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().host().map(str::to_string));

    let allowed = match host.as_deref() {
        Some(host) => host_allowed(strip_port(host), &state.allowed_hosts),
        None => state.allowed_hosts.iter().any(|p| p == "*"),
    };
    if !allowed {
        tracing::warn!(host = host.as_deref().unwrap_or(""), "rejected request for disallowed host");
        return ApiError::BadRequest(INVALID_HOST.to_string()).into_response();
    }
    next.run(request).await
}

/// Resolve the request's token to a user and attach it as an extension.
pub async fn require_auth(
    State(state): State<ApiState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_str = match request.headers().get(header::AUTHORIZATION) {
        Some(value) => value
            .to_str()
            .map_err(|_| ApiError::auth_error("Invalid token header. Token string should not contain invalid characters."))?,
        None => return Err(ApiError::auth_error(NOT_AUTHENTICATED)),
    };

    let token = extract_token(auth_str)?;

    let user = state
        .credentials
        .user_for_token(token)
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| {
            tracing::warn!("request with unknown token");
            ApiError::auth_error(INVALID_TOKEN)
        })?;

    tracing::debug!(user_id = user.id, username = %user.username, "authenticated request");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Pull the credential out of a `Bearer <token>` or `Token <token>` header.
fn extract_token(auth_str: &str) -> Result<&str, ApiError> {
    let mut parts = auth_str.split_whitespace();
    let scheme = parts.next().unwrap_or("");
    if !scheme.eq_ignore_ascii_case("bearer") && !scheme.eq_ignore_ascii_case("token") {
        return Err(ApiError::auth_error(NOT_AUTHENTICATED));
    }
    match (parts.next(), parts.next()) {
        (Some(token), None) => Ok(token),
        (None, _) => Err(ApiError::auth_error("Invalid token header. No credentials provided.")),
        (Some(_), Some(_)) => Err(ApiError::auth_error(
            "Invalid token header. Token string should not contain spaces.",
        )),
    }
}

/// Drop a trailing `:port`, keeping bracketed IPv6 literals intact.
fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &host[..end + 2],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

/// `*` matches anything; `.example.com` matches the domain and its subdomains.
fn host_allowed(host: &str, patterns: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    patterns.iter().any(|pattern| {
        let pattern = pattern.to_ascii_lowercase();
        if pattern == "*" {
            return true;
        }
        match pattern.strip_prefix('.') {
            Some(domain) => host == domain || host.ends_with(&pattern),
            None => host == pattern,
        }
    })
}
