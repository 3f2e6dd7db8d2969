// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! Maps `gateway_core::Denial`/`DenialKind` onto HTTP responses: policy
//! denials are 403 with `{error, reason, tunnel, agent, expected_command?}`;
//! auth failures are 401/429 with `{error}` plus, for rate limiting, the
//! `X-RateLimit-*` headers.

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_core::{Denial, DenialKind, RateLimitHeaders};
use serde_json::json;

fn kind_label(kind: DenialKind) -> &'static str {
    match kind {
        DenialKind::AuthMissing => "auth_missing",
        DenialKind::AuthInvalid => "auth_invalid",
        DenialKind::AuthRevoked => "auth_revoked",
        DenialKind::RateLimited => "rate_limited",
        DenialKind::TunnelUnknown => "tunnel_unknown",
        DenialKind::MethodNotAllowed => "method_not_allowed",
        DenialKind::PathNotAllowed => "path_not_allowed",
        DenialKind::BadJson => "bad_json",
        DenialKind::CommandNotWhitelisted => "command_not_whitelisted",
        DenialKind::ForbiddenKeyword => "forbidden_keyword",
        DenialKind::StrictModeEmpty => "strict_mode_empty",
        DenialKind::PipelineWrongStep => "pipeline_wrong_step",
        DenialKind::PipelineRunMissing => "pipeline_run_missing",
        DenialKind::PipelineTerminal => "pipeline_terminal",
        DenialKind::PipelineConfigGone => "pipeline_config_gone",
        DenialKind::NotFound => "not_found",
        DenialKind::Internal => "internal",
    }
}

fn status_for(kind: DenialKind) -> StatusCode {
    match kind {
        DenialKind::AuthMissing | DenialKind::AuthInvalid | DenialKind::AuthRevoked => {
            StatusCode::UNAUTHORIZED
        }
        DenialKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        DenialKind::NotFound => StatusCode::NOT_FOUND,
        DenialKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::FORBIDDEN,
    }
}

/// A policy or pipeline denial encountered while evaluating a worker
/// request against its tunnel.
pub fn policy_denial_response(denial: &Denial, tunnel: &str, agent: &str) -> Response {
    let status = status_for(denial.kind);
    let body = json!({
        "error": kind_label(denial.kind),
        "reason": denial.reason,
        "tunnel": tunnel,
        "agent": agent,
        "expected_command": denial.expected_command,
    });
    (status, Json(body)).into_response()
}

/// An authenticator-level denial: missing/unknown/revoked key, or
/// rate limit exceeded.
pub fn auth_denial_response(denial: &Denial, rate_limit: Option<RateLimitHeaders>) -> Response {
    let status = status_for(denial.kind);
    let mut response = (status, Json(json!({ "error": denial.reason }))).into_response();
    if let Some(limits) = rate_limit {
        apply_rate_limit_headers(response.headers_mut(), limits.limit, limits.remaining, &limits.reset.to_rfc3339());
    }
    response
}

pub fn apply_rate_limit_headers(headers: &mut HeaderMap, limit: u64, remaining: u64, reset: &str) {
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from_str(&limit.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from_str(&remaining.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    if let Ok(value) = HeaderValue::from_str(reset) {
        headers.insert(HeaderName::from_static("x-ratelimit-reset"), value);
    }
}

/// A generic administrative error: malformed JSON or a missing required
/// field on an orchestrator-API request, returned as 400.
pub fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message.into() }))).into_response()
}

pub fn not_found(message: impl Into<String>) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message.into() }))).into_response()
}
