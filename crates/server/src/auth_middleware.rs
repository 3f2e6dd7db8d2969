// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! The `x-api-key` authentication middleware. Wraps every route
//! except `/status` and `OPTIONS`; attaches a [`Caller`] extension on
//! success.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use gateway_core::{auth::next_utc_midnight, authenticate, AuthOutcome, KeyLookup, Tier, TunnelName, UsageSnapshot};
use serde_json::json;

use crate::denial_response::{apply_rate_limit_headers, auth_denial_response};
use crate::state::AppState;

/// The authenticated caller, attached to the request extensions by this
/// middleware and read back out by downstream handlers.
#[derive(Debug, Clone)]
pub struct Caller {
    pub key: String,
    pub name: String,
    pub tier: Tier,
    pub tunnel: Option<TunnelName>,
}

pub async fn require_api_key(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let now = Utc::now();
    let key = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let credential = match key.as_deref() {
        Some(k) => state.credentials.get(k),
        None => None,
    };

    let lookup = match (key.as_ref(), credential.as_ref()) {
        (None, _) => KeyLookup::Missing,
        (Some(_), None) => KeyLookup::Unknown,
        (Some(_), Some(c)) => KeyLookup::Found(c),
    };
    let usage_count = key.as_deref().map(|k| state.usage.peek(k, now)).unwrap_or(0);
    let outcome = authenticate(lookup, UsageSnapshot { count: usage_count }, now);

    match outcome {
        AuthOutcome::Deny(denial, rate_limit) => auth_denial_response(&denial, rate_limit),
        AuthOutcome::Allow { remaining } => {
            let (Some(key), Some(credential)) = (key, credential) else {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "authenticator allowed a request with no resolved credential" })),
                )
                    .into_response();
            };

            if let Err(e) = state.usage.record(&key, now) {
                tracing::warn!(error = %e, "failed to persist usage counter");
            }

            let caller = Caller {
                key: key.clone(),
                name: credential.name.clone(),
                tier: credential.tier,
                tunnel: credential.tunnel.clone(),
            };
            req.extensions_mut().insert(caller);

            let mut response = next.run(req).await;
            apply_rate_limit_headers(
                response.headers_mut(),
                credential.daily_limit,
                remaining,
                &next_utc_midnight(now).to_rfc3339(),
            );
            response
        }
    }
}
