// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! The `/orchestrator/*` admin surface.
//!
//! The tier check is enforced per-handler rather than in a blanket
//! router-level guard: an orchestrator-tier caller gets the admin behavior
//! below, but a worker hitting one of these paths is just an ordinary
//! request, policy-evaluated against its own tunnel like any other path (and
//! normally denied by that tunnel's method/path rules). [`require_orchestrator`]
//! is the shared fork point.

use axum::body::Bytes;
use axum::extract::{Extension, Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_core::Tier;
use gateway_storage::{NewTunnel, StoreError, TunnelPatch};
use serde::Deserialize;
use serde_json::json;

use crate::auth_middleware::Caller;
use crate::denial_response::{bad_request, not_found};
use crate::routes::validate::evaluate_request;
use crate::state::AppState;

/// `None` means the caller is an orchestrator and may proceed; `Some(resp)`
/// is the fallback response a non-orchestrator caller should receive
/// instead: ordinary policy evaluation against its own tunnel.
fn require_orchestrator(state: &AppState, caller: &Caller, method: &Method, uri: &Uri, body: &Bytes) -> Option<Response> {
    if caller.tier.is_orchestrator() {
        None
    } else {
        Some(evaluate_request(state, caller, method, uri, body))
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, Response> {
    if body.is_empty() {
        return Err(bad_request("missing request body"));
    }
    serde_json::from_slice(body).map_err(|e| bad_request(format!("malformed JSON: {e}")))
}

// ---- Tunnels ---------------------------------------------------------

pub async fn list_tunnels(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if let Some(fallback) = require_orchestrator(&state, &caller, &method, &uri, &body) {
        return fallback;
    }
    Json(json!({ "tunnels": state.tunnels.list() })).into_response()
}

pub async fn create_tunnel(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if let Some(fallback) = require_orchestrator(&state, &caller, &method, &uri, &body) {
        return fallback;
    }
    let new: NewTunnel = match parse_body(&body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if new.name.trim().is_empty() {
        return bad_request("missing required field 'name'");
    }
    match state.tunnels.create(new) {
        Ok(tunnel) => (StatusCode::CREATED, Json(json!({ "tunnel": tunnel }))).into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct TunnelUpdateRequest {
    name: String,
    #[serde(flatten)]
    patch: TunnelPatch,
}

pub async fn update_tunnel(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if let Some(fallback) = require_orchestrator(&state, &caller, &method, &uri, &body) {
        return fallback;
    }
    let req: TunnelUpdateRequest = match parse_body(&body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.tunnels.update(&req.name, req.patch) {
        Ok(tunnel) => Json(json!({ "tunnel": tunnel })).into_response(),
        Err(StoreError::TunnelNotFound(name)) => not_found(format!("tunnel '{name}' not found")),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct NamedTarget {
    name: String,
}

pub async fn delete_tunnel(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if let Some(fallback) = require_orchestrator(&state, &caller, &method, &uri, &body) {
        return fallback;
    }
    let req: NamedTarget = match parse_body(&body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.tunnels.delete(&req.name) {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(StoreError::TunnelNotFound(name)) => not_found(format!("tunnel '{name}' not found")),
        Err(e) => internal_error(e),
    }
}

// ---- Credentials / agents ---------------------------------------------

pub async fn list_agents(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if let Some(fallback) = require_orchestrator(&state, &caller, &method, &uri, &body) {
        return fallback;
    }
    let agents: Vec<_> = state
        .credentials
        .list()
        .into_iter()
        .map(|(key, c)| {
            json!({
                "key": gateway_core::Credential::redact_key(key.as_str()),
                "name": c.name,
                "tier": c.tier,
                "tunnel": c.tunnel,
                "dailyLimit": c.daily_limit,
                "active": c.active,
                "createdAt": c.created_at,
                "createdBy": c.created_by,
            })
        })
        .collect();
    Json(json!({ "agents": agents })).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    name: String,
    tunnel: String,
    #[serde(default = "default_daily_limit")]
    daily_limit: u64,
}

fn default_daily_limit() -> u64 {
    1000
}

pub async fn create_agent(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if let Some(fallback) = require_orchestrator(&state, &caller, &method, &uri, &body) {
        return fallback;
    }
    let req: CreateAgentRequest = match parse_body(&body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if req.name.trim().is_empty() {
        return bad_request("missing required field 'name'");
    }
    let Some(tunnel) = state.tunnels.get(&req.tunnel) else {
        return not_found(format!("tunnel '{}' not found", req.tunnel));
    };
    match state
        .credentials
        .create_worker(req.name, gateway_core::TunnelName::new(tunnel.name), req.daily_limit, caller.name.clone())
    {
        Ok((key, credential)) => (
            StatusCode::CREATED,
            Json(json!({ "key": key.as_str(), "name": credential.name, "tunnel": credential.tunnel })),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct KeyTarget {
    key: String,
}

pub async fn delete_agent(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if let Some(fallback) = require_orchestrator(&state, &caller, &method, &uri, &body) {
        return fallback;
    }
    let req: KeyTarget = match parse_body(&body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.credentials.delete(&req.key) {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(StoreError::CredentialNotFound(_)) => not_found("unknown credential key"),
        Err(e) => internal_error(e),
    }
}

// ---- Pipeline runs ------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct StartPipelineRequest {
    pipeline: String,
    agent: String,
}

pub async fn start_pipeline(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if let Some(fallback) = require_orchestrator(&state, &caller, &method, &uri, &body) {
        return fallback;
    }
    let req: StartPipelineRequest = match parse_body(&body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(tunnel) = state.tunnels.get(&req.pipeline) else {
        return not_found(format!("tunnel '{}' not found", req.pipeline));
    };
    if !tunnel.is_pipeline() {
        return bad_request(format!("tunnel '{}' has no pipeline defined", req.pipeline));
    }
    match state.runs.start(req.pipeline, req.agent) {
        Ok(run) => (StatusCode::CREATED, Json(json!({ "run": run }))).into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct RunIdQuery {
    run_id: u64,
}

pub async fn pipeline_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    method: Method,
    uri: Uri,
    body: Bytes,
    Query(q): Query<RunIdQuery>,
) -> Response {
    if let Some(fallback) = require_orchestrator(&state, &caller, &method, &uri, &body) {
        return fallback;
    }
    match state.runs.snapshot(gateway_core::RunId(q.run_id)) {
        Some(run) => Json(json!({ "run": run })).into_response(),
        None => not_found(format!("pipeline run '{}' not found", q.run_id)),
    }
}

pub async fn list_pipeline_runs(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if let Some(fallback) = require_orchestrator(&state, &caller, &method, &uri, &body) {
        return fallback;
    }
    Json(json!({ "runs": state.runs.list() })).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ResetPipelineRequest {
    run_id: u64,
}

pub async fn reset_pipeline(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if let Some(fallback) = require_orchestrator(&state, &caller, &method, &uri, &body) {
        return fallback;
    }
    let req: ResetPipelineRequest = match parse_body(&body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.runs.abort(gateway_core::RunId(req.run_id)) {
        Ok(run) => Json(json!({ "run": run })).into_response(),
        Err(StoreError::RunNotFound(id)) => not_found(format!("pipeline run '{id}' not found")),
        Err(e) => internal_error(e),
    }
}

fn internal_error(e: StoreError) -> Response {
    tracing::error!(error = %e, "orchestrator mutation failed to persist");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "failed to persist store" }))).into_response()
}
