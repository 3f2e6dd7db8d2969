// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! `POST /validate` and `POST /`: worker policy
//! evaluation, with transparent hand-off into the pipeline state machine.

use axum::body::Bytes;
use axum::extract::{Extension, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use gateway_core::{evaluate, Decision, Denial, DenialKind, RunId, StepDenial, StepValidation, Tunnel};
use serde_json::json;

use crate::auth_middleware::Caller;
use crate::denial_response::policy_denial_response;
use crate::state::AppState;

pub async fn validate(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    evaluate_request(&state, &caller, &method, &uri, &body)
}

/// The policy evaluation path, shared between the worker-facing `/validate`
/// handler and the orchestrator routes' fallback for callers that aren't
/// orchestrator-tier: a worker hitting `/orchestrator/*` is just an
/// ordinary request, policy-evaluated against its own tunnel.
pub(crate) fn evaluate_request(state: &AppState, caller: &Caller, method: &Method, uri: &Uri, body: &Bytes) -> Response {
    let tunnel_name = caller
        .tunnel
        .as_ref()
        .map(|t| t.as_str().to_string())
        .unwrap_or_else(|| Tunnel::PUBLIC_VIEWER.to_string());

    let tunnel = state.tunnels.get(&tunnel_name).or_else(|| {
        (tunnel_name == Tunnel::PUBLIC_VIEWER).then(Tunnel::public_viewer_default)
    });

    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or_else(|| uri.path());
    let raw_body = if body.is_empty() { None } else { std::str::from_utf8(body).ok() };

    let decision = evaluate(tunnel.as_ref(), method.as_str(), path_and_query, raw_body);

    match decision {
        Decision::Allow => Json(json!({ "success": true })).into_response(),
        Decision::Deny(denial) => policy_denial_response(&denial, &tunnel_name, &caller.name),
        Decision::PipelineDispatch { run_id, command } => {
            dispatch_pipeline_step(state, &tunnel_name, &caller.name, run_id, command)
        }
    }
}

fn dispatch_pipeline_step(state: &AppState, tunnel_name: &str, agent: &str, run_id: RunId, command: String) -> Response {
    let Some(handle) = state.runs.run_handle(run_id) else {
        let denial = step_denial_to_denial(StepDenial::NotFound, run_id);
        return policy_denial_response(&denial, tunnel_name, agent);
    };

    // The pipeline definition belongs to the run's own tunnel (late-bound by
    // name, per spec.md §9), not the caller's currently-assigned tunnel --
    // those can differ whenever a worker submits a `run_id` started on a
    // different pipeline tunnel than the one it's presently assigned to.
    let run_tunnel = handle.lock().pipeline.clone();
    let pipeline_def = state.tunnels.get(&run_tunnel).and_then(|t| t.pipeline);
    let total_steps = pipeline_def.as_ref().map(|d| d.steps.len()).unwrap_or(0);

    let validation = {
        let mut run = handle.lock();
        let validation = run.validate_step(pipeline_def.as_ref(), &command);
        if let StepValidation::Allowed { step_index, command: matched } = &validation {
            run.confirm_step(*step_index, matched.clone(), Utc::now(), total_steps);
        }
        validation
    };

    if let Err(e) = state.runs.persist() {
        tracing::error!(error = %e, %run_id, "failed to persist pipeline run store");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "failed to persist pipeline run" })),
        )
            .into_response();
    }

    match validation {
        StepValidation::Allowed { .. } => {
            let snapshot = handle.lock().clone();
            let next_command = pipeline_def
                .as_ref()
                .and_then(|d| snapshot.next_command(d))
                .map(str::to_string);
            Json(json!({
                "success": true,
                "run_id": run_id.0,
                "run_status": snapshot.status,
                "next_command": next_command,
            }))
            .into_response()
        }
        StepValidation::Denied(step_denial) => {
            let denial = step_denial_to_denial(step_denial, run_id);
            policy_denial_response(&denial, &run_tunnel, agent)
        }
    }
}

fn step_denial_to_denial(step_denial: StepDenial, run_id: RunId) -> Denial {
    match step_denial {
        StepDenial::NotFound => {
            Denial::new(DenialKind::PipelineRunMissing, format!("Pipeline run '{run_id}' not found"))
        }
        StepDenial::AlreadyCompleted => Denial::new(DenialKind::PipelineTerminal, "already completed"),
        StepDenial::Terminal(msg) => Denial::new(DenialKind::PipelineTerminal, msg),
        StepDenial::ConfigGone => {
            Denial::new(DenialKind::PipelineConfigGone, "Pipeline config no longer exists")
        }
        StepDenial::AllStepsCompleted => {
            Denial::new(DenialKind::PipelineTerminal, "All pipeline steps already completed")
        }
        StepDenial::WrongStep { expected, received } => Denial::with_expected(
            DenialKind::PipelineWrongStep,
            format!("Expected '{expected}', got '{received}'"),
            expected,
        ),
    }
}
