// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! HTTP surface for the policy gateway: authentication, policy
//! evaluation, pipeline dispatch, and the orchestrator admin API.

pub mod auth_middleware;
pub mod denial_response;
pub mod routes;
pub mod state;

use axum::http::{HeaderName, Method};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use auth_middleware::require_api_key;
use routes::{orchestrator, status, validate};
use state::AppState;

/// Build the full router. `/status` is unauthenticated; every other
/// route runs behind [`require_api_key`]. CORS headers are the fixed
/// allow-all set, not a per-origin mirror.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([HeaderName::from_static("x-api-key"), HeaderName::from_static("content-type")])
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS]);

    let authenticated = Router::new()
        .route("/validate", post(validate::validate))
        .route("/", post(validate::validate))
        .route("/orchestrator/tunnels", get(orchestrator::list_tunnels))
        .route("/orchestrator/tunnels/create", post(orchestrator::create_tunnel))
        .route("/orchestrator/tunnels/update", post(orchestrator::update_tunnel))
        .route("/orchestrator/tunnels/delete", post(orchestrator::delete_tunnel))
        .route("/orchestrator/agents", get(orchestrator::list_agents))
        .route("/orchestrator/agents/create", post(orchestrator::create_agent))
        .route("/orchestrator/agents/delete", post(orchestrator::delete_agent))
        .route("/orchestrator/pipeline/start", post(orchestrator::start_pipeline))
        .route("/orchestrator/pipeline/status", get(orchestrator::pipeline_status))
        .route("/orchestrator/pipeline/runs", get(orchestrator::list_pipeline_runs))
        .route("/orchestrator/pipeline/reset", post(orchestrator::reset_pipeline))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/status", get(status::status))
        .merge(authenticated)
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use gateway_storage::{CredentialStore, PipelineRunStore, TunnelRegistry, UsageCounters};
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn fresh_state() -> AppState {
        let dir = tempfile::tempdir().unwrap();
        AppState::new(
            Arc::new(CredentialStore::load(dir.path().join("c.json")).unwrap()),
            Arc::new(TunnelRegistry::load(dir.path().join("t.json")).unwrap()),
            Arc::new(PipelineRunStore::load(dir.path().join("r.json")).unwrap()),
            Arc::new(UsageCounters::load(dir.path().join("u.json")).unwrap()),
        )
    }

    #[tokio::test]
    async fn status_requires_no_auth() {
        let app = build_router(fresh_state());
        let resp = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn validate_without_api_key_is_401() {
        let app = build_router(fresh_state());
        let resp = app
            .oneshot(Request::builder().method("POST").uri("/validate").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn preflight_options_is_200_with_cors_headers() {
        let app = build_router(fresh_state());
        let resp = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/validate")
                    .header("origin", "https://example.com")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("access-control-allow-origin"));
    }

    fn pipeline_tunnel(name: &str, steps: &[&str]) -> gateway_storage::NewTunnel {
        gateway_storage::NewTunnel {
            name: name.to_string(),
            allowed_methods: vec!["POST".into()],
            allowed_paths: vec![],
            allowed_commands: vec![],
            forbidden_keywords: vec![],
            command_whitelist_mode: gateway_core::CommandWhitelistMode::Strict,
            description: String::new(),
            pipeline: Some(gateway_core::PipelineDef {
                steps: steps
                    .iter()
                    .map(|c| gateway_core::PipelineStepDef { command: c.to_string(), description: None })
                    .collect(),
            }),
        }
    }

    async fn post_validate(app: &Router, key: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/validate")
                    .header("x-api-key", key)
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// spec.md §8 scenario 4: a four-step pipeline driven to completion
    /// through the real `/validate` route, not the pure state machine.
    #[tokio::test]
    async fn pipeline_happy_path_completes_through_the_http_route() {
        let state = fresh_state();
        state
            .tunnels
            .create(pipeline_tunnel("Deploy", &["git pull origin main", "npm install", "npm run build", "pm2 restart shortshub"]))
            .unwrap();
        let (key, _) = state
            .credentials
            .create_worker("agent-1".into(), gateway_core::TunnelName::new("Deploy"), 1000, "orch-1".into())
            .unwrap();
        let run = state.runs.start("Deploy".into(), "agent-1".into()).unwrap();

        let app = build_router(state);

        let steps = [
            ("git pull origin main", "in_progress", Some("npm install")),
            ("npm install", "in_progress", Some("npm run build")),
            ("npm run build", "in_progress", Some("pm2 restart shortshub")),
            ("pm2 restart shortshub", "completed", None),
        ];
        for (command, expected_status, expected_next) in steps {
            let (status, body) =
                post_validate(&app, key.as_str(), json!({ "command": command, "run_id": run.run_id.0 })).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
            assert_eq!(body["run_status"], expected_status);
            assert_eq!(body["next_command"], json!(expected_next));
        }
    }

    /// spec.md §8 scenario 5: submitting a later step before its predecessor
    /// is confirmed is denied and must not advance the run.
    #[tokio::test]
    async fn pipeline_skip_ahead_is_denied_through_the_http_route() {
        let state = fresh_state();
        state
            .tunnels
            .create(pipeline_tunnel("Deploy", &["git pull", "npm install", "npm run build"]))
            .unwrap();
        let (key, _) = state
            .credentials
            .create_worker("agent-1".into(), gateway_core::TunnelName::new("Deploy"), 1000, "orch-1".into())
            .unwrap();
        let run = state.runs.start("Deploy".into(), "agent-1".into()).unwrap();

        let app = build_router(state.clone());

        let (status, body) =
            post_validate(&app, key.as_str(), json!({ "command": "git pull", "run_id": run.run_id.0 })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["run_status"], "in_progress");

        let (status, body) =
            post_validate(&app, key.as_str(), json!({ "command": "npm run build", "run_id": run.run_id.0 })).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["expected_command"], "npm install");

        let persisted = state.runs.snapshot(run.run_id).unwrap();
        assert_eq!(persisted.current_step, 1);
    }

    /// A worker assigned to tunnel `A` submitting the `run_id` of a run
    /// started on a different pipeline tunnel `B` must be validated against
    /// `B`'s own step list (the run's late-bound `pipeline` field), not `A`'s.
    #[tokio::test]
    async fn pipeline_step_validates_against_the_runs_own_tunnel_not_the_callers() {
        let state = fresh_state();
        state.tunnels.create(pipeline_tunnel("A", &["step-a"])).unwrap();
        state.tunnels.create(pipeline_tunnel("B", &["step-b"])).unwrap();
        let (key, _) = state
            .credentials
            .create_worker("agent-1".into(), gateway_core::TunnelName::new("A"), 1000, "orch-1".into())
            .unwrap();
        let run_b = state.runs.start("B".into(), "agent-1".into()).unwrap();

        let app = build_router(state.clone());

        // `A`'s own step ("step-a") must be rejected against `B`'s run.
        let (status, body) =
            post_validate(&app, key.as_str(), json!({ "command": "step-a", "run_id": run_b.run_id.0 })).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["expected_command"], "step-b");

        // `B`'s actual step succeeds even though the caller is assigned to `A`.
        let (status, body) =
            post_validate(&app, key.as_str(), json!({ "command": "step-b", "run_id": run_b.run_id.0 })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["run_status"], "completed");

        let persisted = state.runs.snapshot(run_b.run_id).unwrap();
        assert_eq!(persisted.steps_completed.len(), 1);
        assert_eq!(persisted.steps_completed[0].command, "step-b");
    }
}
