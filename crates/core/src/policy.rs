// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! The non-pipeline policy evaluator.
//!
//! A pure, deterministic function of `(tunnel, method, path, body)`. Body
//! parsing happens here (it's plain text-to-`Value` computation, not I/O),
//! but reading the request bytes off the wire and looking up the
//! tunnel/run store are the caller's job.

use crate::error::{Denial, DenialKind};
use crate::id::RunId;
use crate::tunnel::{CommandWhitelistMode, Tunnel};

/// Result of evaluating a single request against its tunnel's policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// The tunnel is pipeline-mode and the payload carried a `run_id`;
    /// the caller must hand off to the pipeline run store.
    PipelineDispatch { run_id: RunId, command: String },
    Deny(Denial),
}

/// Extract the canonical command string: `payload.command ?? payload.url ?? ""`.
fn canonical_command(payload: &serde_json::Value) -> String {
    payload
        .get("command")
        .and_then(|v| v.as_str())
        .or_else(|| payload.get("url").and_then(|v| v.as_str()))
        .unwrap_or("")
        .to_string()
}

/// Strict-whitelist prefix rule: a match is either an exact (trimmed)
/// equal, or the allowed prefix followed by a space.
fn whitelist_matches(command: &str, allowed: &[String]) -> bool {
    let command = command.trim();
    allowed.iter().any(|c| {
        let c = c.trim();
        command == c || command.starts_with(&format!("{c} "))
    })
}

fn forbidden_keyword_hit<'a>(command: &str, keywords: &'a [String]) -> Option<&'a str> {
    let lower = command.to_lowercase();
    keywords
        .iter()
        .find(|kw| lower.contains(&kw.to_lowercase()))
        .map(|kw| kw.as_str())
}

fn body_bearing(method: &str) -> bool {
    matches!(method.to_ascii_uppercase().as_str(), "POST" | "PUT")
}

/// Evaluate a worker request against its resolved tunnel. `tunnel = None`
/// means the tunnel name didn't resolve in the registry.
pub fn evaluate(tunnel: Option<&Tunnel>, method: &str, path: &str, raw_body: Option<&str>) -> Decision {
    let Some(tunnel) = tunnel else {
        return Decision::Deny(Denial::new(DenialKind::TunnelUnknown, "Invalid Tunnel Config"));
    };

    if !tunnel.allows_method(method) {
        return Decision::Deny(Denial::new(
            DenialKind::MethodNotAllowed,
            format!("Method {method} not allowed"),
        ));
    }

    let path_only = path.split('?').next().unwrap_or(path);
    if !tunnel.allows_path(path_only) {
        return Decision::Deny(Denial::new(
            DenialKind::PathNotAllowed,
            format!("Path {path_only} not allowed"),
        ));
    }

    if !body_bearing(method) {
        return Decision::Allow;
    }

    let payload: serde_json::Value = match raw_body.unwrap_or("") {
        "" => return Decision::Deny(Denial::new(DenialKind::BadJson, "Invalid JSON payload")),
        body => match serde_json::from_str(body) {
            Ok(v) => v,
            Err(_) => {
                return Decision::Deny(Denial::new(DenialKind::BadJson, "Invalid JSON payload"))
            }
        },
    };

    let command = canonical_command(&payload);

    if tunnel.is_pipeline() {
        if let Some(run_id) = payload.get("run_id").and_then(|v| v.as_u64()) {
            return Decision::PipelineDispatch { run_id: RunId(run_id), command };
        }
    }

    if tunnel.command_whitelist_mode == CommandWhitelistMode::Strict {
        if tunnel.allowed_commands.is_empty() {
            return Decision::Deny(Denial::new(
                DenialKind::StrictModeEmpty,
                "No commands allowed in strict mode",
            ));
        }
        if !whitelist_matches(&command, &tunnel.allowed_commands) {
            return Decision::Deny(Denial::new(
                DenialKind::CommandNotWhitelisted,
                format!("Command '{command}' not in whitelist"),
            ));
        }
    }

    if let Some(kw) = forbidden_keyword_hit(&command, &tunnel.forbidden_keywords) {
        return Decision::Deny(Denial::new(
            DenialKind::ForbiddenKeyword,
            format!("Forbidden keyword '{kw}' detected"),
        ));
    }

    Decision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tunnel::{PipelineDef, PipelineStepDef};
    use chrono::Utc;

    fn tunnel(allowed_commands: &[&str], mode: CommandWhitelistMode, forbidden: &[&str]) -> Tunnel {
        Tunnel {
            name: "DevOps".into(),
            description: String::new(),
            allowed_methods: vec!["POST".into()],
            allowed_paths: vec![],
            allowed_commands: allowed_commands.iter().map(|s| s.to_string()).collect(),
            forbidden_keywords: forbidden.iter().map(|s| s.to_string()).collect(),
            command_whitelist_mode: mode,
            pipeline: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[yare::parameterized(
        exact_match = { "ls", "ls" },
        with_args = { "ls -la", "ls" },
        pwd_exact = { "pwd", "pwd" },
    )]
    fn strict_whitelist_allows_prefix_matches(command: &str, allowed: &str) {
        let t = tunnel(&[allowed], CommandWhitelistMode::Strict, &[]);
        let body = format!(r#"{{"command":"{command}"}}"#);
        assert_eq!(evaluate(Some(&t), "POST", "/validate", Some(&body)), Decision::Allow);
    }

    #[test]
    fn sneaky_prefix_without_space_is_rejected() {
        // `ls-evil` must not sneak past an allow-`ls` whitelist.
        let t = tunnel(&["ls"], CommandWhitelistMode::Strict, &[]);
        let decision = evaluate(Some(&t), "POST", "/validate", Some(r#"{"command":"ls-evil"}"#));
        match decision {
            Decision::Deny(d) => assert_eq!(d.kind, DenialKind::CommandNotWhitelisted),
            other => panic!("expected deny, got {other:?}"),
        }
    }

    #[test]
    fn whitelist_miss_is_denied_with_command_in_reason() {
        let t = tunnel(&["ls", "pwd"], CommandWhitelistMode::Strict, &[]);
        let decision = evaluate(Some(&t), "POST", "/validate", Some(r#"{"command":"rm -rf /"}"#));
        match decision {
            Decision::Deny(d) => {
                assert_eq!(d.kind, DenialKind::CommandNotWhitelisted);
                assert!(d.reason.contains("rm -rf /"));
            }
            other => panic!("expected deny, got {other:?}"),
        }
    }

    #[test]
    fn strict_mode_with_empty_whitelist_denies_everything() {
        let t = tunnel(&[], CommandWhitelistMode::Strict, &[]);
        let decision = evaluate(Some(&t), "POST", "/validate", Some(r#"{"command":"ls"}"#));
        match decision {
            Decision::Deny(d) => assert_eq!(d.kind, DenialKind::StrictModeEmpty),
            other => panic!("expected deny, got {other:?}"),
        }
    }

    #[test]
    fn lax_mode_skips_whitelist_check() {
        let t = tunnel(&[], CommandWhitelistMode::Lax, &[]);
        let decision = evaluate(Some(&t), "POST", "/validate", Some(r#"{"command":"anything goes"}"#));
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn forbidden_keyword_is_case_insensitive() {
        let t = tunnel(&[], CommandWhitelistMode::Lax, &["sudo"]);
        let decision = evaluate(Some(&t), "POST", "/validate", Some(r#"{"command":"SUDO ls"}"#));
        match decision {
            Decision::Deny(d) => {
                assert_eq!(d.kind, DenialKind::ForbiddenKeyword);
                assert!(d.reason.contains("sudo"));
            }
            other => panic!("expected deny, got {other:?}"),
        }
    }

    #[test]
    fn unknown_tunnel_is_denied() {
        let decision = evaluate(None, "GET", "/", None);
        match decision {
            Decision::Deny(d) => assert_eq!(d.kind, DenialKind::TunnelUnknown),
            other => panic!("expected deny, got {other:?}"),
        }
    }

    #[test]
    fn method_not_allowed_is_denied() {
        let t = tunnel(&[], CommandWhitelistMode::Lax, &[]);
        let decision = evaluate(Some(&t), "DELETE", "/", None);
        match decision {
            Decision::Deny(d) => assert_eq!(d.kind, DenialKind::MethodNotAllowed),
            other => panic!("expected deny, got {other:?}"),
        }
    }

    #[test]
    fn path_not_allowed_is_denied() {
        let mut t = tunnel(&[], CommandWhitelistMode::Lax, &[]);
        t.allowed_methods = vec!["GET".into()];
        t.allowed_paths = vec!["/api/".into()];
        let decision = evaluate(Some(&t), "GET", "/other", None);
        match decision {
            Decision::Deny(d) => assert_eq!(d.kind, DenialKind::PathNotAllowed),
            other => panic!("expected deny, got {other:?}"),
        }
    }

    #[test]
    fn query_string_is_stripped_before_path_matching() {
        let mut t = tunnel(&[], CommandWhitelistMode::Lax, &[]);
        t.allowed_methods = vec!["GET".into()];
        t.allowed_paths = vec!["/api/widgets".into()];
        let decision = evaluate(Some(&t), "GET", "/api/widgets?id=1", None);
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn non_body_bearing_methods_skip_body_policy() {
        let t = tunnel(&["ls"], CommandWhitelistMode::Strict, &["sudo"]);
        let decision = evaluate(Some(&t), "GET", "/", None);
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn invalid_json_body_is_denied() {
        let t = tunnel(&[], CommandWhitelistMode::Lax, &[]);
        let decision = evaluate(Some(&t), "POST", "/", Some("not json"));
        match decision {
            Decision::Deny(d) => assert_eq!(d.kind, DenialKind::BadJson),
            other => panic!("expected deny, got {other:?}"),
        }
    }

    #[test]
    fn url_field_is_used_when_command_is_absent() {
        let t = tunnel(&["git_clone"], CommandWhitelistMode::Strict, &[]);
        let decision = evaluate(
            Some(&t),
            "POST",
            "/",
            Some(r#"{"url":"git_clone https://example.com/repo.git"}"#),
        );
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn pipeline_tunnel_with_run_id_dispatches_instead_of_whitelisting() {
        let mut t = tunnel(&["git pull"], CommandWhitelistMode::Strict, &[]);
        t.pipeline = Some(PipelineDef {
            steps: vec![PipelineStepDef { command: "git pull".into(), description: None }],
        });
        let decision = evaluate(
            Some(&t),
            "POST",
            "/",
            Some(r#"{"command":"npm install","run_id":7}"#),
        );
        assert_eq!(
            decision,
            Decision::PipelineDispatch { run_id: RunId(7), command: "npm install".into() }
        );
    }
}
