// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! Tunnel: a named policy bundle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whitelist enforcement mode for body-bearing requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandWhitelistMode {
    Strict,
    Lax,
}

/// One step of a pipeline-mode tunnel's command sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStepDef {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A pipeline-mode tunnel's ordered step sequence.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineDef {
    pub steps: Vec<PipelineStepDef>,
}

/// A tunnel policy bundle.
///
/// A tunnel is either *policy* (no pipeline) or *pipeline* (non-empty
/// `pipeline.steps`); see [`Tunnel::is_pipeline`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tunnel {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_methods")]
    pub allowed_methods: Vec<String>,
    #[serde(default)]
    pub allowed_paths: Vec<String>,
    #[serde(default)]
    pub allowed_commands: Vec<String>,
    #[serde(default)]
    pub forbidden_keywords: Vec<String>,
    #[serde(default = "default_whitelist_mode")]
    pub command_whitelist_mode: CommandWhitelistMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<PipelineDef>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_methods() -> Vec<String> {
    vec!["GET".to_string(), "POST".to_string()]
}

fn default_whitelist_mode() -> CommandWhitelistMode {
    CommandWhitelistMode::Strict
}

impl Tunnel {
    /// The hardcoded read-only tunnel assumed for workers with no assigned
    /// tunnel. Not persisted; synthesized by the policy layer.
    pub const PUBLIC_VIEWER: &'static str = "PublicViewer";

    pub fn is_pipeline(&self) -> bool {
        self.pipeline
            .as_ref()
            .is_some_and(|p| !p.steps.is_empty())
    }

    pub fn allows_method(&self, method: &str) -> bool {
        self.allowed_methods.iter().any(|m| m == "*") || self.allowed_methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }

    pub fn allows_path(&self, path: &str) -> bool {
        self.allowed_paths.is_empty() || self.allowed_paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// The tunnel synthesized for a worker with no assigned tunnel: read-only,
    /// never persisted in the registry.
    pub fn public_viewer_default() -> Tunnel {
        Tunnel {
            name: Self::PUBLIC_VIEWER.to_string(),
            description: "built-in read-only fallback for credentials with no assigned tunnel".to_string(),
            allowed_methods: vec!["GET".to_string()],
            allowed_paths: vec![],
            allowed_commands: vec![],
            forbidden_keywords: vec![],
            command_whitelist_mode: CommandWhitelistMode::Strict,
            pipeline: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}
