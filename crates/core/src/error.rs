// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! Shared denial/error vocabulary.
//!
//! `DenialKind` enumerates every policy/auth/pipeline rejection reason.
//! It is intentionally decoupled from HTTP: `gateway-server` maps each
//! variant to its status code and JSON body shape.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    AuthMissing,
    AuthInvalid,
    AuthRevoked,
    RateLimited,
    TunnelUnknown,
    MethodNotAllowed,
    PathNotAllowed,
    BadJson,
    CommandNotWhitelisted,
    ForbiddenKeyword,
    StrictModeEmpty,
    PipelineWrongStep,
    PipelineRunMissing,
    PipelineTerminal,
    PipelineConfigGone,
    NotFound,
    Internal,
}

/// A policy/pipeline denial: machine-readable `kind` plus a human-readable
/// `reason`, and (iff `kind == PipelineWrongStep`) the command that was
/// actually expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub kind: DenialKind,
    pub reason: String,
    pub expected_command: Option<String>,
}

impl Denial {
    pub fn new(kind: DenialKind, reason: impl Into<String>) -> Self {
        Self { kind, reason: reason.into(), expected_command: None }
    }

    pub fn with_expected(kind: DenialKind, reason: impl Into<String>, expected: impl Into<String>) -> Self {
        Self { kind, reason: reason.into(), expected_command: Some(expected.into()) }
    }
}
