// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Domain model and pure decision logic for the policy gateway: credentials,
//! tunnels, pipeline runs, and the auth/policy evaluators that decide what a
//! presented request is allowed to do. No I/O lives here; persistence is
//! `gateway-storage`'s job and HTTP is `gateway-server`'s.

pub mod auth;
pub mod credential;
pub mod error;
pub mod id;
pub mod pipeline_run;
pub mod policy;
pub mod tunnel;

pub use auth::{authenticate, AuthOutcome, KeyLookup, RateLimitHeaders, UsageSnapshot};
pub use credential::{Credential, Tier};
pub use error::{Denial, DenialKind};
pub use id::{CredentialKey, RunId, RunIdGen, TunnelName};
pub use pipeline_run::{PipelineRun, PipelineStatus, StepDenial, StepRecord, StepValidation};
pub use policy::{evaluate, Decision};
pub use tunnel::{CommandWhitelistMode, PipelineDef, PipelineStepDef, Tunnel};
