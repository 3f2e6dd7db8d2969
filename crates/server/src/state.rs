// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! Shared application state handed to every handler: one set of
//! process-scoped store handles, cloned cheaply per request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gateway_storage::{CredentialStore, PipelineRunStore, TunnelRegistry, UsageCounters};

#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<CredentialStore>,
    pub tunnels: Arc<TunnelRegistry>,
    pub runs: Arc<PipelineRunStore>,
    pub usage: Arc<UsageCounters>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        credentials: Arc<CredentialStore>,
        tunnels: Arc<TunnelRegistry>,
        runs: Arc<PipelineRunStore>,
        usage: Arc<UsageCounters>,
    ) -> Self {
        Self { credentials, tunnels, runs, usage, started_at: Utc::now() }
    }
}
