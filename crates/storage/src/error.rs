// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! Errors surfaced by the stores. Distinct from `gateway_core::DenialKind`:
//! these are storage-layer failures (I/O, corrupt files), not policy
//! outcomes.

pub use crate::atomic::AtomicFileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    File(#[from] AtomicFileError),
    #[error("tunnel '{0}' not found")]
    TunnelNotFound(String),
    #[error("credential '{0}' not found")]
    CredentialNotFound(String),
    #[error("pipeline run {0} not found")]
    RunNotFound(u64),
}
