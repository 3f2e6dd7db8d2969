// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Persistence for the policy gateway: atomic JSON stores for credentials,
//! tunnels, and pipeline runs, plus batched daily usage counters.
//!
//! Every store is read-mostly and rewritten atomically on mutation; none
//! of them compress their files, unlike background checkpoints elsewhere
//! in this codebase's lineage. These stay human-editable on disk.

mod atomic;
pub mod credential_store;
pub mod error;
pub mod key_gen;
pub mod pipeline_run_store;
pub mod tunnel_registry;
pub mod usage;

pub use atomic::AtomicFileError;
pub use credential_store::CredentialStore;
pub use error::StoreError;
pub use key_gen::generate_credential_key;
pub use pipeline_run_store::{PipelineRunStore, RunHandle};
pub use tunnel_registry::{NewTunnel, TunnelPatch, TunnelRegistry};
pub use usage::UsageCounters;
