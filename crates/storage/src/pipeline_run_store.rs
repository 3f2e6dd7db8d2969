// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! Pipeline Run Store: partitioned by `run_id`.
//!
//! A coarse `RwLock` guards the map itself (create/lookup); each run's
//! mutable state lives behind its own `Mutex`, reachable via a cloned `Arc`.
//! The caller is expected to hold that per-run lock across a
//! `validate_step` + `confirm_step` pair, so the two are linearized per
//! run without serializing unrelated runs against each other.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use gateway_core::{PipelineRun, RunId, RunIdGen};
use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::atomic;
use crate::error::StoreError;

pub type RunHandle = Arc<Mutex<PipelineRun>>;

pub struct PipelineRunStore {
    path: PathBuf,
    runs: RwLock<HashMap<RunId, RunHandle>>,
    id_gen: RunIdGen,
}

impl PipelineRunStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let loaded: HashMap<RunId, PipelineRun> = atomic::read_json(&path)?.unwrap_or_default();
        let max_seen = loaded.keys().map(|id| id.0).max().unwrap_or(0);
        info!(count = loaded.len(), path = %path.display(), "loaded pipeline run store");
        let runs = loaded
            .into_iter()
            .map(|(id, run)| (id, Arc::new(Mutex::new(run))))
            .collect();
        Ok(Self { path, runs: RwLock::new(runs), id_gen: RunIdGen::starting_after(max_seen) })
    }

    pub fn start(&self, pipeline: String, agent: String) -> Result<PipelineRun, StoreError> {
        let run_id = self.id_gen.next();
        let run = PipelineRun::new(run_id, pipeline, agent, Utc::now());
        self.runs.write().insert(run_id, Arc::new(Mutex::new(run.clone())));
        self.persist()?;
        Ok(run)
    }

    /// Hand back the per-run lock. The caller should hold the guard across
    /// validate+confirm, then call [`Self::persist`] once it releases.
    pub fn run_handle(&self, run_id: RunId) -> Option<RunHandle> {
        self.runs.read().get(&run_id).cloned()
    }

    pub fn snapshot(&self, run_id: RunId) -> Option<PipelineRun> {
        self.run_handle(run_id).map(|h| h.lock().clone())
    }

    pub fn list(&self) -> Vec<PipelineRun> {
        self.runs.read().values().map(|h| h.lock().clone()).collect()
    }

    pub fn abort(&self, run_id: RunId) -> Result<PipelineRun, StoreError> {
        let handle = self.run_handle(run_id).ok_or(StoreError::RunNotFound(run_id.0))?;
        {
            let mut run = handle.lock();
            run.abort(Utc::now());
        }
        self.persist()?;
        Ok(handle.lock().clone())
    }

    /// Rewrite the whole file from the current in-memory state. Called
    /// after every state transition so the file on disk never lags.
    pub fn persist(&self) -> Result<(), StoreError> {
        let snapshot: HashMap<RunId, PipelineRun> = self
            .runs
            .read()
            .iter()
            .map(|(id, handle)| (*id, handle.lock().clone()))
            .collect();
        atomic::write_json(&self.path, &snapshot)?;
        Ok(())
    }
}
