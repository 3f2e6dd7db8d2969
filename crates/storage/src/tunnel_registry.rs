// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! Tunnel Registry: tunnel name -> `Tunnel`, read-mostly,
//! rewritten atomically on every mutation.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use gateway_core::{CommandWhitelistMode, PipelineDef, Tunnel, TunnelName};
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::info;

use crate::atomic;
use crate::error::StoreError;

/// Fields accepted by the create endpoint; everything but `name`
/// defaults per the table there.
#[derive(Debug, Deserialize)]
pub struct NewTunnel {
    pub name: String,
    #[serde(default = "default_methods")]
    pub allowed_methods: Vec<String>,
    #[serde(default)]
    pub allowed_paths: Vec<String>,
    #[serde(default)]
    pub allowed_commands: Vec<String>,
    #[serde(default)]
    pub forbidden_keywords: Vec<String>,
    #[serde(default = "default_mode")]
    pub command_whitelist_mode: CommandWhitelistMode,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pipeline: Option<PipelineDef>,
}

fn default_methods() -> Vec<String> {
    vec!["GET".into(), "POST".into()]
}

fn default_mode() -> CommandWhitelistMode {
    CommandWhitelistMode::Strict
}

/// Shallow-merge patch for the update endpoint; `None` fields are
/// left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct TunnelPatch {
    pub description: Option<String>,
    pub allowed_methods: Option<Vec<String>>,
    pub allowed_paths: Option<Vec<String>>,
    pub allowed_commands: Option<Vec<String>>,
    pub forbidden_keywords: Option<Vec<String>>,
    pub command_whitelist_mode: Option<CommandWhitelistMode>,
    pub pipeline: Option<PipelineDef>,
}

pub struct TunnelRegistry {
    path: PathBuf,
    inner: RwLock<HashMap<TunnelName, Tunnel>>,
}

impl TunnelRegistry {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let map: HashMap<TunnelName, Tunnel> = atomic::read_json(&path)?.unwrap_or_default();
        info!(count = map.len(), path = %path.display(), "loaded tunnel registry");
        Ok(Self { path, inner: RwLock::new(map) })
    }

    pub fn get(&self, name: &str) -> Option<Tunnel> {
        self.inner.read().get(name).cloned()
    }

    pub fn list(&self) -> Vec<Tunnel> {
        self.inner.read().values().cloned().collect()
    }

    pub fn create(&self, new: NewTunnel) -> Result<Tunnel, StoreError> {
        let tunnel = Tunnel {
            name: new.name.clone(),
            description: new.description,
            allowed_methods: new.allowed_methods,
            allowed_paths: new.allowed_paths,
            allowed_commands: new.allowed_commands,
            forbidden_keywords: new.forbidden_keywords,
            command_whitelist_mode: new.command_whitelist_mode,
            pipeline: new.pipeline,
            created_at: Utc::now(),
            updated_at: None,
        };
        let mut guard = self.inner.write();
        guard.insert(TunnelName::new(new.name), tunnel.clone());
        atomic::write_json(&self.path, &*guard)?;
        Ok(tunnel)
    }

    pub fn update(&self, name: &str, patch: TunnelPatch) -> Result<Tunnel, StoreError> {
        let mut guard = self.inner.write();
        let tunnel = guard
            .get_mut(name)
            .ok_or_else(|| StoreError::TunnelNotFound(name.to_string()))?;

        if let Some(v) = patch.description {
            tunnel.description = v;
        }
        if let Some(v) = patch.allowed_methods {
            tunnel.allowed_methods = v;
        }
        if let Some(v) = patch.allowed_paths {
            tunnel.allowed_paths = v;
        }
        if let Some(v) = patch.allowed_commands {
            tunnel.allowed_commands = v;
        }
        if let Some(v) = patch.forbidden_keywords {
            tunnel.forbidden_keywords = v;
        }
        if let Some(v) = patch.command_whitelist_mode {
            tunnel.command_whitelist_mode = v;
        }
        if let Some(v) = patch.pipeline {
            tunnel.pipeline = Some(v);
        }
        tunnel.updated_at = Some(Utc::now());
        let updated = tunnel.clone();

        atomic::write_json(&self.path, &*guard)?;
        Ok(updated)
    }

    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write();
        if guard.remove(name).is_none() {
            return Err(StoreError::TunnelNotFound(name.to_string()));
        }
        atomic::write_json(&self.path, &*guard)?;
        Ok(())
    }

    pub fn replace_snapshot(&self, map: HashMap<TunnelName, Tunnel>) {
        *self.inner.write() = map;
    }

    /// Re-read the backing file and swap it in wholesale. Leaves the
    /// current snapshot untouched on parse failure so the caller can log
    /// a warning and keep serving the old policy.
    pub fn reload_from_disk(&self) -> Result<(), StoreError> {
        let map: HashMap<TunnelName, Tunnel> = atomic::read_json(&self.path)?.unwrap_or_default();
        self.replace_snapshot(map);
        Ok(())
    }
}
