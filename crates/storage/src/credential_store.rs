// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! Credential Store: opaque key -> `Credential`, read-mostly,
//! rewritten atomically on every mutation.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use gateway_core::{Credential, CredentialKey, Tier, TunnelName};
use parking_lot::RwLock;
use tracing::info;

use crate::atomic;
use crate::error::StoreError;
use crate::key_gen::generate_credential_key;

pub struct CredentialStore {
    path: PathBuf,
    inner: RwLock<HashMap<CredentialKey, Credential>>,
}

impl CredentialStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let map: HashMap<CredentialKey, Credential> = atomic::read_json(&path)?.unwrap_or_default();
        info!(count = map.len(), path = %path.display(), "loaded credential store");
        Ok(Self { path, inner: RwLock::new(map) })
    }

    pub fn get(&self, key: &str) -> Option<Credential> {
        self.inner.read().get(key).cloned()
    }

    pub fn list(&self) -> Vec<(CredentialKey, Credential)> {
        self.inner
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Create a worker credential. Tunnel existence is the caller's
    /// responsibility to check first; this store just persists whatever
    /// it's handed.
    pub fn create_worker(
        &self,
        name: String,
        tunnel: TunnelName,
        daily_limit: u64,
        created_by: String,
    ) -> Result<(CredentialKey, Credential), StoreError> {
        let credential = Credential {
            name,
            tier: Tier::Worker,
            tunnel: Some(tunnel),
            daily_limit,
            active: true,
            created_at: Utc::now(),
            created_by,
        };
        self.insert_and_persist(credential)
    }

    fn insert_and_persist(&self, credential: Credential) -> Result<(CredentialKey, Credential), StoreError> {
        let key = CredentialKey::new(generate_credential_key());
        let mut guard = self.inner.write();
        guard.insert(key.clone(), credential.clone());
        atomic::write_json(&self.path, &*guard)?;
        Ok((key, credential))
    }

    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write();
        if guard.remove(key).is_none() {
            return Err(StoreError::CredentialNotFound(key.to_string()));
        }
        atomic::write_json(&self.path, &*guard)?;
        Ok(())
    }

    /// Swap in a freshly-parsed snapshot (watcher reload). In-flight reads
    /// holding a clone of the old map are unaffected.
    pub fn replace_snapshot(&self, map: HashMap<CredentialKey, Credential>) {
        *self.inner.write() = map;
    }

    /// Re-read the backing file and swap it in wholesale. Leaves the
    /// current snapshot untouched on parse failure.
    pub fn reload_from_disk(&self) -> Result<(), StoreError> {
        let map: HashMap<CredentialKey, Credential> = atomic::read_json(&self.path)?.unwrap_or_default();
        self.replace_snapshot(map);
        Ok(())
    }
}
