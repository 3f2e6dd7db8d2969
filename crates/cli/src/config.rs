// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! Startup configuration: fixed defaults under an XDG-style state
//! directory, overridable by environment variables and CLI flags,
//! resolved once into a `Config` passed down by reference.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a state directory: set GATEWAY_STATE_DIR or HOME")]
    NoStateDir,
}

/// Resolved gateway startup configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. `~/.local/state/policy-gateway`).
    pub state_dir: PathBuf,
    /// Listen address for the HTTP surface.
    pub bind: String,
    /// Credential file path.
    pub credentials_path: PathBuf,
    /// Tunnel file path.
    pub tunnels_path: PathBuf,
    /// Pipeline run state file path.
    pub runs_path: PathBuf,
    /// Usage counter file path.
    pub usage_path: PathBuf,
}

impl Config {
    /// Resolve configuration: fixed paths under the state directory, with
    /// CLI flags overriding individual pieces.
    pub fn load(bind: Option<String>, state_dir_override: Option<PathBuf>) -> Result<Self, ConfigError> {
        let state_dir = match state_dir_override {
            Some(dir) => dir,
            None => state_dir()?,
        };

        Ok(Self {
            credentials_path: state_dir.join("credentials.json"),
            tunnels_path: state_dir.join("tunnels.json"),
            runs_path: state_dir.join("pipeline_runs.json"),
            usage_path: state_dir.join("usage.json"),
            bind: bind.unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            state_dir,
        })
    }
}

/// Resolve the state directory: `GATEWAY_STATE_DIR` > `XDG_STATE_HOME`/policy-gateway
/// > `~/.local/state/policy-gateway`.
fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("GATEWAY_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = dirs::state_dir() {
        return Ok(xdg.join("policy-gateway"));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoStateDir)?;
    Ok(home.join(".local/state/policy-gateway"))
}
