// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! Credential: the authentication principal attached to an `x-api-key`.

use crate::id::TunnelName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credential tier. Orchestrators administer; workers are policy-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Orchestrator,
    Worker,
}

impl Tier {
    pub fn is_orchestrator(self) -> bool {
        matches!(self, Tier::Orchestrator)
    }
}

/// A caller credential, as persisted in the credential file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub name: String,
    pub tier: Tier,
    /// Required iff `tier == Worker`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel: Option<TunnelName>,
    #[serde(rename = "dailyLimit")]
    pub daily_limit: u64,
    pub active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "createdBy")]
    pub created_by: String,
}

impl Credential {
    /// Redact a key to its first 8 characters followed by an ellipsis, the
    /// form used anywhere a credential listing surfaces keys.
    pub fn redact_key(key: &str) -> String {
        let prefix: String = key.chars().take(8).collect();
        format!("{prefix}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_key_keeps_first_eight_chars() {
        assert_eq!(Credential::redact_key("abcdefgh12345"), "abcdefgh...");
    }

    #[test]
    fn redact_key_handles_short_keys() {
        assert_eq!(Credential::redact_key("ab"), "ab...");
    }
}
