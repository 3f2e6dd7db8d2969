// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! Opaque credential key generation: a prefixed, time+random token.

use chrono::Utc;
use rand::RngCore;

/// Generate a new credential key of the form `gw_<hex timestamp>_<hex random>`.
///
/// The timestamp component makes keys sortable-ish and trivially unique
/// across restarts; the random component is the actual secret material.
pub fn generate_credential_key() -> String {
    let timestamp = Utc::now().timestamp_millis();
    let mut random_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut random_bytes);
    format!("gw_{:x}_{}", timestamp, hex::encode(random_bytes))
}
