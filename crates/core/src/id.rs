// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! Identifier types.
//!
//! Tunnel names and credential keys are caller-supplied or externally
//! persisted strings, so they get the same thin `String` newtype treatment
//! used throughout this crate. Pipeline run ids are different: they're
//! server-generated and monotonically increasing for the process, so
//! `RunId` wraps a `u64` and is minted from a process-local counter rather
//! than randomness.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Define a newtype identifier wrapping a `String`.
macro_rules! define_string_id {
    ($(#[$meta:meta])* pub struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id! {
    /// Unique tunnel name.
    pub struct TunnelName;
}

define_string_id! {
    /// Opaque credential key string.
    pub struct CredentialKey;
}

/// Unique, server-generated, monotonically increasing pipeline run identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-local generator for [`RunId`]s.
///
/// Starts at 1 so `0` can be used as a sentinel in tests/logs without
/// colliding with a real run.
#[derive(Debug, Default)]
pub struct RunIdGen(AtomicU64);

impl RunIdGen {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    /// Restore the generator after loading persisted runs at startup, so
    /// newly minted ids never collide with ones already on disk.
    pub fn starting_after(max_seen: u64) -> Self {
        Self(AtomicU64::new(max_seen + 1))
    }

    pub fn next(&self) -> RunId {
        RunId(self.0.fetch_add(1, Ordering::SeqCst))
    }
}
