// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! Per-key daily usage counters.
//!
//! Process-local and batched: persisted every [`PERSIST_EVERY`] increments
//! per key and once more on shutdown. An unclean exit can lose up to that
//! many increments; that's the accepted tradeoff for not fsyncing on
//! every single request.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::atomic;
use crate::error::StoreError;

const PERSIST_EVERY: u64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedCounter {
    day: NaiveDate,
    count: u64,
}

struct CounterState {
    day: NaiveDate,
    count: u64,
    since_persist: u64,
}

pub struct UsageCounters {
    path: PathBuf,
    inner: RwLock<HashMap<String, CounterState>>,
}

impl UsageCounters {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let persisted: HashMap<String, PersistedCounter> = atomic::read_json(&path)?.unwrap_or_default();
        let inner = persisted
            .into_iter()
            .map(|(key, p)| (key, CounterState { day: p.day, count: p.count, since_persist: 0 }))
            .collect();
        Ok(Self { path, inner: RwLock::new(inner) })
    }

    /// Today's count for `key` without mutating anything (used to decide
    /// allow/deny before the request is known to succeed).
    pub fn peek(&self, key: &str, now: DateTime<Utc>) -> u64 {
        let today = now.date_naive();
        match self.inner.read().get(key) {
            Some(state) if state.day == today => state.count,
            _ => 0,
        }
    }

    /// Record one consumed request, rolling the counter over to a fresh day
    /// first if needed. Returns the count *after* this increment.
    pub fn record(&self, key: &str, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let today = now.date_naive();
        let (new_count, should_persist) = {
            let mut guard = self.inner.write();
            let state = guard.entry(key.to_string()).or_insert_with(|| CounterState {
                day: today,
                count: 0,
                since_persist: 0,
            });
            if state.day != today {
                state.day = today;
                state.count = 0;
                state.since_persist = 0;
            }
            state.count += 1;
            state.since_persist += 1;
            let should_persist = state.since_persist >= PERSIST_EVERY;
            if should_persist {
                state.since_persist = 0;
            }
            (state.count, should_persist)
        };
        if should_persist {
            self.persist()?;
        }
        Ok(new_count)
    }

    /// Flush every counter to disk, regardless of its `since_persist` tally.
    /// Called on graceful shutdown.
    pub fn persist(&self) -> Result<(), StoreError> {
        let snapshot: HashMap<String, PersistedCounter> = self
            .inner
            .read()
            .iter()
            .map(|(key, state)| (key.clone(), PersistedCounter { day: state.day, count: state.count }))
            .collect();
        atomic::write_json(&self.path, &snapshot)?;
        Ok(())
    }
}
