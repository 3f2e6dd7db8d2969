// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! Pipeline run state machine.
//!
//! `validate_step` is read-only; it never mutates the run. `confirm_step` is
//! the sole commit point. Callers in `gateway-server` must call
//! `validate_step` from the policy evaluator, and only call `confirm_step`
//! once the surrounding HTTP response is about to be produced.

use crate::id::RunId;
use crate::tunnel::PipelineDef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    InProgress,
    Completed,
    Aborted,
    Failed,
}

impl PipelineStatus {
    fn terminal_message(self) -> Option<&'static str> {
        match self {
            PipelineStatus::Aborted => Some("pipeline run was aborted"),
            PipelineStatus::Failed => Some("pipeline run failed"),
            _ => None,
        }
    }
}

/// One confirmed step (append-only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based step number.
    pub step_number: usize,
    pub command: String,
    pub confirmed_at: DateTime<Utc>,
}

/// A live pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: RunId,
    /// Tunnel name at start-time.
    pub pipeline: String,
    /// Informational.
    pub agent: String,
    pub started_at: DateTime<Utc>,
    pub current_step: usize,
    pub status: PipelineStatus,
    pub steps_completed: Vec<StepRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted_at: Option<DateTime<Utc>>,
}

/// Outcome of a read-only step validation (`ValidateStep`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepValidation {
    /// The presented command matches the expected step at `current_step`.
    Allowed { step_index: usize, command: String },
    Denied(StepDenial),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepDenial {
    NotFound,
    AlreadyCompleted,
    Terminal(&'static str),
    ConfigGone,
    /// All steps already completed; this denial also mutates status to
    /// `Completed` if it wasn't already, so repeated late submissions
    /// observe a consistent terminal state.
    AllStepsCompleted,
    WrongStep { expected: String, received: String },
}

impl PipelineRun {
    pub fn new(run_id: RunId, pipeline: String, agent: String, now: DateTime<Utc>) -> Self {
        Self {
            run_id,
            pipeline,
            agent,
            started_at: now,
            current_step: 0,
            status: PipelineStatus::InProgress,
            steps_completed: Vec::new(),
            completed_at: None,
            aborted_at: None,
        }
    }

    /// Validate a submitted step. Never mutates `self`, with one narrow exception:
    /// when the run has already advanced past the last step but wasn't yet
    /// marked `Completed`, this coerces that terminal bookkeeping so repeated
    /// late submissions observe a consistent status. That's the only "commit"
    /// this method performs; advancing `current_step` is `confirm_step`'s job
    /// alone.
    pub fn validate_step(&mut self, def: Option<&PipelineDef>, command: &str) -> StepValidation {
        if self.status == PipelineStatus::Completed {
            return StepValidation::Denied(StepDenial::AlreadyCompleted);
        }
        if let Some(msg) = self.status.terminal_message() {
            return StepValidation::Denied(StepDenial::Terminal(msg));
        }
        let Some(def) = def else {
            return StepValidation::Denied(StepDenial::ConfigGone);
        };
        if self.current_step >= def.steps.len() {
            self.status = PipelineStatus::Completed;
            return StepValidation::Denied(StepDenial::AllStepsCompleted);
        }
        let expected = &def.steps[self.current_step].command;
        if command.trim() != expected.trim() {
            return StepValidation::Denied(StepDenial::WrongStep {
                expected: expected.trim().to_string(),
                received: command.trim().to_string(),
            });
        }
        StepValidation::Allowed {
            step_index: self.current_step,
            command: expected.trim().to_string(),
        }
    }

    /// Confirm a validated step. The sole commit point: advances `current_step`,
    /// appends to `steps_completed`, and transitions to `Completed` once the
    /// last step is confirmed.
    pub fn confirm_step(&mut self, step_index: usize, command: String, now: DateTime<Utc>, total_steps: usize) {
        debug_assert_eq!(step_index, self.current_step);
        self.steps_completed.push(StepRecord {
            step_number: step_index + 1,
            command,
            confirmed_at: now,
        });
        self.current_step += 1;
        if self.current_step == total_steps {
            self.status = PipelineStatus::Completed;
            self.completed_at = Some(now);
        }
    }

    pub fn abort(&mut self, now: DateTime<Utc>) {
        self.status = PipelineStatus::Aborted;
        self.aborted_at = Some(now);
    }

    pub fn next_command<'a>(&self, def: &'a PipelineDef) -> Option<&'a str> {
        def.steps.get(self.current_step).map(|s| s.command.as_str())
    }
}
