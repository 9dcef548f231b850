//! Sequential workflows
//!
//! A [`Workflow`] runs its steps strictly in order over a shared state and a
//! shared [`RowCounter`]. The first failing step ends the run; the
//! completion callback runs only when every step succeeded.
//!
//! ```text
//! Pending ──▶ Running(1) ──▶ Running(2) ──▶ … ──▶ Completed
//!                  │              │
//!                  └──────────────┴──────────────▶ Failed(n)
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::endpoint::{ErrorHandling, ExitPolicy};
use crate::error::{Error, Result};

/// Monotonic count of extracted rows, shared by a workflow's steps
#[derive(Debug, Clone, Default)]
pub struct RowCounter(Arc<AtomicU64>);

impl RowCounter {
    /// A counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one row, returning the new count
    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current count
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// One fallible unit of a workflow
#[async_trait]
pub trait Step<S: Send>: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Run against the workflow state
    async fn run(&self, state: &mut S, rows: &RowCounter) -> Result<()>;
}

/// Where a workflow is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStatus {
    /// Not started
    Pending,
    /// Running the 1-based step
    Running(usize),
    /// Every step succeeded
    Completed,
    /// The 1-based step failed
    Failed(usize),
}

/// An ordered sequence of steps
pub struct Workflow<S> {
    steps: Vec<Box<dyn Step<S>>>,
    error_handling: ErrorHandling,
    status: WorkflowStatus,
    rows: RowCounter,
}

impl<S: Send> Default for Workflow<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Send> Workflow<S> {
    /// An empty workflow with a fresh row counter
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            error_handling: ErrorHandling::default(),
            status: WorkflowStatus::Pending,
            rows: RowCounter::new(),
        }
    }

    /// Append a step
    pub fn step(mut self, step: impl Step<S> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Policies for endpoint errors raised by steps
    pub fn with_error_handling(mut self, error_handling: ErrorHandling) -> Self {
        self.error_handling = error_handling;
        self
    }

    /// Current status
    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    /// The shared row counter
    pub fn rows(&self) -> &RowCounter {
        &self.rows
    }

    /// Run every step in order
    ///
    /// Returns the final row count; `on_complete` receives it only on success.
    /// A failing step is retried only when it raised an endpoint error whose
    /// class maps to a retry policy.
    pub async fn run(&mut self, state: &mut S, on_complete: impl FnOnce(u64)) -> Result<u64> {
        for (i, step) in self.steps.iter().enumerate() {
            let position = i + 1;
            self.status = WorkflowStatus::Running(position);
            tracing::debug!(step = position, name = step.name(), "Running step");

            let mut attempt = 1;
            loop {
                let err = match step.run(state, &self.rows).await {
                    Ok(()) => break,
                    Err(err) => err,
                };

                let policy = match &err {
                    Error::Endpoint(endpoint) => self.error_handling.policy_for(endpoint.class()),
                    _ => ExitPolicy::Fail,
                };
                match policy {
                    ExitPolicy::Retry { max_attempts } if attempt < max_attempts => {
                        tracing::warn!(
                            step = position,
                            name = step.name(),
                            attempt,
                            max_attempts,
                            error = %err,
                            "Step failed, retrying"
                        );
                        attempt += 1;
                    }
                    _ => {
                        self.status = WorkflowStatus::Failed(position);
                        return Err(Error::WorkflowStep {
                            step: position,
                            name: step.name().to_string(),
                            source: Box::new(err),
                        });
                    }
                }
            }
        }

        self.status = WorkflowStatus::Completed;
        let rows = self.rows.get();
        on_complete(rows);
        Ok(rows)
    }
}
