//! # Statement Execution
//!
//! The core never talks to the remote store. It hands fully rendered
//! statements, one at a time, to a [`StatementExecutor`] and records what the
//! executor reported. An executor's `Ok` is not proof that a row changed; only
//! a reconciliation pass establishes that.

use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::cursor::{CursorStore, CursorWindow, ExecutionCursor};
use crate::error::BatchResult;
use crate::models::Statement;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Executor transport failure: {message}")]
    Transport { message: String },

    #[error("Executor sink I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecutorError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// Collaborator that applies one rendered statement, terminator included
pub trait StatementExecutor {
    fn execute(&mut self, statement_text: &str) -> Result<(), ExecutorError>;
}

/// Writes each statement as a line to a sink for an operator to apply
#[derive(Debug)]
pub struct EmitExecutor<W: Write> {
    sink: W,
}

impl<W: Write> EmitExecutor<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> StatementExecutor for EmitExecutor<W> {
    fn execute(&mut self, statement_text: &str) -> Result<(), ExecutorError> {
        writeln!(self.sink, "{statement_text}")?;
        self.sink.flush()?;
        Ok(())
    }
}

/// Behavior when the executor reports an error
///
/// Modeled on batch worker failure strategies: keep going and reconcile
/// later, or stop at the first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failed id and continue with the next statement
    #[default]
    ContinueOnFailure,

    /// Stop at the first failed statement
    HaltOnFailure,
}

/// Advisory outcome of a run; success is only known after reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub attempted: usize,
    pub errored_ids: Vec<String>,
    pub halted: bool,
}

impl ExecutionSummary {
    pub fn reported_ok(&self) -> usize {
        self.attempted - self.errored_ids.len()
    }
}

/// Feeds statements to an executor under a [`FailurePolicy`]
#[derive(Debug)]
pub struct ExecutionDriver<E: StatementExecutor> {
    executor: E,
    policy: FailurePolicy,
}

impl<E: StatementExecutor> ExecutionDriver<E> {
    pub fn new(executor: E, policy: FailurePolicy) -> Self {
        Self { executor, policy }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Submit statements in order
    pub fn run(&mut self, statements: &[Statement]) -> ExecutionSummary {
        let mut summary = ExecutionSummary::default();

        for statement in statements {
            summary.attempted += 1;

            match self.executor.execute(statement.rendered_text()) {
                Ok(()) => {
                    debug!(target_id = %statement.target_id(), "Statement handed to executor");
                }
                Err(e) => {
                    warn!(
                        target_id = %statement.target_id(),
                        error = %e,
                        policy = ?self.policy,
                        "Executor reported a failure"
                    );
                    summary.errored_ids.push(statement.target_id().to_string());

                    if self.policy == FailurePolicy::HaltOnFailure {
                        summary.halted = true;
                        break;
                    }
                }
            }
        }

        info!(
            attempted = summary.attempted,
            errored = summary.errored_ids.len(),
            halted = summary.halted,
            "🚚 EXECUTION: Statements submitted (unverified until reconciled)"
        );

        summary
    }

    /// Run the cursor's next window and commit it unless the run halted
    ///
    /// A halted window stays uncommitted so the same window is issued again.
    pub fn run_window<'a, S: CursorStore>(
        &mut self,
        cursor: &ExecutionCursor<S>,
        statements: &'a [Statement],
        window_size: usize,
    ) -> BatchResult<(CursorWindow<'a, Statement>, ExecutionSummary)> {
        let window = cursor.next_window(statements, window_size)?;
        if window.exhausted {
            return Ok((window, ExecutionSummary::default()));
        }

        let summary = self.run(window.items);
        if !summary.halted {
            cursor.commit(&window)?;
        }

        Ok((window, summary))
    }
}
