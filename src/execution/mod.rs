//! # Execution
//!
//! Resumable, windowed hand-off of statements to an external executor.
//!
//! - **Cursor**: the one durable offset, advanced window by window
//! - **Executor**: the collaborator seam plus a driver that applies a failure policy

pub mod cursor;
pub mod executor;

pub use cursor::{
    CursorError, CursorRecord, CursorStatus, CursorStore, CursorWindow, ExecutionCursor,
    FileCursorStore, InMemoryCursorStore, ResumePolicy,
};
pub use executor::{
    EmitExecutor, ExecutionDriver, ExecutionSummary, ExecutorError, FailurePolicy,
    StatementExecutor,
};
