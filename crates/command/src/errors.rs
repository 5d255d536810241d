//! Fatal error type for a run.
//!
//! [`ChoreError`] covers only conditions that abort the caller's run. A command
//! that cannot be found, is a directory, or is not executable is *not* an
//! error; it is reported as an [`crate::ExecutionResult`] with exit code 255.
//! Likewise a process that exits non-zero is a normal result.

use thiserror::Error;

use crate::ProgramName;

/// Errors that abort a run before an [`crate::ExecutionResult`] can be built.
#[derive(Debug, Error)]
pub enum ChoreError {
    /// The OS refused to start an invocation the resolver judged runnable
    /// (for example an executable file with an unrecognised format).
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        /// Program token of the stage that failed to start.
        program: ProgramName,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing a stage's pipe failed for a reason other than the
    /// reader going away.
    #[error("I/O error while {context}: {source}")]
    Io {
        /// What the engine was doing (e.g. `"reading stdout of 'cat'"`).
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A relay or drain task panicked or was cancelled.
    #[error("Pipeline task failed: {message}")]
    Task {
        /// Description of the task failure.
        message: String,
    },

    /// The blocking entry point could not build its runtime.
    #[error("Failed to start runtime: {source}")]
    Runtime {
        #[source]
        source: std::io::Error,
    },
}

impl ChoreError {
    /// Builds an [`ChoreError::Io`] with a context label.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
