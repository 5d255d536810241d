//! Value types returned by a run.
//!
//! [`ExecutionResult`] is the sole artefact of running any stage. It is built
//! only after every stream it reports has reached end-of-file, so trimming
//! always sees the complete text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ResolvedInvocation, RunId};

/// Exit code reported for an invocation that was never launched.
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = 255;

/// Strips the trailing whitespace run of a fully captured stream.
///
/// Leading whitespace and whitespace inside the text are kept.
pub fn trim_output(text: &str) -> &str {
    text.trim_end()
}

// ---------------------------------------------------------------------------
// Execution result
// ---------------------------------------------------------------------------

/// Terminal outcome of running a command or pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit status. Zero means success.
    pub exit_code: i32,

    /// Captured standard output, trailing whitespace removed.
    pub stdout: String,

    /// Captured standard error, trailing whitespace removed.
    pub stderr: String,
}

impl ExecutionResult {
    /// Creates a result, trimming the trailing whitespace of both streams.
    pub fn new(exit_code: i32, stdout: impl AsRef<str>, stderr: impl AsRef<str>) -> Self {
        Self {
            exit_code,
            stdout: trim_output(stdout.as_ref()).to_owned(),
            stderr: trim_output(stderr.as_ref()).to_owned(),
        }
    }

    /// Creates a result from raw captured bytes, decoding lossily as UTF-8.
    pub fn from_bytes(exit_code: i32, stdout: &[u8], stderr: &[u8]) -> Self {
        Self::new(
            exit_code,
            String::from_utf8_lossy(stdout),
            String::from_utf8_lossy(stderr),
        )
    }

    /// A zero-exit result with the given output and no error text.
    pub fn success(stdout: impl AsRef<str>) -> Self {
        Self::new(0, stdout, "")
    }

    /// The synthetic result for an invocation that must not be launched.
    ///
    /// Returns `None` for a runnable invocation.
    pub fn launch_failure(invocation: &ResolvedInvocation) -> Option<Self> {
        invocation
            .failure_message()
            .map(|message| Self::new(LAUNCH_FAILURE_EXIT_CODE, "", message))
    }

    /// Returns `true` if the exit code is zero.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "exit {}", self.exit_code)?;
        if !self.stderr.is_empty() {
            write!(f, ": {}", self.stderr)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------

/// One completed run with its identity and timing, as reported by the CLI in
/// JSON mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub result: ExecutionResult,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::{ProgramName, Validity};

    fn invocation(path: &str, validity: Validity) -> ResolvedInvocation {
        ResolvedInvocation {
            path: PathBuf::from(path),
            program: ProgramName::new(path).unwrap(),
            args: Vec::new(),
            validity,
        }
    }

    #[test]
    fn new_trims_only_the_trailing_edge() {
        let result = ExecutionResult::new(0, "  a\n\nb \n\n", "oops\n");
        assert_eq!(result.stdout, "  a\n\nb");
        assert_eq!(result.stderr, "oops");
    }

    #[test]
    fn from_bytes_decodes_lossily() {
        let result = ExecutionResult::from_bytes(1, b"ok\xff\n", b"");
        assert_eq!(result.stdout, "ok\u{fffd}");
        assert!(!result.is_success());
    }

    #[test]
    fn launch_failure_uses_exit_255_and_message() {
        let result = ExecutionResult::launch_failure(&invocation("/", Validity::IsDirectory))
            .unwrap();
        assert_eq!(result.exit_code, LAUNCH_FAILURE_EXIT_CODE);
        assert_eq!(result.stdout, "");
        assert_eq!(result.stderr, "/: launch path is a directory");
    }

    #[test]
    fn launch_failure_is_none_for_runnable() {
        assert!(ExecutionResult::launch_failure(&invocation("/bin/true", Validity::Runnable))
            .is_none());
    }

    #[test]
    fn result_serialises_with_snake_case_fields() {
        let json = serde_json::to_value(ExecutionResult::success("hi\n")).unwrap();
        assert_eq!(json["exit_code"], 0);
        assert_eq!(json["stdout"], "hi");
        assert_eq!(json["stderr"], "");
    }
}
