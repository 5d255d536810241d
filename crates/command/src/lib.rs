//! Command domain for Chore.
//!
//! This crate holds every value that crosses the engine boundary: what the
//! caller asks to run ([`CommandSpec`]), what the resolver decided about it
//! ([`ResolvedInvocation`]), and what a run produced ([`ExecutionResult`]).
//!
//! ## Architectural Layer
//!
//! **Domain.** This crate performs no process or pipe I/O. The `engine` crate
//! resolves, launches and wires; it only speaks in the types defined here.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`ProgramName`, `RunId`) |
//! | [`invocation`] | `CommandSpec`, `SearchPath`, `Validity`, `ResolvedInvocation` |
//! | [`types`] | `ExecutionResult`, `Timestamp`, `RunRecord` |
//! | [`errors`] | Fatal error type `ChoreError` |

pub mod errors;
pub mod identifiers;
pub mod invocation;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::ChoreError;
pub use identifiers::{ProgramName, RunId};
pub use invocation::{CommandSpec, ResolvedInvocation, SearchPath, Validity, SEARCH_PATH_VAR};
pub use types::{trim_output, ExecutionResult, RunRecord, Timestamp, LAUNCH_FAILURE_EXIT_CODE};
