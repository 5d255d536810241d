//! Chore pipeline engine.
//!
//! Runs external programs, alone or chained stdout-to-stdin with literal and
//! computed text, and returns one [`ExecutionResult`] per run.
//!
//! ```no_run
//! use engine::{pipe, run, Stage};
//!
//! let listing = Stage::argv(["ls", "README.md"]).unwrap();
//! let rename = Stage::argv(["sed", "s/READ/EAT/"]).unwrap();
//! let result = run(pipe(listing, rename)).unwrap();
//! assert_eq!(result.stdout, "EATME.md");
//! ```
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All filesystem checks, process spawning and pipe
//! plumbing live here. The [`command`] crate defines the values crossing this
//! boundary.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`resolver`] | Command resolution against an injected search path |
//! | [`launcher`] | Child process launch and `ProcessHandle` |
//! | [`source`] | Literal/deferred text sources and transforms |
//! | [`stage`] | `Stage` and flattening composition |
//! | [`stream`] | Feeds, relays and drains between stages |
//! | [`engine`] | `Engine`: run and aggregate by the first-non-zero rule |

pub mod engine;
pub mod launcher;
pub mod resolver;
pub mod source;
pub mod stage;
pub mod stream;

pub use command::{ChoreError, CommandSpec, ExecutionResult, ResolvedInvocation, SearchPath, Validity};
pub use engine::{first_failure, Engine, EngineConfig, Outcome};
pub use launcher::{Launch, Launcher, ProcessHandle};
pub use resolver::Resolver;
pub use source::{Source, Transform};
pub use stage::{compose, Member, Pipeline, Stage};

/// Runs `stage` with an engine built from the inherited environment, blocking
/// until every member has finished.
///
/// Must not be called from within an async context; use [`Engine::run`] there.
pub fn run(stage: impl Into<Stage>) -> Result<ExecutionResult, ChoreError> {
    Engine::from_env().run_blocking(stage)
}

/// Connects `left`'s output to `right`'s input.
pub fn pipe(left: impl Into<Stage>, right: impl Into<Stage>) -> Stage {
    left.into().pipe(right)
}
