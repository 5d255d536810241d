//! Running stages to a single result.
//!
//! [`Engine::run`] launches or evaluates every member of a stage, wiring each
//! member's output into the next member's input, then waits for all of them
//! and reduces their outcomes by the first-non-zero rule:
//!
//! - `exit_code` is that of the first member (in pipeline order) that exited
//!   non-zero, or zero if none did.
//! - `stderr` is that same member's captured stderr, or empty.
//! - `stdout` is the last member's captured output.
//!
//! A run of a single stage reports that stage's own stderr even when it exits
//! zero.
//!
//! All members run concurrently. Every stdout/stderr pipe is drained by its
//! own task, so a member that writes more than a pipe buffer never stalls the
//! others. The only suspension point exposed to the caller is the final
//! collection, which completes once every member has exited and every stream
//! has reached end-of-file.

use tokio::process::ChildStderr;
use tokio::task::JoinHandle;
use tracing::{debug, info_span, warn, Instrument};

use command::{ChoreError, ExecutionResult, RunId, SearchPath};

use crate::launcher::{Launch, Launcher, ProcessHandle};
use crate::resolver::Resolver;
use crate::stage::{Member, Stage};
use crate::stream::{self, Feed};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Directories searched for bare program names.
    pub search_path: SearchPath,
}

impl EngineConfig {
    /// Configuration from the inherited process environment. Only the search
    /// path variable is consulted.
    pub fn from_env() -> Self {
        Self {
            search_path: SearchPath::from_env(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Resolves, launches and aggregates stages.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    resolver: Resolver,
    launcher: Launcher,
}

impl Engine {
    /// Creates an engine from explicit configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            resolver: Resolver::new(config.search_path),
            launcher: Launcher::new(),
        }
    }

    /// Creates an engine from the inherited environment.
    pub fn from_env() -> Self {
        Self::new(EngineConfig::from_env())
    }

    /// The resolver used for command stages.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Runs `stage` to completion.
    ///
    /// Resolution failures and non-zero exits are reported in the returned
    /// [`ExecutionResult`]; an `Err` means the run itself could not complete.
    /// Deferred sources and transforms are called on the blocking thread
    /// pool, so they may themselves call [`crate::run`]; a panic inside one
    /// resumes on the caller.
    pub async fn run(&self, stage: impl Into<Stage>) -> Result<ExecutionResult, ChoreError> {
        self.run_with_id(RunId::new_random(), stage).await
    }

    /// Like [`Engine::run`], tagging the run's span with a caller-chosen id.
    pub async fn run_with_id(
        &self,
        run_id: RunId,
        stage: impl Into<Stage>,
    ) -> Result<ExecutionResult, ChoreError> {
        let members = stage.into().into_members();
        let span = info_span!("run", %run_id, stages = members.len());

        async move {
            let result = self.run_members(members).await?;
            debug!(exit_code = result.exit_code, "Run finished");
            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Runs `stage` on a fresh current-thread runtime, blocking the calling
    /// thread.
    ///
    /// Must not be called from within an async context.
    pub fn run_blocking(&self, stage: impl Into<Stage>) -> Result<ExecutionResult, ChoreError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| ChoreError::Runtime { source })?;
        runtime.block_on(self.run(stage))
    }

    async fn run_members(&self, members: Vec<Member>) -> Result<ExecutionResult, ChoreError> {
        let sole_stage = members.len() == 1;
        let mut segment = Segment::default();

        for member in members {
            match member {
                Member::Process(spec) => {
                    let invocation = self.resolver.resolve(&spec);
                    match self.launcher.launch(&invocation, segment.output.take()) {
                        Ok(Launch::Running(handle)) => segment.push_process(handle),
                        Ok(Launch::Refused { result, upstream }) => {
                            segment.discard(upstream);
                            segment.push_settled(result, stream::empty_feed());
                        }
                        Err(e) => {
                            segment.abort().await;
                            return Err(e);
                        }
                    }
                }
                Member::Source(source) => {
                    let upstream = segment.output.take();
                    segment.discard(upstream);
                    let text = compute(move || source.evaluate()).await?;
                    segment.push_settled(ExecutionResult::success(&text), stream::text_feed(text));
                }
                Member::Transform(transform) => {
                    // Barrier: the transform needs its producer's complete output.
                    let produced = std::mem::take(&mut segment).collect(false).await?;
                    let text = if produced.is_success() {
                        let input = produced.stdout;
                        compute(move || transform.apply(input)).await?
                    } else {
                        debug!(
                            exit_code = produced.exit_code,
                            "Producer failed; skipping transform"
                        );
                        produced.stdout
                    };
                    let outcome = ExecutionResult::new(produced.exit_code, &text, produced.stderr);
                    segment.push_settled(outcome, stream::text_feed(text));
                }
            }
        }

        segment.collect(sole_stage).await
    }
}

/// Runs a caller-supplied computation on the blocking pool, keeping the
/// runtime free to drive pipes and letting the computation block on a run of
/// its own. A panic in `f` is resumed on the calling task.
async fn compute<F>(f: F) -> Result<String, ChoreError>
where
    F: FnOnce() -> String + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(text) => Ok(text),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(ChoreError::Task {
            message: format!("computation: {e}"),
        }),
    }
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// Members launched since the last barrier, with the output of the most recent.
#[derive(Default)]
struct Segment {
    members: Vec<Slot>,
    /// Output of the last member, not yet wired to a consumer.
    output: Option<Feed>,
    /// Tasks discarding output that no stage consumes.
    discards: Vec<JoinHandle<std::io::Result<u64>>>,
}

enum Slot {
    Process {
        handle: ProcessHandle,
        stderr: JoinHandle<std::io::Result<Vec<u8>>>,
    },
    Settled(ExecutionResult),
}

impl Segment {
    fn push_process(&mut self, mut handle: ProcessHandle) {
        let stderr = handle.take_stderr();
        self.output = handle
            .take_stdout()
            .map(|stdout| Box::new(stdout) as Feed);
        self.members.push(Slot::Process {
            stderr: tokio::spawn(drain_stderr(stderr)),
            handle,
        });
    }

    fn push_settled(&mut self, result: ExecutionResult, output: Feed) {
        self.members.push(Slot::Settled(result));
        self.output = Some(output);
    }

    fn discard(&mut self, upstream: Option<Feed>) {
        if let Some(feed) = upstream {
            self.discards.push(tokio::spawn(stream::discard(feed)));
        }
    }

    /// Kills every running member and reaps it, abandoning all output. Used
    /// when the run aborts before the segment is complete.
    async fn abort(self) {
        drop(self.output);
        for task in &self.discards {
            task.abort();
        }

        let mut handles = Vec::new();
        for slot in self.members {
            if let Slot::Process { mut handle, stderr } = slot {
                handle.start_kill();
                stderr.abort();
                handles.push(handle);
            }
        }
        for mut handle in handles {
            if let Err(e) = handle.wait().await {
                warn!(program = %handle.program(), error = %e, "Failed to reap aborted process");
            }
        }
    }

    /// Reads the final output to end-of-file, waits for every member and
    /// reduces their outcomes.
    ///
    /// `sole_stage` marks a run of exactly one stage, which reports its own
    /// stderr whether or not it failed.
    async fn collect(self, sole_stage: bool) -> Result<ExecutionResult, ChoreError> {
        let stdout = match self.output {
            Some(feed) => stream::drain(feed)
                .await
                .map_err(|e| ChoreError::io("reading pipeline output", e))?,
            None => Vec::new(),
        };

        let mut outcomes = Vec::with_capacity(self.members.len());
        for member in self.members {
            outcomes.push(match member {
                Slot::Process { mut handle, stderr } => {
                    let exit_code = handle.wait().await?;
                    let context = format!("reading stderr of '{}'", handle.program());
                    let stderr = stream::join(stderr, context).await?;
                    Outcome {
                        exit_code,
                        stderr: String::from_utf8_lossy(&stderr).into_owned(),
                    }
                }
                Slot::Settled(result) => Outcome {
                    exit_code: result.exit_code,
                    stderr: result.stderr,
                },
            });
        }

        for task in self.discards {
            stream::join(task, "discarding unconsumed output").await?;
        }

        let stdout = String::from_utf8_lossy(&stdout);
        if sole_stage && outcomes.len() == 1 {
            if let Some(only) = outcomes.pop() {
                return Ok(ExecutionResult::new(only.exit_code, &stdout, only.stderr));
            }
        }
        Ok(first_failure(outcomes, &stdout))
    }
}

async fn drain_stderr(stderr: Option<ChildStderr>) -> std::io::Result<Vec<u8>> {
    match stderr {
        Some(pipe) => stream::drain(pipe).await,
        None => Ok(Vec::new()),
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Exit status and error text of one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Exit code, `128 + signal` for a signalled process.
    pub exit_code: i32,
    /// Captured standard error, untrimmed.
    pub stderr: String,
}

/// Reduces member outcomes by the first-non-zero rule; `stdout` is the last
/// member's output.
pub fn first_failure(outcomes: impl IntoIterator<Item = Outcome>, stdout: &str) -> ExecutionResult {
    match outcomes.into_iter().find(|o| o.exit_code != 0) {
        Some(failed) => ExecutionResult::new(failed.exit_code, stdout, failed.stderr),
        None => ExecutionResult::new(0, stdout, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(exit_code: i32, stderr: &str) -> Outcome {
        Outcome {
            exit_code,
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn all_zero_reports_success_and_discards_stderr_noise() {
        let result = first_failure([outcome(0, "warning"), outcome(0, "")], "out\n");
        assert_eq!(result, ExecutionResult::new(0, "out", ""));
    }

    #[test]
    fn earliest_failure_wins_over_later_ones() {
        let result = first_failure(
            [outcome(0, ""), outcome(2, "first\n"), outcome(1, "second")],
            "",
        );
        assert_eq!(result.exit_code, 2);
        assert_eq!(result.stderr, "first");
    }

    #[test]
    fn stdout_is_kept_even_on_failure() {
        let result = first_failure([outcome(1, "bad"), outcome(0, "")], "partial\n");
        assert_eq!(result.stdout, "partial");
    }

    #[test]
    fn engine_config_default_has_empty_search_path() {
        assert!(EngineConfig::default().search_path.is_empty());
    }
}
