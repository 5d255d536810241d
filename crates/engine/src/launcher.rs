//! Process launch.
//!
//! The launcher is the only place a child process is started. It refuses any
//! invocation that is not [`Validity::Runnable`](command::Validity::Runnable),
//! handing back the synthetic exit-255 result instead, and otherwise spawns the
//! child with its stdout and stderr on private pipes.

use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use command::{ChoreError, ExecutionResult, ProgramName, ResolvedInvocation};

use crate::stream::{self, Feed};

/// Outcome of asking the launcher to start an invocation.
pub enum Launch {
    /// The child is running.
    Running(ProcessHandle),

    /// The invocation was not runnable and nothing was spawned.
    ///
    /// `upstream` is the input feed the caller supplied, returned unconsumed so
    /// the caller can drain it.
    Refused {
        result: ExecutionResult,
        upstream: Option<Feed>,
    },
}

/// Starts child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Launcher;

impl Launcher {
    /// Creates a launcher.
    pub fn new() -> Self {
        Self
    }

    /// Launches `invocation`, reading its stdin from `stdin` when given.
    ///
    /// Without a feed the child's stdin is the null device. With one, a relay
    /// task copies the feed into the child's stdin pipe while the child runs.
    ///
    /// Must be called from within a tokio runtime.
    pub fn launch(
        &self,
        invocation: &ResolvedInvocation,
        stdin: Option<Feed>,
    ) -> Result<Launch, ChoreError> {
        if let Some(result) = ExecutionResult::launch_failure(invocation) {
            warn!(
                program = %invocation.program,
                validity = ?invocation.validity,
                "Refusing to launch"
            );
            return Ok(Launch::Refused {
                result,
                upstream: stdin,
            });
        }

        let mut cmd = Command::new(&invocation.path);
        #[cfg(unix)]
        cmd.arg0(invocation.program.as_str());
        cmd.args(&invocation.args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| ChoreError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        debug!(
            program = %invocation.program,
            pid = child.id(),
            "Spawned process"
        );

        let stdin_relay = match (stdin, child.stdin.take()) {
            (Some(feed), Some(pipe)) => Some(tokio::spawn(stream::relay(feed, pipe))),
            _ => None,
        };

        Ok(Launch::Running(ProcessHandle {
            program: invocation.program.clone(),
            stdout: child.stdout.take(),
            stderr: child.stderr.take(),
            child,
            stdin_relay,
            exit_code: None,
        }))
    }
}

/// A live child process and the handles to its captured streams.
///
/// The stdout and stderr pipes are taken out of the handle and drained on
/// separate tasks, so nothing the child writes can block on the thread that
/// calls [`ProcessHandle::wait`].
pub struct ProcessHandle {
    program: ProgramName,
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    stdin_relay: Option<JoinHandle<std::io::Result<u64>>>,
    exit_code: Option<i32>,
}

impl ProcessHandle {
    /// The program token this process was launched from.
    pub fn program(&self) -> &ProgramName {
        &self.program
    }

    /// OS process id, or `None` once the process has been reaped.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Takes the readable end of the child's stdout pipe.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Takes the readable end of the child's stderr pipe.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    /// Sends the child a kill signal without waiting for it to exit. Does
    /// nothing once the child has been reaped.
    pub fn start_kill(&mut self) {
        if self.exit_code.is_some() {
            return;
        }
        if let Err(e) = self.child.start_kill() {
            debug!(program = %self.program, error = %e, "Kill not delivered");
        }
    }

    /// Waits for the child to exit and reaps it.
    ///
    /// Idempotent: once reaped, later calls return the cached exit code. Also
    /// waits for the stdin relay so its pipe is closed before returning.
    pub async fn wait(&mut self) -> Result<i32, ChoreError> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| ChoreError::io(format!("waiting for '{}'", self.program), e))?;

        if let Some(relay) = self.stdin_relay.take() {
            let copied =
                stream::join(relay, format!("writing stdin of '{}'", self.program)).await?;
            debug!(program = %self.program, bytes = copied, "Stdin relay finished");
        }

        let code = exit_code(status);
        debug!(program = %self.program, exit_code = code, "Reaped process");
        self.exit_code = Some(code);
        Ok(code)
    }
}

/// Exit code of a finished child. A child killed by a signal reports
/// `128 + signal`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::PathBuf;

    use command::{ProgramName, Validity};

    use super::*;
    use crate::stream::{drain, text_feed};

    fn runnable(path: &str, args: &[&str]) -> ResolvedInvocation {
        ResolvedInvocation {
            path: PathBuf::from(path),
            program: ProgramName::new(path).unwrap(),
            args: args.iter().map(|a| a.to_string()).collect(),
            validity: Validity::Runnable,
        }
    }

    fn running(launch: Launch) -> ProcessHandle {
        match launch {
            Launch::Running(handle) => handle,
            Launch::Refused { result, .. } => panic!("unexpected refusal: {result}"),
        }
    }

    #[tokio::test]
    async fn refuses_non_runnable_without_spawning() {
        let mut plan = runnable("/bin/yolo", &[]);
        plan.validity = Validity::NotFound;

        let launch = Launcher::new().launch(&plan, Some(text_feed("x"))).unwrap();

        match launch {
            Launch::Refused { result, upstream } => {
                assert_eq!(result.exit_code, 255);
                assert_eq!(result.stderr, "/bin/yolo: launch path not accessible");
                assert!(upstream.is_some());
            }
            Launch::Running(_) => panic!("should not spawn"),
        }
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let mut handle =
            running(Launcher::new().launch(&runnable("/bin/echo", &["#yolo"]), None).unwrap());
        let out = drain(handle.take_stdout().unwrap()).await.unwrap();
        assert_eq!(handle.wait().await.unwrap(), 0);
        assert_eq!(out, b"#yolo\n");
    }

    #[tokio::test]
    async fn wait_is_idempotent() {
        let mut handle = running(
            Launcher::new()
                .launch(&runnable("/bin/sh", &["-c", "exit 3"]), None)
                .unwrap(),
        );
        assert_eq!(handle.wait().await.unwrap(), 3);
        assert_eq!(handle.wait().await.unwrap(), 3);
        assert!(handle.pid().is_none());
    }

    #[tokio::test]
    async fn feeds_stdin_from_feed() {
        let mut handle = running(
            Launcher::new()
                .launch(&runnable("/bin/cat", &[]), Some(text_feed("piped in")))
                .unwrap(),
        );
        let out = drain(handle.take_stdout().unwrap()).await.unwrap();
        handle.wait().await.unwrap();
        assert_eq!(out, b"piped in");
    }

    #[tokio::test]
    async fn stderr_is_separate_from_stdout() {
        let mut handle = running(
            Launcher::new()
                .launch(&runnable("/bin/sh", &["-c", "echo out; echo err >&2"]), None)
                .unwrap(),
        );
        let out = drain(handle.take_stdout().unwrap()).await.unwrap();
        let err = drain(handle.take_stderr().unwrap()).await.unwrap();
        handle.wait().await.unwrap();
        assert_eq!(out, b"out\n");
        assert_eq!(err, b"err\n");
    }

    #[tokio::test]
    async fn signalled_child_reports_128_plus_signal() {
        let mut handle = running(
            Launcher::new()
                .launch(&runnable("/bin/sh", &["-c", "kill -TERM $$"]), None)
                .unwrap(),
        );
        assert_eq!(handle.wait().await.unwrap(), 128 + libc::SIGTERM);
    }

    #[tokio::test]
    async fn start_kill_stops_a_running_child() {
        let mut handle = running(
            Launcher::new()
                .launch(&runnable("/bin/sleep", &["30"]), None)
                .unwrap(),
        );
        handle.start_kill();
        assert_eq!(handle.wait().await.unwrap(), 128 + libc::SIGKILL);
        // Reaped: a second kill is a no-op and the code stays cached.
        handle.start_kill();
        assert_eq!(handle.wait().await.unwrap(), 128 + libc::SIGKILL);
    }

    #[tokio::test]
    async fn spawn_failure_is_an_error() {
        // Judged runnable, but gone by the time it is spawned.
        let plan = runnable("/nonexistent/chore-test-binary", &[]);
        let err = Launcher::new().launch(&plan, None).err().unwrap();
        assert!(matches!(err, ChoreError::Spawn { .. }));
    }
}
