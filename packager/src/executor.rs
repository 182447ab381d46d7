//! External command execution.
//!
//! Every interaction with the toolchain (`rustup`, `cargo`, `rustc`) goes
//! through [`CommandExecutor`], so the release pipeline can be exercised with a
//! test double instead of a real compiler. The system implementation blocks
//! until the child exits; an optional wall-clock timeout kills and reaps the
//! child when it elapses.

use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::fmt;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// A fully described external command invocation.
///
/// # Examples
///
/// ```
/// use baasha_packager::executor::Invocation;
///
/// let invocation = Invocation::new("rustup").args(["target", "add", "wasm32-unknown-unknown"]);
/// assert_eq!(invocation.to_string(), "rustup target add wasm32-unknown-unknown");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    current_dir: Option<Utf8PathBuf>,
    envs: Vec<(String, String)>,
}

impl Invocation {
    /// Start describing an invocation of `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            envs: Vec::new(),
        }
    }

    /// Append a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the command from `dir` instead of the inherited directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// The program to run.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments passed to the program.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// The working directory override, if any.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Utf8Path> {
        self.current_dir.as_deref()
    }

    /// Extra environment variables for the child.
    #[must_use]
    pub fn envs(&self) -> &[(String, String)] {
        &self.envs
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir.as_std_path());
        }
        for (key, value) in &self.envs {
            command.env(key, value);
        }
        command
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    /// Runs the invocation to completion and returns its captured output.
    ///
    /// A non-zero exit status is not an error at this level; callers inspect
    /// [`Output::status`] and decide.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::CommandSpawn`] if the program cannot be started
    /// and [`PackagerError::CommandTimedOut`] if a configured timeout elapses.
    fn run(&self, invocation: &Invocation) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor {
    timeout: Option<Duration>,
}

impl SystemCommandExecutor {
    /// Create an executor that waits for each command without a time limit.
    #[must_use]
    pub const fn new() -> Self {
        Self { timeout: None }
    }

    /// Create an executor that kills commands running longer than `timeout`.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        debug!("running `{invocation}`");
        let mut command = invocation.to_command();
        match self.timeout {
            None => command
                .stdin(Stdio::null())
                .output()
                .map_err(|source| spawn_error(invocation, source)),
            Some(timeout) => run_with_timeout(&mut command, invocation, timeout),
        }
    }
}

fn run_with_timeout(
    command: &mut Command,
    invocation: &Invocation,
    timeout: Duration,
) -> Result<Output> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|source| spawn_error(invocation, source))?;

    // Pipes are drained concurrently so a child producing more output than the
    // pipe buffer holds cannot block forever on write.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let waited = child.wait_timeout(timeout);
    let status = settle(&mut child, waited, invocation, timeout)?;
    Ok(Output {
        status,
        stdout: collect(stdout)?,
        stderr: collect(stderr)?,
    })
}

/// Turn the result of a bounded wait into the child's exit status.
///
/// The child is killed and reaped whenever no status is available, so a
/// failed or expired wait never leaves it running.
fn settle(
    child: &mut Child,
    waited: io::Result<Option<ExitStatus>>,
    invocation: &Invocation,
    timeout: Duration,
) -> Result<ExitStatus> {
    match waited {
        Ok(Some(status)) => Ok(status),
        Ok(None) => {
            terminate(child, invocation);
            Err(PackagerError::CommandTimedOut {
                program: invocation.program().to_owned(),
                seconds: timeout.as_secs(),
            })
        }
        Err(e) => {
            terminate(child, invocation);
            Err(e.into())
        }
    }
}

fn terminate(child: &mut Child, invocation: &Invocation) {
    if let Err(e) = child.kill() {
        warn!("failed to kill `{invocation}`: {e}");
    }
    if let Err(e) = child.wait() {
        warn!("failed to reap `{invocation}`: {e}");
    }
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut reader) = pipe {
            reader.read_to_end(&mut buffer)?;
        }
        Ok(buffer)
    })
}

fn collect(handle: JoinHandle<io::Result<Vec<u8>>>) -> Result<Vec<u8>> {
    let bytes = handle
        .join()
        .map_err(|_| io::Error::other("output reader thread panicked"))??;
    Ok(bytes)
}

fn spawn_error(invocation: &Invocation, source: io::Error) -> PackagerError {
    PackagerError::CommandSpawn {
        program: invocation.program().to_owned(),
        source,
    }
}

/// Extract a trimmed diagnostic message from a command's error stream.
///
/// Returns `unknown error` when the stream is empty.
#[must_use]
pub fn stderr_diagnostics(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        "unknown error".to_owned()
    } else {
        trimmed.to_owned()
    }
}
