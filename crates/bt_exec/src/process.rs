//! Running external programs.
//!
//! [`SystemRunner`] spawns a child with piped stdout and stderr and drains
//! both on dedicated threads, so a child that fills one pipe while the
//! runner waits on the other can never deadlock. Every line is forwarded
//! to `tracing` as it arrives and also captured for the caller.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::ExecError;

/// Number of trailing stderr lines kept in [`ExecError::NonZero`].
const STDERR_TAIL_LINES: usize = 20;

/// A program invocation: program, positional arguments, working directory
/// and extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    echo: bool,
}

impl ExternalCommand {
    /// Starts building an invocation of `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            echo: true,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Runs the program in `dir`.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Sets an environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Captures output without logging it above trace level. Used for
    /// queries whose output is parsed rather than shown.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Returns the program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Returns the working directory, if set.
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Returns the extra environment variables.
    pub fn envs(&self) -> &[(String, String)] {
        &self.env
    }

    /// Returns `true` unless [`quiet`](Self::quiet) was set.
    pub fn echoes(&self) -> bool {
        self.echo
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or `None` if the child was killed by a signal.
    pub code: Option<i32>,
    /// Everything written to stdout.
    pub stdout: String,
    /// Everything written to stderr.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` if the child exited with code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Converts an unsuccessful exit into [`ExecError::NonZero`].
    pub fn check(self, command: &ExternalCommand) -> Result<Self, ExecError> {
        if self.success() {
            return Ok(self);
        }
        let lines: Vec<&str> = self.stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        Err(ExecError::NonZero {
            command: command.to_string(),
            code: self.code,
            stderr: tail,
        })
    }
}

/// Something that can run external commands.
pub trait CommandRunner {
    /// Runs `command` to completion and returns its output whatever the exit
    /// status.
    fn execute(&self, command: &ExternalCommand) -> Result<CommandOutput, ExecError>;

    /// Runs `command` and fails unless it exits with code 0.
    fn run(&self, command: &ExternalCommand) -> Result<CommandOutput, ExecError> {
        self.execute(command)?.check(command)
    }
}

/// Runs commands as child processes of this one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Creates a runner.
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn execute(&self, command: &ExternalCommand) -> Result<CommandOutput, ExecError> {
        let program = command.program().to_string();
        let mut cmd = Command::new(command.program());
        cmd.args(command.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = command.cwd() {
            cmd.current_dir(dir);
        }
        for (key, value) in command.envs() {
            cmd.env(key, value);
        }

        match command.cwd() {
            Some(dir) => tracing::info!(dir = %dir.display(), "running {command}"),
            None => tracing::info!("running {command}"),
        }
        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })?;

        let wait_err = |source| ExecError::Wait {
            program: program.clone(),
            source,
        };
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| wait_err(std::io::Error::other("stdout was not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| wait_err(std::io::Error::other("stderr was not captured")))?;

        let echo = command.echoes();
        let (out, err) = std::thread::scope(|scope| {
            let out = scope.spawn(|| drain(stdout, "stdout", echo));
            let err = scope.spawn(|| drain(stderr, "stderr", echo));
            (join(out), join(err))
        });
        let status = child.wait().map_err(wait_err)?;

        Ok(CommandOutput {
            code: status.code(),
            stdout: out.map_err(wait_err)?,
            stderr: err.map_err(wait_err)?,
        })
    }
}

fn join(handle: std::thread::ScopedJoinHandle<'_, std::io::Result<String>>) -> std::io::Result<String> {
    handle
        .join()
        .unwrap_or_else(|_| Err(std::io::Error::other("output reader panicked")))
}

/// Reads `pipe` to the end, forwarding each line to the log.
fn drain(pipe: impl Read, stream: &'static str, echo: bool) -> std::io::Result<String> {
    let mut reader = BufReader::new(pipe);
    let mut captured = String::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if echo {
            tracing::info!(stream, "{trimmed}");
        } else {
            tracing::trace!(stream, "{trimmed}");
        }
        captured.push_str(&line);
    }
    Ok(captured)
}
