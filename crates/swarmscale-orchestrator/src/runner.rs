//! Process execution for orchestrator commands.
//!
//! Commands are launched directly (no intermediate shell), so service
//! names and image references are passed as discrete arguments.

use std::fmt;
use std::process::Stdio;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use swarmscale_core::BoxFuture;

/// A single process launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment for the child. Never logged.
    pub env: Vec<(String, String)>,
    /// Data written to the child's stdin. Never logged.
    pub stdin: Option<String>,
}

impl Invocation {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            env: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured output of a successful launch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn stdout(s: &str) -> Self {
        Self {
            stdout: s.to_string(),
            stderr: String::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}` timed out after {after:?}")]
    TimedOut { command: String, after: std::time::Duration },

    #[error("i/o error running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Launches an [`Invocation`] and collects its output.
pub trait CommandRunner: Send + Sync {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, Result<CommandOutput, RunError>>;
}

/// Runs commands as local child processes.
///
/// Children are killed when the future is dropped, so a timed-out or
/// cancelled step does not leave a `docker` process behind.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, Result<CommandOutput, RunError>> {
        Box::pin(async move {
            let command = invocation.to_string();
            debug!(%command, "running command");

            let mut child = Command::new(&invocation.program)
                .args(&invocation.args)
                .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .stdin(if invocation.stdin.is_some() {
                    Stdio::piped()
                } else {
                    Stdio::null()
                })
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|source| RunError::Spawn {
                    command: command.clone(),
                    source,
                })?;

            if let (Some(input), Some(mut handle)) = (&invocation.stdin, child.stdin.take()) {
                handle
                    .write_all(input.as_bytes())
                    .await
                    .map_err(|source| RunError::Io {
                        command: command.clone(),
                        source,
                    })?;
                // Dropping the handle closes the pipe.
            }

            let output = child.wait_with_output().await.map_err(|source| RunError::Io {
                command: command.clone(),
                source,
            })?;

            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

            if !output.status.success() {
                return Err(RunError::Failed {
                    command,
                    status: output.status.to_string(),
                    stderr: stderr.trim().to_string(),
                });
            }

            debug!(%command, "command succeeded");
            Ok(CommandOutput { stdout, stderr })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_omits_env_and_stdin() {
        let inv = Invocation::new("docker")
            .args(["login", "--password-stdin"])
            .env("AWS_SECRET_ACCESS_KEY", "hunter2")
            .stdin("hunter2");
        assert_eq!(inv.to_string(), "docker login --password-stdin");
    }

    #[tokio::test]
    async fn captures_stdout() {
        let out = ShellRunner
            .run(&Invocation::new("echo").arg("test"))
            .await
            .unwrap();
        assert_eq!(out.stdout, "test\n");
    }

    #[tokio::test]
    async fn feeds_stdin() {
        let out = ShellRunner
            .run(&Invocation::new("cat").stdin("from stdin"))
            .await
            .unwrap();
        assert_eq!(out.stdout, "from stdin");
    }

    #[tokio::test]
    async fn passes_env() {
        let out = ShellRunner
            .run(
                &Invocation::new("sh")
                    .args(["-c", "printf %s \"$SWARMSCALE_TEST\""])
                    .env("SWARMSCALE_TEST", "value"),
            )
            .await
            .unwrap();
        assert_eq!(out.stdout, "value");
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let err = ShellRunner
            .run(&Invocation::new("sh").args(["-c", "echo nope >&2; exit 3"]))
            .await
            .unwrap_err();
        match err {
            RunError::Failed { stderr, .. } => assert_eq!(stderr, "nope"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let err = ShellRunner
            .run(&Invocation::new("swarmscale-no-such-binary"))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Spawn { .. }));
    }
}
