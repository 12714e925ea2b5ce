//! Command builder for running the docker binary (and friends).
//!
//! Mirrors the `std::process::Command` builder shape but always captures
//! output, optionally feeds stdin, and turns failures into
//! [`DeployError::CommandFailed`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use swarmdeploy_shared::{DeployError, DeployResult};
use tokio::io::AsyncWriteExt;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Builder for a one-shot external command.
///
/// ```no_run
/// # use swarmdeploy::docker::DockerCommand;
/// # async fn example() -> swarmdeploy::DeployResult<()> {
/// let out = DockerCommand::new("docker")
///     .args(["secret", "create", "NAME", "-"])
///     .stdin(b"value".to_vec())
///     .run()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DockerCommand {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
    stdin: Option<Vec<u8>>,
}

impl DockerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
            stdin: None,
        }
    }

    /// Append arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.env.insert(k.into(), v.into());
        }
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Bytes written to the child's stdin, which is then closed.
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// `program arg1 arg2 ...` for logs and error messages.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    /// Run to completion and capture output, whatever the exit code.
    pub async fn output(&self) -> DeployResult<ExecOutput> {
        tracing::debug!(command = %self.display(), "Running command");

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .envs(&self.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DeployError::precondition_with_hint(
                    format!("{} not found", self.program.display()),
                    "install Docker and make sure it is on PATH",
                )
            } else {
                DeployError::Internal(format!("failed to spawn `{}`: {}", self.display(), e))
            }
        })?;

        if let Some(input) = &self.stdin
            && let Some(mut pipe) = child.stdin.take()
        {
            pipe.write_all(input).await?;
            pipe.shutdown().await?;
        }

        let out = child.wait_with_output().await?;
        let output = ExecOutput {
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        };
        tracing::debug!(command = %self.display(), code = ?output.code, "Command finished");
        Ok(output)
    }

    /// Run and fail with [`DeployError::CommandFailed`] on a non-zero exit.
    pub async fn run(&self) -> DeployResult<ExecOutput> {
        let output = self.output().await?;
        if output.success() {
            Ok(output)
        } else {
            Err(DeployError::CommandFailed {
                command: self.display(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_argv() {
        let cmd = DockerCommand::new("docker")
            .args(["stack", "deploy"])
            .arg("-c")
            .arg("swarm-stack.yml");
        assert_eq!(cmd.display(), "docker stack deploy -c swarm-stack.yml");
    }

    #[tokio::test]
    async fn test_missing_program_is_precondition() {
        let err = DockerCommand::new("/nonexistent/docker-binary")
            .arg("info")
            .output()
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Precondition { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_reports_exit_code_and_stderr() {
        let err = DockerCommand::new("sh")
            .args(["-c", "echo boom >&2; exit 3"])
            .run()
            .await
            .unwrap_err();
        match err {
            DeployError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdin_is_forwarded() {
        let out = DockerCommand::new("cat").stdin(b"secret".to_vec()).run().await.unwrap();
        assert_eq!(out.stdout, "secret");
    }
}
