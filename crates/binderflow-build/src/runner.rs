//! External command execution
//!
//! Every tool call goes through [`CommandRunner`], so the argument lists the
//! builders produce can be asserted on without docker being installed.

use async_trait::async_trait;
use binderflow_config::Secret;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// One fully-specified call to an external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Written to the child's stdin, then closed
    pub stdin: Option<Secret>,
    /// Capture stdout/stderr instead of passing them through to the CI log
    pub capture: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            capture: false,
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

    pub fn stdin(mut self, input: Secret) -> Self {
        self.stdin = Some(input);
        self
    }

    pub fn captured(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Command line for logs. Stdin is never included.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Result of a finished invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion. `Err` means the process could not be started or
    /// waited on; a non-zero exit is reported through the outcome.
    async fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutcome>;
}

/// Spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutcome> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);

        if invocation.stdin.is_some() {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null());
        }

        if invocation.capture {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        }

        let mut child = cmd.spawn()?;

        // A tool may exit without reading its input; its exit status still
        // has to be collected.
        let mut feed_error = None;
        if let Some(input) = &invocation.stdin
            && let Some(mut stdin) = child.stdin.take()
        {
            let fed = match stdin.write_all(input.expose().as_bytes()).await {
                Ok(()) => stdin.shutdown().await,
                Err(e) => Err(e),
            };
            if let Err(e) = fed {
                if e.kind() == std::io::ErrorKind::BrokenPipe {
                    tracing::debug!("{} closed stdin early", invocation.program);
                } else {
                    feed_error = Some(e);
                }
            }
        }

        let output = child.wait_with_output().await?;

        if let Some(e) = feed_error {
            return Err(e);
        }

        Ok(CommandOutcome {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Logs what would run and reports success.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRunner;

#[async_trait]
impl CommandRunner for DryRunRunner {
    async fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutcome> {
        tracing::info!("[dry-run] {}", invocation.display());
        Ok(CommandOutcome::exited(0))
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::Mutex;

    type Matcher = Box<dyn Fn(&Invocation) -> bool + Send + Sync>;

    /// Records every invocation and answers with scripted exit codes.
    #[derive(Default)]
    pub struct RecordingRunner {
        calls: Mutex<Vec<Invocation>>,
        failures: Vec<(Matcher, Option<i32>)>,
        spawn_errors: Vec<Matcher>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Matching invocations exit with `code` (`None` = killed).
        pub fn fail_when<F>(mut self, matcher: F, code: Option<i32>) -> Self
        where
            F: Fn(&Invocation) -> bool + Send + Sync + 'static,
        {
            self.failures.push((Box::new(matcher), code));
            self
        }

        /// Matching invocations cannot be spawned.
        pub fn missing_when<F>(mut self, matcher: F) -> Self
        where
            F: Fn(&Invocation) -> bool + Send + Sync + 'static,
        {
            self.spawn_errors.push(Box::new(matcher));
            self
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }

        /// `program arg0` of every call, in order
        pub fn verbs(&self) -> Vec<String> {
            self.calls()
                .iter()
                .map(|c| {
                    format!(
                        "{} {}",
                        c.program,
                        c.args.first().map(String::as_str).unwrap_or("")
                    )
                })
                .collect()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutcome> {
            self.calls.lock().unwrap().push(invocation.clone());

            if self.spawn_errors.iter().any(|m| m(invocation)) {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} not found", invocation.program),
                ));
            }

            for (matcher, code) in &self.failures {
                if matcher(invocation) {
                    return Ok(CommandOutcome {
                        code: *code,
                        stdout: String::new(),
                        stderr: "scripted failure".to_string(),
                    });
                }
            }

            Ok(CommandOutcome::exited(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_omits_stdin() {
        let inv = Invocation::new("docker")
            .args(["login", "-u", "me", "--password-stdin"])
            .stdin(Secret::new("hunter2"));
        assert_eq!(inv.display(), "docker login -u me --password-stdin");
        assert!(!format!("{:?}", inv).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_dry_run_always_succeeds() {
        let outcome = DryRunRunner
            .run(&Invocation::new("definitely-not-installed"))
            .await
            .unwrap();
        assert!(outcome.success());
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let result = SystemRunner
            .run(&Invocation::new("binderflow-no-such-program-xyz"))
            .await;
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_and_feeds_stdin() {
        let inv = Invocation::new("sh")
            .args(["-c", "read line; echo \"got $line\"; exit 3"])
            .stdin(Secret::new("pw\n"))
            .captured();
        let outcome = SystemRunner.run(&inv).await.unwrap();
        assert_eq!(outcome.code, Some(3));
        assert!(!outcome.success());
        assert_eq!(outcome.stdout.trim(), "got pw");
    }

    /// A tool that exits without reading stdin still reports its own status
    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_keeps_status_when_stdin_unread() {
        let inv = Invocation::new("sh")
            .args(["-c", "echo denied >&2; exit 5"])
            .stdin(Secret::new("x".repeat(1 << 20)))
            .captured();
        let outcome = SystemRunner.run(&inv).await.unwrap();
        assert_eq!(outcome.code, Some(5));
        assert_eq!(outcome.stderr.trim(), "denied");
    }
}
