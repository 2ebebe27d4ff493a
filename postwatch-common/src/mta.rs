//! Invocation seam for the Postfix control utilities.
//!
//! Everything the sidecars learn about the mail transfer agent comes from
//! shelling out to `postfix` and `postqueue`. The [`MtaControl`] trait is the
//! narrow waist: production code goes through [`PostfixCli`], tests go
//! through [`MockMta`]. Every invocation carries a bounded timeout so a hung
//! utility can never stall a request handler or the reconciliation loop.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

/// Captured result of one control-utility invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Whether the process exited with code 0.
    pub success: bool,

    /// The exit code, if the process exited normally.
    pub exit_code: Option<i32>,

    /// Captured standard output, lossily decoded.
    pub stdout: String,

    /// Captured standard error, lossily decoded.
    pub stderr: String,
}

impl CommandOutput {
    /// A successful invocation with the given standard output.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed invocation with the given exit code and standard error.
    #[must_use]
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

impl From<std::process::Output> for CommandOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Errors that can occur while invoking a control utility.
///
/// A non-zero exit is not an error here; callers inspect
/// [`CommandOutput::success`] for that. These variants cover the cases where
/// no exit status could be observed at all.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The process could not be spawned (missing binary, permissions).
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process did not complete within the configured timeout.
    #[error("`{command}` timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },
}

/// Specialized `Result` type for control-utility invocations.
pub type Result<T> = std::result::Result<T, CommandError>;

/// The set of control-utility invocations the sidecars perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MtaCommand {
    /// `postfix status`
    Status,
    /// `postfix start`
    Start,
    /// `postfix reload`
    Reload,
    /// `postfix check`
    Check,
    /// `postqueue -p`
    QueueListing,
}

/// Control-utility access for the mail transfer agent.
#[async_trait]
pub trait MtaControl: Send + Sync + fmt::Debug {
    /// Run `postfix status`. Exit code 0 means the MTA is running.
    async fn status(&self) -> Result<CommandOutput>;

    /// Run `postfix start`.
    async fn start(&self) -> Result<CommandOutput>;

    /// Run `postfix reload`.
    async fn reload(&self) -> Result<CommandOutput>;

    /// Run `postfix check`. Exit code 0 means the configuration is valid.
    async fn check(&self) -> Result<CommandOutput>;

    /// Run `postqueue -p` and capture the queue listing.
    async fn queue_listing(&self) -> Result<CommandOutput>;
}

/// Shells out to the `postfix` and `postqueue` binaries.
#[derive(Debug, Clone)]
pub struct PostfixCli {
    postfix_bin: String,
    postqueue_bin: String,
    timeout: Duration,
}

impl PostfixCli {
    /// Create a CLI wrapper using the binaries from `PATH` and the given
    /// per-command timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            postfix_bin: "postfix".to_string(),
            postqueue_bin: "postqueue".to_string(),
            timeout,
        }
    }

    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let command = format!("{program} {}", args.join(" "));

        let mut invocation = Command::new(program);
        invocation.args(args).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, invocation.output())
            .await
            .map_err(|_| CommandError::Timeout {
                command: command.clone(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|source| CommandError::Spawn { command, source })?;

        Ok(CommandOutput::from(output))
    }
}

#[async_trait]
impl MtaControl for PostfixCli {
    async fn status(&self) -> Result<CommandOutput> {
        self.run(&self.postfix_bin, &["status"]).await
    }

    async fn start(&self) -> Result<CommandOutput> {
        self.run(&self.postfix_bin, &["start"]).await
    }

    async fn reload(&self) -> Result<CommandOutput> {
        self.run(&self.postfix_bin, &["reload"]).await
    }

    async fn check(&self) -> Result<CommandOutput> {
        self.run(&self.postfix_bin, &["check"]).await
    }

    async fn queue_listing(&self) -> Result<CommandOutput> {
        self.run(&self.postqueue_bin, &["-p"]).await
    }
}

/// Mock implementation of [`MtaControl`] for testing.
///
/// Every command succeeds with empty output unless a response is overridden
/// with [`set_output`](Self::set_output) or the command is marked as failing
/// to spawn with [`fail_to_spawn`](Self::fail_to_spawn). Invocations are
/// recorded and can be asserted on with [`calls`](Self::calls).
#[derive(Debug, Clone, Default)]
pub struct MockMta {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    outputs: HashMap<MtaCommand, CommandOutput>,
    spawn_failures: HashSet<MtaCommand>,
    calls: Vec<MtaCommand>,
}

impl MockMta {
    /// Create a mock where every command succeeds with empty output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the output returned for `command`.
    ///
    /// # Panics
    /// Panics if the mock's mutex is poisoned.
    pub fn set_output(&self, command: MtaCommand, output: CommandOutput) {
        self.inner
            .lock()
            .expect("MockMta state mutex poisoned")
            .outputs
            .insert(command, output);
    }

    /// Make `command` fail as if the binary could not be spawned.
    ///
    /// # Panics
    /// Panics if the mock's mutex is poisoned.
    pub fn fail_to_spawn(&self, command: MtaCommand) {
        self.inner
            .lock()
            .expect("MockMta state mutex poisoned")
            .spawn_failures
            .insert(command);
    }

    /// All commands invoked so far, in order.
    ///
    /// # Panics
    /// Panics if the mock's mutex is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<MtaCommand> {
        self.inner
            .lock()
            .expect("MockMta state mutex poisoned")
            .calls
            .clone()
    }

    fn invoke(&self, command: MtaCommand) -> Result<CommandOutput> {
        let mut state = self.inner.lock().expect("MockMta state mutex poisoned");
        state.calls.push(command);

        if state.spawn_failures.contains(&command) {
            return Err(CommandError::Spawn {
                command: format!("{command:?}"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "mocked spawn failure"),
            });
        }

        Ok(state
            .outputs
            .get(&command)
            .cloned()
            .unwrap_or_else(|| CommandOutput::ok("")))
    }
}

#[async_trait]
impl MtaControl for MockMta {
    async fn status(&self) -> Result<CommandOutput> {
        self.invoke(MtaCommand::Status)
    }

    async fn start(&self) -> Result<CommandOutput> {
        self.invoke(MtaCommand::Start)
    }

    async fn reload(&self) -> Result<CommandOutput> {
        self.invoke(MtaCommand::Reload)
    }

    async fn check(&self) -> Result<CommandOutput> {
        self.invoke(MtaCommand::Check)
    }

    async fn queue_listing(&self) -> Result<CommandOutput> {
        self.invoke(MtaCommand::QueueListing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_defaults_to_success() {
        let mta = MockMta::new();
        let output = mta.status().await.unwrap();
        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_mock_overridden_output() {
        let mta = MockMta::new();
        mta.set_output(MtaCommand::Reload, CommandOutput::failed(1, "reload refused"));

        let output = mta.reload().await.unwrap();
        assert!(!output.success);
        assert_eq!(output.stderr, "reload refused");
    }

    #[tokio::test]
    async fn test_mock_spawn_failure() {
        let mta = MockMta::new();
        mta.fail_to_spawn(MtaCommand::Check);

        let error = mta.check().await.unwrap_err();
        assert!(matches!(error, CommandError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_mock_records_calls() {
        let mta = MockMta::new();
        let _ = mta.status().await;
        let _ = mta.reload().await;

        assert_eq!(mta.calls(), vec![MtaCommand::Status, MtaCommand::Reload]);
    }

    #[test]
    fn test_command_error_display() {
        let error = CommandError::Timeout {
            command: "postfix status".to_string(),
            timeout_secs: 10,
        };
        assert_eq!(error.to_string(), "`postfix status` timed out after 10s");
    }
}
