//! External reload command.

use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::ReloadConfig;
use crate::observability::metrics;

/// Errors that can occur while running the reload command.
#[derive(Debug, Error)]
pub enum ReloadError {
    /// No program configured.
    #[error("reload command is empty")]
    EmptyCommand,

    /// The process could not be started or waited on.
    #[error("failed to run '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited unsuccessfully.
    #[error("reload exited with {code}: {stderr}")]
    Failed { code: String, stderr: String },

    /// The process did not finish in time and was killed.
    #[error("reload timed out after {0:?}")]
    Timeout(Duration),
}

/// Asks the load balancer process to reload its configuration.
#[derive(Debug, Clone)]
pub struct ReloadTrigger {
    command: Vec<String>,
    timeout: Duration,
}

impl ReloadTrigger {
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    pub fn from_config(config: &ReloadConfig) -> Self {
        Self::new(config.command.clone(), Duration::from_secs(config.timeout_secs))
    }

    /// The command line as it would be shown to an operator.
    pub fn display(&self) -> String {
        self.command.join(" ")
    }

    /// Run the reload. With `commit = false` nothing is executed and the
    /// reload is reported as successful. Never fails past this point.
    pub async fn reload(&self, commit: bool) -> bool {
        tracing::info!(command = %self.display(), "Reloading load balancer");

        if !commit {
            tracing::info!("Dry-run: not executing reload");
            metrics::record_reload("simulated");
            return true;
        }

        match self.try_reload().await {
            Ok(()) => {
                tracing::info!("Load balancer reload successful");
                metrics::record_reload("ok");
                true
            }
            Err(e) => {
                tracing::error!(command = %self.display(), error = %e, "Load balancer reload failed");
                metrics::record_reload("failed");
                false
            }
        }
    }

    /// Run the reload and report why it failed, if it did.
    pub async fn try_reload(&self) -> Result<(), ReloadError> {
        let (program, args) = self.command.split_first().ok_or(ReloadError::EmptyCommand)?;

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match timeout(self.timeout, child).await {
            Ok(result) => result.map_err(|source| ReloadError::Launch {
                program: program.clone(),
                source,
            })?,
            Err(_) => return Err(ReloadError::Timeout(self.timeout)),
        };

        if output.status.success() {
            return Ok(());
        }

        let code = output
            .status
            .code()
            .map(|c| format!("status {}", c))
            .unwrap_or_else(|| "signal".to_string());
        Err(ReloadError::Failed {
            code,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
