//! External command source. The command is re-run on a fixed schedule and its
//! trimmed standard output becomes the text.

use crate::error::{LedseqError, Result};
use crate::source::{run_periodic, RefreshContext, SourceAdapter};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq)]
pub struct CommandConfig {
    pub program: String,
    pub args: Vec<String>,
    pub refresh_interval: Duration,
    /// A run still going after this long is killed and counted as a failure
    pub timeout: Duration,
}

pub struct CommandAdapter {
    config: CommandConfig,
}

impl CommandAdapter {
    pub fn new(config: CommandConfig) -> Self {
        Self { config }
    }

    async fn execute(&self) -> Result<String> {
        // kill_on_drop reaps the child when the timeout drops this future
        let output = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                LedseqError::acquisition("command", format!("{}: {e}", self.config.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LedseqError::acquisition(
                "command",
                format!(
                    "{} exited with {}: {}",
                    self.config.program,
                    output.status,
                    stderr.trim()
                ),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl SourceAdapter for CommandAdapter {
    fn kind(&self) -> &'static str {
        "command"
    }

    async fn run(self: Box<Self>, ctx: RefreshContext) {
        let adapter = &*self;
        run_periodic(
            &ctx,
            adapter.config.refresh_interval,
            adapter.config.timeout,
            move || adapter.execute(),
        )
        .await;
    }
}
