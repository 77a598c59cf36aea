// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::errors::{Error, Result};
use crate::exec::{CommandExecutor, ExecContext, ExecOutput};

/// Runs commands as local subprocesses.
pub struct LocalExecutor {
    context: ExecContext,
}

impl LocalExecutor {
    pub fn new(context: ExecContext) -> Self {
        Self { context }
    }

    async fn run(
        &self,
        command: &[String],
        input: Option<&str>,
        timeout: Duration,
    ) -> Result<ExecOutput> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Process("empty command".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .kill_on_drop(true);
        if let Some(dir) = &self.context.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.context.env {
            cmd.env(key, value);
        }

        let start = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| Error::Process(format!("failed to spawn {program}: {e}")))?;

        if let Some(data) = input {
            if let Some(mut stdin) = child.stdin.take() {
                if let Err(e) = stdin.write_all(data.as_bytes()).await {
                    log::debug!("failed to send input to {program}: {e}");
                }
            }
        }

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => {
                result.map_err(|e| Error::Process(format!("waiting for {program}: {e}")))?
            }
            Err(_) => {
                return Err(Error::Process(format!(
                    "{program} timed out after {}s",
                    timeout.as_secs()
                )));
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        log::debug!(
            "local command {} finished in {:.2}s with exit code {}",
            program,
            start.elapsed().as_secs_f64(),
            exit_code
        );

        Ok(ExecOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait]
impl CommandExecutor for LocalExecutor {
    async fn execute(
        &self,
        command: &[String],
        input: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<ExecOutput> {
        if self.context.dry_run {
            log::info!("dry run (local): {}", command.join(" "));
            return Ok(ExecOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            });
        }
        self.run(command, input, timeout.unwrap_or(self.context.timeout))
            .await
    }

    async fn is_available(&self) -> bool {
        let probe = vec!["echo".to_string(), "test".to_string()];
        match self.run(&probe, None, Duration::from_secs(10)).await {
            Ok(out) => out.success(),
            Err(e) => {
                log::debug!("local execution not available: {e}");
                false
            }
        }
    }

    fn info(&self) -> HashMap<String, String> {
        HashMap::from([
            ("type".to_string(), "local".to_string()),
            ("working_dir".to_string(), self.context.working_dir.clone().unwrap_or_default()),
            ("dry_run".to_string(), self.context.dry_run.to_string()),
        ])
    }
}
