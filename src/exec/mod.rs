// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::errors::Result;

pub mod local;

/// Result of running a command to completion. A non-zero exit code is a
/// normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Construction-time context for an executor: working directory and
/// environment overrides, the default timeout, and a dry-run switch that
/// logs commands instead of running them.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub working_dir: Option<String>,
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
    pub dry_run: bool,
}

impl Default for ExecContext {
    fn default() -> Self {
        Self {
            working_dir: None,
            env: Vec::new(),
            timeout: Duration::from_secs(3600),
            dry_run: false,
        }
    }
}

/// Command execution boundary, polymorphic over local and SSH transports.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` to completion, optionally feeding `input` to stdin.
    /// `timeout` overrides the context default. Fails only when the
    /// underlying mechanism cannot run the command at all; the wrapped
    /// tool's exit status comes back in [`ExecOutput`].
    async fn execute(
        &self,
        command: &[String],
        input: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<ExecOutput>;

    /// Cheap liveness probe (runs `echo test`).
    async fn is_available(&self) -> bool;

    /// Diagnostic key/value pairs. Not used for control flow.
    fn info(&self) -> HashMap<String, String>;
}

/// File transfer boundary. Kept separate from [`CommandExecutor`] so the
/// local executor does not have to stub transfers it never performs.
#[async_trait]
pub trait FileTransport: Send + Sync {
    /// Copy a single local file to `remote_path`, creating the remote
    /// parent directories first.
    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> Result<()>;

    /// Copy a single remote file to `local_path`, creating the local
    /// parent directories first.
    async fn download_file(&self, remote_path: &str, local_path: &Path) -> Result<()>;

    /// Recursively copy a local directory tree under `remote_dir`.
    async fn upload_dir(&self, local_dir: &Path, remote_dir: &str) -> Result<()>;

    /// Recursively copy a remote directory tree under `local_dir`.
    async fn download_dir(&self, remote_dir: &str, local_dir: &Path) -> Result<()>;
}
