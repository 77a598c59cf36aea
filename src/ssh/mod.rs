// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::errors::{Error, Result};
use crate::exec::{CommandExecutor, ExecContext, ExecOutput};

mod auth;
mod exec;
mod sftp;
pub mod pool;

/// Minimal russh client handler. We rely on default implementations.
/// TODO: add actual server key verification
#[derive(Clone, Debug, Default)]
struct ClientHandler;

impl russh::client::Handler for ClientHandler {
    type Error = anyhow::Error;
    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Parameters for establishing the SSH connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SshParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Private key file. When absent, password auth is tried if a
    /// password is set, otherwise the default SSH agent.
    pub identity_path: Option<PathBuf>,
    pub password: Option<String>,
    pub connect_timeout_secs: u64,
    /// Send transport keepalives to keep long connections healthy.
    pub keepalive_secs: u64,
}

impl SshParams {
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            identity_path: None,
            password: None,
            connect_timeout_secs: 30,
            keepalive_secs: 15,
        }
    }
}

/// Connection test results for diagnostics.
#[derive(Debug, Clone)]
pub struct ConnectionDiagnostics {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub connected: bool,
    pub latency_ms: Option<f64>,
    pub error: Option<String>,
    pub server: HashMap<String, String>,
}

/// Executes commands on a remote machine over a single lazily-established
/// SSH connection, with SFTP transfers for file staging.
pub struct RemoteExecutor {
    params: SshParams,
    context: ExecContext,
    config: Arc<russh::client::Config>,
    // The active handle, protected by a mutex because command use is serialized
    handle: Arc<Mutex<Option<russh::client::Handle<ClientHandler>>>>,
}

impl std::fmt::Debug for RemoteExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteExecutor")
            .field("params", &self.params)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl RemoteExecutor {
    pub fn new(params: SshParams) -> Result<Self> {
        Self::with_context(params, ExecContext::default())
    }

    /// Fails fast with a configuration error when host or user is empty;
    /// no network I/O happens until the first command or transfer.
    pub fn with_context(params: SshParams, context: ExecContext) -> Result<Self> {
        if params.host.trim().is_empty() {
            return Err(Error::Config("remote host is required".to_string()));
        }
        if params.username.trim().is_empty() {
            return Err(Error::Config("remote user is required".to_string()));
        }
        let cfg = russh::client::Config {
            keepalive_interval: Some(Duration::from_secs(params.keepalive_secs)),
            channel_buffer_size: 64,
            window_size: 1024 * 1024,
            ..Default::default()
        };
        Ok(Self {
            params,
            context,
            config: Arc::new(cfg),
            handle: Arc::new(Mutex::new(None)),
        })
    }

    pub fn params(&self) -> &SshParams {
        &self.params
    }

    pub async fn needs_connect(&self) -> bool {
        let guard = self.handle.lock().await;
        match guard.as_ref() {
            None => true,
            Some(h) if h.is_closed() => true,
            Some(_) => false,
        }
    }

    /// Drop the connection. Safe to call repeatedly; a closed executor
    /// reconnects on its next use.
    pub async fn close(&self) {
        let mut guard = self.handle.lock().await;
        if guard.take().is_some() {
            log::debug!(
                "closed connection to {}@{}:{}",
                self.params.username,
                self.params.host,
                self.params.port
            );
        }
    }

    /// Connect, authenticate, and gather basic server facts. The
    /// established connection is kept for reuse.
    pub async fn test_connection(&self) -> ConnectionDiagnostics {
        let mut diag = ConnectionDiagnostics {
            host: self.params.host.clone(),
            port: self.params.port,
            user: self.params.username.clone(),
            connected: false,
            latency_ms: None,
            error: None,
            server: HashMap::new(),
        };

        let start = Instant::now();
        if let Err(e) = self.ensure_connected().await {
            diag.error = Some(e.to_string());
            return diag;
        }
        diag.connected = true;
        diag.latency_ms = Some(start.elapsed().as_secs_f64() * 1000.0);

        for (label, probe) in [("uname", "uname -a"), ("user", "whoami"), ("home", "pwd")] {
            match self.exec_capture(probe, None, Duration::from_secs(10)).await {
                Ok(out) if out.success() => {
                    diag.server.insert(label.to_string(), out.stdout.trim().to_string());
                }
                Ok(out) => {
                    log::debug!("server probe `{probe}` exited with {}", out.exit_code);
                }
                Err(e) => {
                    log::debug!("server probe `{probe}` failed: {e}");
                }
            }
        }
        diag
    }
}

#[async_trait]
impl CommandExecutor for RemoteExecutor {
    async fn execute(
        &self,
        command: &[String],
        input: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<ExecOutput> {
        if self.context.dry_run {
            log::info!(
                "dry run (remote {}): {}",
                self.params.host,
                command.join(" ")
            );
            return Ok(ExecOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            });
        }
        let command_str = exec::build_command_string(command, &self.context);
        log::debug!("executing remotely: {command_str}");
        self.exec_capture(&command_str, input, timeout.unwrap_or(self.context.timeout))
            .await
    }

    async fn is_available(&self) -> bool {
        let probe = exec::build_command_string(
            &["echo".to_string(), "test".to_string()],
            &ExecContext::default(),
        );
        match self.exec_capture(&probe, None, Duration::from_secs(15)).await {
            Ok(out) => out.success(),
            Err(e) => {
                log::debug!("remote execution not available: {e}");
                false
            }
        }
    }

    fn info(&self) -> HashMap<String, String> {
        // A held lock means a command is in flight on a live connection.
        let connected = match self.handle.try_lock() {
            Ok(guard) => guard.as_ref().is_some_and(|h| !h.is_closed()),
            Err(_) => true,
        };
        let auth = if self.params.identity_path.is_some() {
            "key"
        } else if self.params.password.is_some() {
            "password"
        } else {
            "agent"
        };
        HashMap::from([
            ("type".to_string(), "remote".to_string()),
            ("host".to_string(), self.params.host.clone()),
            ("port".to_string(), self.params.port.to_string()),
            ("user".to_string(), self.params.username.clone()),
            ("connected".to_string(), connected.to_string()),
            ("auth".to_string(), auth.to_string()),
        ])
    }
}
