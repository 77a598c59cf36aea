// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

//! Remote execution coordination for image/video enhancement tools.
//!
//! This crate runs enhancement tools either locally or on a remote machine
//! over SSH, transparently moving the files the remote tool needs:
//!
//! - [`exec`] defines the executor capability ([`CommandExecutor`],
//!   [`FileTransport`]) and a local subprocess implementation.
//! - [`ssh`] implements the capability over an SSH transport, plus a
//!   bounded [`ConnectionPool`] keyed by `(user, host, port)`.
//! - [`display`] wraps GUI-only commands so they can run on a headless
//!   remote host (Xvfb, XQuartz, environment fallbacks).
//! - [`coordinate`] is the end-to-end operation: stage inputs into a
//!   per-call remote session (with a content-addressed upload cache),
//!   rewrite the command to remote paths, execute, download outputs,
//!   and always tear the session down.

pub mod config;
pub mod coordinate;
pub mod display;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod ssh;
pub mod util;

pub use config::Config;
pub use coordinate::{CoordinationReport, RemoteFileCoordinator, RemoteSession};
pub use display::{DisplayCapabilities, DisplayOptions, DisplayStrategy, VirtualDisplay};
pub use errors::{Error, Result};
pub use exec::local::LocalExecutor;
pub use exec::{CommandExecutor, ExecContext, ExecOutput, FileTransport};
pub use ssh::pool::{ConnectionKey, ConnectionPool, ExecutorFactory};
pub use ssh::{RemoteExecutor, SshParams};
