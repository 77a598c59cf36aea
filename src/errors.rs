// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use thiserror::Error as ThisError;

/// Errors surfaced by executors, the pool, and the coordinator.
///
/// A non-zero exit code from a wrapped tool is *not* an error; it is
/// returned as data in [`crate::exec::ExecOutput`].
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid executor configuration (e.g. empty host or user).
    /// Raised before any network I/O.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Credentials rejected by the remote host. Retrying is not useful.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A local process could not be spawned or timed out.
    #[error("process execution failed: {0}")]
    Process(String),

    /// Connection, transfer, or coordination failure.
    #[error("remote execution failed: {0}")]
    Remote(String),
}

impl Error {
    /// Wrap an internal error chain as a remote execution failure.
    /// The alternate anyhow format keeps the context chain readable.
    pub(crate) fn remote(err: impl Into<anyhow::Error>) -> Self {
        Error::Remote(format!("{:#}", err.into()))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
