// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::errors::Result;
use crate::ssh::{RemoteExecutor, SshParams};

/// Identity of a reusable transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub user: String,
    pub host: String,
    pub port: u16,
}

impl ConnectionKey {
    pub fn from_params(params: &SshParams) -> Self {
        Self {
            user: params.username.clone(),
            host: params.host.clone(),
            port: params.port,
        }
    }
}

impl std::fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

pub trait ExecutorFactory: Send + Sync {
    fn build(&self, params: &SshParams) -> Result<Arc<RemoteExecutor>>;
}

#[derive(Default)]
pub struct DefaultExecutorFactory;

impl ExecutorFactory for DefaultExecutorFactory {
    fn build(&self, params: &SshParams) -> Result<Arc<RemoteExecutor>> {
        Ok(Arc::new(RemoteExecutor::new(params.clone())?))
    }
}

#[derive(Default)]
struct Bucket {
    idle: Vec<Arc<RemoteExecutor>>,
    in_use: Vec<Arc<RemoteExecutor>>,
}

/// Bounded pool of remote executors keyed by `(user, host, port)`.
///
/// Executors connect lazily on first use, so checkout never blocks on
/// network I/O. One mutex guards the whole pool; expected concurrency is
/// low and buckets are touched briefly.
pub struct ConnectionPool {
    max_idle: usize,
    buckets: Mutex<HashMap<ConnectionKey, Bucket>>,
    factory: Arc<dyn ExecutorFactory>,
}

impl ConnectionPool {
    pub const DEFAULT_MAX_IDLE: usize = 5;

    pub fn new() -> Self {
        Self::with_factory(Self::DEFAULT_MAX_IDLE, Arc::new(DefaultExecutorFactory))
    }

    pub fn with_factory(max_idle: usize, factory: Arc<dyn ExecutorFactory>) -> Self {
        Self {
            max_idle,
            buckets: Mutex::new(HashMap::new()),
            factory,
        }
    }

    /// Pop an idle executor for the key, or build a fresh one.
    pub async fn checkout(&self, params: &SshParams) -> Result<Arc<RemoteExecutor>> {
        let key = ConnectionKey::from_params(params);
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry(key.clone()).or_default();
        let executor = match bucket.idle.pop() {
            Some(existing) => {
                log::debug!("reusing pooled connection for {key}");
                existing
            }
            None => self.factory.build(params)?,
        };
        bucket.in_use.push(executor.clone());
        Ok(executor)
    }

    /// Return an executor to its bucket. Above the idle cap the
    /// connection is closed instead of pooled. Returning an executor the
    /// pool does not know about is a no-op.
    pub async fn checkin(&self, executor: Arc<RemoteExecutor>) {
        let key = ConnectionKey::from_params(executor.params());
        let excess = {
            let mut buckets = self.buckets.lock().await;
            let Some(bucket) = buckets.get_mut(&key) else {
                return;
            };
            let Some(pos) = bucket
                .in_use
                .iter()
                .position(|e| Arc::ptr_eq(e, &executor))
            else {
                return;
            };
            bucket.in_use.remove(pos);
            if bucket.idle.len() < self.max_idle {
                bucket.idle.push(executor);
                None
            } else {
                log::debug!("idle cap reached for {key}, closing excess connection");
                Some(executor)
            }
        };
        if let Some(executor) = excess {
            executor.close().await;
        }
    }

    /// Number of idle executors currently pooled for the key.
    pub async fn idle_count(&self, key: &ConnectionKey) -> usize {
        let buckets = self.buckets.lock().await;
        buckets.get(key).map(|b| b.idle.len()).unwrap_or(0)
    }

    /// Close every pooled and checked-out connection.
    pub async fn close_all(&self) {
        let executors: Vec<Arc<RemoteExecutor>> = {
            let mut buckets = self.buckets.lock().await;
            buckets
                .drain()
                .flat_map(|(_, bucket)| bucket.idle.into_iter().chain(bucket.in_use))
                .collect()
        };
        join_all(executors.iter().map(|e| e.close())).await;
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}
