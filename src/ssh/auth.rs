// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use russh::client::AuthResult;
use russh::keys::PrivateKeyWithHashAlg;
use russh::keys::agent::client::AgentClient;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{Error, Result};

use super::{ClientHandler, RemoteExecutor};

enum AuthOutcome {
    Accepted,
    Rejected,
}

fn auth_outcome(result: AuthResult) -> AuthOutcome {
    match result {
        AuthResult::Success => AuthOutcome::Accepted,
        AuthResult::Failure { .. } => AuthOutcome::Rejected,
    }
}

impl RemoteExecutor {
    /// Ensure we hold a connected, authenticated handle. A handle whose
    /// transport has closed underneath us is dropped and replaced.
    pub(crate) async fn ensure_connected(&self) -> Result<()> {
        let mut guard = self.handle.lock().await;
        let needs_connect = match guard.as_ref() {
            None => true,
            Some(h) if h.is_closed() => true,
            Some(_) => false,
        };
        if !needs_connect {
            return Ok(());
        }

        let host = &self.params.host;
        let port = self.params.port;
        log::info!(
            "establishing connection with {}@{}:{}",
            self.params.username,
            host,
            port
        );

        let connect = russh::client::connect(
            self.config.clone(),
            (host.as_str(), port),
            ClientHandler,
        );
        let mut handle =
            tokio::time::timeout(Duration::from_secs(self.params.connect_timeout_secs), connect)
                .await
                .map_err(|_| {
                    Error::Remote(format!(
                        "connection to {host}:{port} timed out after {}s",
                        self.params.connect_timeout_secs
                    ))
                })?
                .map_err(|e| Error::Remote(format!("ssh connection to {host}:{port} failed: {e:#}")))?;

        self.authenticate(&mut handle).await?;
        log::info!("authenticated as {} on {}", self.params.username, host);
        *guard = Some(handle);
        Ok(())
    }

    async fn authenticate(&self, handle: &mut russh::client::Handle<ClientHandler>) -> Result<()> {
        let user = self.params.username.clone();
        let host = &self.params.host;

        if let Some(path) = &self.params.identity_path {
            let key = russh::keys::load_secret_key(path, None).map_err(|e| {
                Error::Remote(format!("failed to load private key {}: {e}", path.display()))
            })?;
            // Prefer SHA-256 for RSA if applicable (ignored for non-RSA keys)
            let hash = handle
                .best_supported_rsa_hash()
                .await
                .map_err(|e| Error::Remote(format!("negotiating rsa hash: {e}")))?
                .flatten();
            let pk = PrivateKeyWithHashAlg::new(Arc::new(key), hash);
            let result = handle
                .authenticate_publickey(user.clone(), pk)
                .await
                .map_err(|e| Error::Remote(format!("publickey auth request failed: {e}")))?;
            return match auth_outcome(result) {
                AuthOutcome::Accepted => Ok(()),
                AuthOutcome::Rejected => Err(Error::Authentication(format!(
                    "public key rejected for {user}@{host}"
                ))),
            };
        }

        if let Some(password) = &self.params.password {
            let result = handle
                .authenticate_password(user.clone(), password.clone())
                .await
                .map_err(|e| Error::Remote(format!("password auth request failed: {e}")))?;
            return match auth_outcome(result) {
                AuthOutcome::Accepted => Ok(()),
                AuthOutcome::Rejected => Err(Error::Authentication(format!(
                    "password rejected for {user}@{host}"
                ))),
            };
        }

        self.authenticate_with_agent(handle).await
    }

    /// Offer every identity held by the default SSH agent until one is
    /// accepted.
    async fn authenticate_with_agent(
        &self,
        handle: &mut russh::client::Handle<ClientHandler>,
    ) -> Result<()> {
        let user = self.params.username.clone();
        let host = &self.params.host;

        let mut agent = AgentClient::connect_env()
            .await
            .map_err(|e| Error::Remote(format!("ssh agent unavailable: {e}")))?;
        let identities = agent
            .request_identities()
            .await
            .map_err(|e| Error::Remote(format!("listing ssh agent identities: {e}")))?;
        if identities.is_empty() {
            return Err(Error::Authentication(format!(
                "ssh agent holds no identities for {user}@{host}"
            )));
        }

        let hash = handle
            .best_supported_rsa_hash()
            .await
            .map_err(|e| Error::Remote(format!("negotiating rsa hash: {e}")))?
            .flatten();

        for key in identities {
            match handle
                .authenticate_publickey_with(user.clone(), key, hash, &mut agent)
                .await
            {
                Ok(result) => {
                    if let AuthOutcome::Accepted = auth_outcome(result) {
                        return Ok(());
                    }
                }
                Err(e) => {
                    log::debug!("agent identity attempt failed: {e}");
                }
            }
        }
        Err(Error::Authentication(format!(
            "all ssh agent identities rejected for {user}@{host}"
        )))
    }
}
