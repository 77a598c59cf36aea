use anyhow::{Context, Result as AnyResult, anyhow, bail};
use async_trait::async_trait;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs as tokiofs;
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

use crate::errors::{Error, Result};
use crate::exec::FileTransport;
use crate::util::remote_path;

use super::RemoteExecutor;

impl RemoteExecutor {
    /// Bound a transfer by the context timeout, like exec channels are.
    async fn with_deadline<F, T>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = AnyResult<T>>,
    {
        match tokio::time::timeout(self.context.timeout, fut).await {
            Ok(result) => result.map_err(Error::remote),
            Err(_) => Err(Error::Remote(format!(
                "{what} timed out after {}s",
                self.context.timeout.as_secs()
            ))),
        }
    }

    /// Open an SFTP subsystem channel on the existing connection.
    async fn sftp(&self) -> AnyResult<SftpSession> {
        let guard = self.handle.lock().await;
        let handle = guard
            .as_ref()
            .ok_or_else(|| anyhow!("ssh handle lost before opening sftp"))?;
        let channel = handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream()).await?;
        Ok(sftp)
    }

    async fn ensure_remote_dir(sftp: &SftpSession, remote_dir: &str) -> AnyResult<()> {
        for cur in remote_path::dir_chain(remote_dir) {
            match sftp.metadata(&cur).await {
                Ok(meta) => {
                    if !meta.is_dir() {
                        bail!("remote path exists but is not a directory: {cur}");
                    }
                }
                Err(_) => {
                    if let Err(e) = sftp.create_dir(&cur).await {
                        // Lost a race with another session creating the same
                        // prefix is fine; anything else is not.
                        match sftp.metadata(&cur).await {
                            Ok(meta) if meta.is_dir() => {}
                            _ => {
                                return Err(e).context(format!("creating remote directory {cur}"));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn put_file(&self, sftp: &SftpSession, local: &Path, remote: &str) -> AnyResult<()> {
        if let Some(parent) = remote_path::parent(remote) {
            Self::ensure_remote_dir(sftp, parent).await?;
        }
        log::debug!("uploading {} to {}", local.display(), remote);
        let mut lfile = tokiofs::File::open(local)
            .await
            .with_context(|| format!("opening local file {}", local.display()))?;
        let flags = OpenFlags::WRITE
            .union(OpenFlags::CREATE)
            .union(OpenFlags::TRUNCATE);
        let mut rfile = sftp
            .open_with_flags(remote, flags)
            .await
            .with_context(|| format!("opening remote file {remote}"))?;
        tokio::io::copy(&mut lfile, &mut rfile)
            .await
            .with_context(|| format!("copying {} to {remote}", local.display()))?;
        rfile.flush().await?;
        rfile.shutdown().await?;
        Ok(())
    }

    async fn get_file(&self, sftp: &SftpSession, remote: &str, local: &Path) -> AnyResult<()> {
        if let Some(parent) = local.parent() {
            tokiofs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating local directory {}", parent.display()))?;
        }
        log::debug!("downloading {} to {}", remote, local.display());
        let mut rfile = sftp
            .open(remote)
            .await
            .with_context(|| format!("opening remote file {remote}"))?;
        let mut lfile = tokiofs::File::create(local)
            .await
            .with_context(|| format!("creating local file {}", local.display()))?;
        tokio::io::copy(&mut rfile, &mut lfile)
            .await
            .with_context(|| format!("copying {remote} to {}", local.display()))?;
        lfile.flush().await?;
        Ok(())
    }

    async fn put_tree(&self, sftp: &SftpSession, local_dir: &Path, remote_dir: &str) -> AnyResult<()> {
        Self::ensure_remote_dir(sftp, remote_dir).await?;
        for entry in WalkDir::new(local_dir) {
            let entry = match entry {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("skipping unreadable local entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(local_dir)
                .with_context(|| format!("computing relative path for {}", entry.path().display()))?;
            let rel_str = rel
                .components()
                .filter_map(|c| match c {
                    std::path::Component::Normal(os) => Some(os.to_string_lossy()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("/");
            let remote_file = remote_path::join(remote_dir, &rel_str);
            self.put_file(sftp, entry.path(), &remote_file).await?;
        }
        Ok(())
    }

    async fn get_tree(&self, sftp: &SftpSession, remote_dir: &str, local_dir: &Path) -> AnyResult<()> {
        let mut stack: Vec<(String, PathBuf)> = vec![(
            remote_dir.trim_end_matches('/').to_string(),
            local_dir.to_path_buf(),
        )];
        while let Some((remote_base, local_base)) = stack.pop() {
            tokiofs::create_dir_all(&local_base)
                .await
                .with_context(|| format!("creating local directory {}", local_base.display()))?;
            let entries = sftp
                .read_dir(&remote_base)
                .await
                .with_context(|| format!("listing remote directory {remote_base}"))?;
            for entry in entries {
                let name = entry.file_name();
                let remote_child = format!("{remote_base}/{name}");
                let local_child = local_base.join(&name);
                if entry.metadata().is_dir() {
                    stack.push((remote_child, local_child));
                } else {
                    self.get_file(sftp, &remote_child, &local_child).await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FileTransport for RemoteExecutor {
    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> Result<()> {
        self.ensure_connected().await?;
        let sftp = self.sftp().await.map_err(Error::remote)?;
        self.with_deadline(
            &format!("upload of {}", local_path.display()),
            self.put_file(&sftp, local_path, remote_path),
        )
        .await
    }

    async fn download_file(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        self.ensure_connected().await?;
        let sftp = self.sftp().await.map_err(Error::remote)?;
        self.with_deadline(
            &format!("download of {remote_path}"),
            self.get_file(&sftp, remote_path, local_path),
        )
        .await
    }

    async fn upload_dir(&self, local_dir: &Path, remote_dir: &str) -> Result<()> {
        self.ensure_connected().await?;
        let sftp = self.sftp().await.map_err(Error::remote)?;
        self.with_deadline(
            &format!("upload of {}", local_dir.display()),
            self.put_tree(&sftp, local_dir, remote_dir),
        )
        .await
    }

    async fn download_dir(&self, remote_dir: &str, local_dir: &Path) -> Result<()> {
        self.ensure_connected().await?;
        let sftp = self.sftp().await.map_err(Error::remote)?;
        self.with_deadline(
            &format!("download of {remote_dir}"),
            self.get_tree(&sftp, remote_dir, local_dir),
        )
        .await
    }
}
