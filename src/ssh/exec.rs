use russh::ChannelMsg;
use std::time::Duration;

use crate::errors::{Error, Result};
use crate::exec::{ExecContext, ExecOutput};
use crate::util::shell::{join_escaped, sh_escape};

use super::RemoteExecutor;

/// Build the single shell command string sent over the exec channel.
/// Every token is quoted individually; env and working-directory
/// overrides from the context become `env K=V` and `cd <dir> &&` prefixes.
pub(crate) fn build_command_string(command: &[String], ctx: &ExecContext) -> String {
    let mut cmd = join_escaped(command);
    if !ctx.env.is_empty() {
        let assignments = ctx
            .env
            .iter()
            .map(|(key, value)| format!("{}={}", key, sh_escape(value)))
            .collect::<Vec<_>>()
            .join(" ");
        cmd = format!("env {assignments} {cmd}");
    }
    if let Some(dir) = &ctx.working_dir {
        cmd = format!("cd {} && {}", sh_escape(dir), cmd);
    }
    cmd
}

/// Accumulates channel messages into the final command result.
#[derive(Default)]
struct Capture {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: i32,
}

impl Capture {
    /// Returns true once the channel has closed.
    fn absorb(&mut self, msg: &ChannelMsg) -> bool {
        match msg {
            ChannelMsg::Data { data } => {
                self.stdout.extend_from_slice(data);
                false
            }
            ChannelMsg::ExtendedData { data, ext: 1 } => {
                self.stderr.extend_from_slice(data);
                false
            }
            ChannelMsg::ExitStatus { exit_status } => {
                self.exit_code = *exit_status as i32;
                false
            }
            ChannelMsg::Close => true,
            _ => false,
        }
    }

    fn into_output(self) -> ExecOutput {
        ExecOutput {
            exit_code: self.exit_code,
            stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
        }
    }
}

impl RemoteExecutor {
    /// Run an already-escaped command string on the remote host,
    /// capturing stdout, stderr, and the exit status. Connects lazily.
    pub(crate) async fn exec_capture(
        &self,
        command_str: &str,
        input: Option<&str>,
        timeout: Duration,
    ) -> Result<ExecOutput> {
        self.ensure_connected().await?;

        // Hold the handle lock for the duration of the command; only one
        // command runs on the connection at a time.
        let guard = self.handle.lock().await;
        let handle = guard
            .as_ref()
            .ok_or_else(|| Error::Remote("ssh handle lost after connect".to_string()))?;

        let mut chan = handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Remote(format!("opening exec channel: {e}")))?;
        chan.exec(true, command_str)
            .await
            .map_err(|e| Error::Remote(format!("exec request failed: {e}")))?;

        if let Some(data) = input {
            if let Err(e) = chan.data(data.as_bytes()).await {
                log::debug!("failed to send input to remote command: {e}");
            }
        }
        let _ = chan.eof().await;

        let mut capture = Capture::default();
        let drained = async {
            while let Some(msg) = chan.wait().await {
                if capture.absorb(&msg) {
                    break;
                }
            }
        };
        let timed_out = tokio::time::timeout(timeout, drained).await.is_err();

        let _ = chan.close().await;
        if timed_out {
            return Err(Error::Remote(format!(
                "remote command timed out after {}s",
                timeout.as_secs()
            )));
        }
        Ok(capture.into_output())
    }
}
