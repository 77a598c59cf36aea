// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

//! Transparent file coordination for remote execution: upload inputs,
//! translate paths, execute, download outputs, always clean up.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use crate::display::VirtualDisplay;
use crate::errors::{Error, Result};
use crate::exec::{CommandExecutor, ExecOutput, FileTransport};
use crate::util::shell::sh_escape;
use crate::util::{hash, random, remote_path};

mod detect;
mod translate;

pub use detect::{DetectedFiles, detect_files};
pub use translate::translate_command;

/// Remote state created for one `execute_with_files` call. Owned by a
/// single coordination call; never shared.
#[derive(Debug, Clone)]
pub struct RemoteSession {
    pub session_id: String,
    pub remote_base_dir: String,
    pub local_to_remote: HashMap<String, String>,
    pub remote_to_local: HashMap<String, String>,
    pub created_at: SystemTime,
}

impl RemoteSession {
    fn new(session_id: String, remote_base_dir: String) -> Self {
        Self {
            session_id,
            remote_base_dir,
            local_to_remote: HashMap::new(),
            remote_to_local: HashMap::new(),
            created_at: SystemTime::now(),
        }
    }

    pub fn inputs_dir(&self) -> String {
        format!("{}/inputs", self.remote_base_dir)
    }

    pub fn outputs_dir(&self) -> String {
        format!("{}/outputs", self.remote_base_dir)
    }

    /// Record a translation in both directions, keeping the mapping
    /// bijective within the session.
    fn map(&mut self, local: String, remote: String) {
        self.local_to_remote.insert(local.clone(), remote.clone());
        self.remote_to_local.insert(remote, local);
    }
}

/// Per-step results of the coordination self-test.
#[derive(Debug, Clone, Default)]
pub struct CoordinationReport {
    pub session_creation: bool,
    pub file_roundtrip: bool,
    pub command_execution: bool,
    pub cleanup: bool,
    pub error: Option<String>,
}

impl CoordinationReport {
    pub fn passed(&self) -> bool {
        self.session_creation
            && self.file_roundtrip
            && self.command_execution
            && self.cleanup
            && self.error.is_none()
    }
}

pub type DetectFn = Arc<dyn Fn(&[String]) -> DetectedFiles + Send + Sync>;
pub type HashFn = Arc<dyn Fn(&Path) -> anyhow::Result<String> + Send + Sync>;

/// Coordinates file transfers and path translation around one remote
/// command execution.
///
/// The detector and hasher are injectable so tests can substitute fakes
/// without touching internals; the defaults are [`detect_files`] and a
/// streaming SHA-256.
pub struct RemoteFileCoordinator<E> {
    executor: Arc<E>,
    base_dir: String,
    display: Option<VirtualDisplay>,
    detect: DetectFn,
    hash: HashFn,
}

impl<E: CommandExecutor + FileTransport> RemoteFileCoordinator<E> {
    pub fn new(executor: Arc<E>, base_dir: impl Into<String>) -> Self {
        Self {
            executor,
            base_dir: base_dir.into(),
            display: None,
            detect: Arc::new(|command| detect_files(command)),
            hash: Arc::new(|path| hash::sha256_file(path)),
        }
    }

    /// Attach a virtual display manager; GUI commands get wrapped before
    /// execution.
    pub fn with_display(mut self, display: VirtualDisplay) -> Self {
        self.display = Some(display);
        self
    }

    pub fn with_detector(mut self, detect: DetectFn) -> Self {
        self.detect = detect;
        self
    }

    pub fn with_hasher(mut self, hash: HashFn) -> Self {
        self.hash = hash;
        self
    }

    fn cache_dir(&self) -> String {
        format!("{}/cache", self.base_dir)
    }

    /// Execute `command` with automatic file coordination.
    ///
    /// Inputs are uploaded (through the content-addressed cache), paths
    /// rewritten, the command executed remotely, and outputs downloaded
    /// on success. The session directory is removed no matter which step
    /// failed. The wrapped tool's exit code comes back as data.
    pub async fn execute_with_files(&self, command: &[String]) -> Result<ExecOutput> {
        let mut session = self.create_session().await.map_err(coordination_error)?;
        log::debug!("starting remote session {}", session.session_id);

        let result = self.run_in_session(&mut session, command).await;
        self.cleanup_session(&session).await;

        result.map_err(coordination_error)
    }

    async fn run_in_session(
        &self,
        session: &mut RemoteSession,
        command: &[String],
    ) -> Result<ExecOutput> {
        let detected = (self.detect)(command);
        log::debug!(
            "detected {} input files, {} output files",
            detected.inputs.len(),
            detected.outputs.len()
        );

        for local in &detected.inputs {
            let remote = self.upload_input(local, session).await?;
            session.map(local.clone(), remote);
        }
        for local in &detected.outputs {
            let basename = local_basename(local)?;
            let remote = remote_path::join(&session.outputs_dir(), &basename);
            session.map(local.clone(), remote);
        }

        let translated = translate_command(command, &session.local_to_remote);
        log::debug!("translated command: {}", translated.join(" "));
        let translated = match &self.display {
            Some(display) => display.wrap_command(self.executor.as_ref(), &translated).await,
            None => translated,
        };

        let output = self.executor.execute(&translated, None, None).await?;
        log::debug!("remote execution completed with exit code {}", output.exit_code);

        if output.success() {
            self.download_outputs(&detected.outputs, session).await?;
        } else {
            log::warn!("remote execution failed, skipping output download");
        }
        Ok(output)
    }

    /// Create `{base}/sessions/{id}/{inputs,outputs}` remotely.
    async fn create_session(&self) -> Result<RemoteSession> {
        let session_id = random::session_id();
        let remote_dir = format!("{}/sessions/{}", self.base_dir, session_id);
        self.exec_ok(&[
            "mkdir".to_string(),
            "-p".to_string(),
            format!("{remote_dir}/inputs"),
            format!("{remote_dir}/outputs"),
        ])
        .await?;
        log::debug!("created remote session directory {remote_dir}");
        Ok(RemoteSession::new(session_id, remote_dir))
    }

    /// Upload one input, reusing the content-addressed cache when the
    /// same bytes were staged before (under any filename or session).
    async fn upload_input(&self, local: &str, session: &RemoteSession) -> Result<String> {
        let local_path = Path::new(local);
        let basename = local_basename(local)?;

        // Hash or cache-probe failures downgrade to a plain upload.
        let digest = match (self.hash)(local_path) {
            Ok(d) => Some(d),
            Err(e) => {
                log::debug!("cache lookup skipped for {local}: {e:#}");
                None
            }
        };
        if let Some(d) = &digest {
            let cache_path = format!("{}/{}/{}", self.cache_dir(), d, basename);
            match self.remote_file_exists(&cache_path).await {
                Ok(true) => {
                    log::debug!("using cached upload {cache_path}");
                    if is_executable(local_path) {
                        self.best_effort_chmod(&cache_path).await;
                    }
                    return Ok(cache_path);
                }
                Ok(false) => {}
                Err(e) => log::debug!("cache check failed for {local}: {e}"),
            }
        }

        let remote = remote_path::join(&session.inputs_dir(), &basename);
        self.executor.upload_file(local_path, &remote).await?;
        if is_executable(local_path) {
            self.best_effort_chmod(&remote).await;
        }
        if let Some(d) = &digest {
            self.populate_cache(&remote, d, &basename, is_executable(local_path))
                .await;
        }
        Ok(remote)
    }

    /// Copy a freshly-uploaded file into the cache for future sessions.
    /// Failure is logged, never fatal.
    async fn populate_cache(&self, remote: &str, digest: &str, basename: &str, executable: bool) {
        let cache_dir = format!("{}/{}", self.cache_dir(), digest);
        let cache_path = format!("{cache_dir}/{basename}");
        let steps: [Vec<String>; 2] = [
            vec!["mkdir".to_string(), "-p".to_string(), cache_dir],
            vec!["cp".to_string(), remote.to_string(), cache_path.clone()],
        ];
        for step in steps {
            if let Err(e) = self.exec_ok(&step).await {
                log::debug!("failed to cache {remote}: {e}");
                return;
            }
        }
        if executable {
            self.best_effort_chmod(&cache_path).await;
        }
        log::debug!("cached upload at {cache_path}");
    }

    /// Download detected outputs whose remote counterpart exists; a
    /// missing output is a warning (the exit code already tells the
    /// caller how the tool fared), a failed transfer is an error.
    async fn download_outputs(&self, outputs: &[String], session: &RemoteSession) -> Result<()> {
        for local in outputs {
            let Some(remote) = session.local_to_remote.get(local) else {
                continue;
            };
            if self.remote_file_exists(remote).await? {
                self.executor.download_file(remote, Path::new(local)).await?;
            } else if self.remote_dir_exists(remote).await? {
                log::debug!("remote output {remote} is a directory");
                self.executor.download_dir(remote, Path::new(local)).await?;
            } else {
                log::warn!("output not found on remote: {remote}");
            }
        }
        Ok(())
    }

    /// Remove the session directory. Runs in every branch after session
    /// creation; failures are warnings because the work itself already
    /// finished one way or the other.
    async fn cleanup_session(&self, session: &RemoteSession) -> bool {
        log::debug!("cleaning up remote session {}", session.session_id);
        let rm = [
            "rm".to_string(),
            "-rf".to_string(),
            session.remote_base_dir.clone(),
        ];
        match self.exec_ok(&rm).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("failed to clean up session {}: {e}", session.session_id);
                false
            }
        }
    }

    /// Smoke-test session creation, a trivial remote write/read round
    /// trip, and cleanup, without any real product binary.
    pub async fn test_coordination(&self) -> CoordinationReport {
        let mut report = CoordinationReport::default();

        let session = match self.create_session().await {
            Ok(s) => s,
            Err(e) => {
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.session_creation = true;

        let probe = format!("{}/check.txt", session.remote_base_dir);
        let write = vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("echo coordination-check > {}", sh_escape(&probe)),
        ];
        match self.executor.execute(&write, None, None).await {
            Ok(out) => report.file_roundtrip = out.success(),
            Err(e) => report.error = Some(e.to_string()),
        }

        if report.error.is_none() {
            let read = vec!["cat".to_string(), probe];
            match self.executor.execute(&read, None, None).await {
                Ok(out) => {
                    report.command_execution =
                        out.success() && out.stdout.contains("coordination-check");
                }
                Err(e) => report.error = Some(e.to_string()),
            }
        }

        report.cleanup = self.cleanup_session(&session).await;
        report
    }

    async fn remote_file_exists(&self, remote: &str) -> Result<bool> {
        let probe = ["test".to_string(), "-f".to_string(), remote.to_string()];
        Ok(self.executor.execute(&probe, None, None).await?.success())
    }

    async fn remote_dir_exists(&self, remote: &str) -> Result<bool> {
        let probe = ["test".to_string(), "-d".to_string(), remote.to_string()];
        Ok(self.executor.execute(&probe, None, None).await?.success())
    }

    async fn best_effort_chmod(&self, remote: &str) {
        let chmod = [
            "chmod".to_string(),
            "+x".to_string(),
            remote.to_string(),
        ];
        if let Err(e) = self.exec_ok(&chmod).await {
            log::debug!("failed to set execute bit on {remote}: {e}");
        }
    }

    /// Run a plumbing command and require exit 0.
    async fn exec_ok(&self, argv: &[String]) -> Result<()> {
        let out = self.executor.execute(argv, None, None).await?;
        if !out.success() {
            return Err(Error::Remote(format!(
                "`{}` exited with {}: {}",
                argv.join(" "),
                out.exit_code,
                out.stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Authentication failures keep their identity; everything else becomes
/// a single coordination-level error.
fn coordination_error(err: Error) -> Error {
    match err {
        Error::Authentication(_) => err,
        Error::Remote(msg) => {
            log::error!("remote coordination failed: {msg}");
            Error::Remote(format!("remote coordination failed: {msg}"))
        }
        other => {
            let msg = other.to_string();
            log::error!("remote coordination failed: {msg}");
            Error::Remote(format!("remote coordination failed: {msg}"))
        }
    }
}

fn local_basename(local: &str) -> Result<String> {
    Path::new(local)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Remote(format!("path {local} has no file name")))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::{CoordinationReport, RemoteFileCoordinator};
    use crate::errors::{Error, Result};
    use crate::exec::{CommandExecutor, ExecOutput, FileTransport};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::tempdir;

    const BASE: &str = "/tmp/topyaz";

    /// In-memory stand-in for the remote host: answers the plumbing
    /// commands the coordinator issues and records every interaction.
    #[derive(Default)]
    struct FakeRemote {
        calls: Mutex<Vec<Vec<String>>>,
        uploads: Mutex<Vec<(PathBuf, String)>>,
        downloads: Mutex<Vec<(String, PathBuf)>>,
        files: Mutex<HashMap<String, Vec<u8>>>,
        dirs: Mutex<HashSet<String>>,
        tool_exit_code: i32,
        create_outputs: bool,
        fail_uploads: bool,
        auth_failure: bool,
    }

    impl FakeRemote {
        fn new() -> Self {
            Self {
                create_outputs: true,
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }

        fn upload_count(&self) -> usize {
            self.uploads.lock().unwrap().len()
        }

        fn download_count(&self) -> usize {
            self.downloads.lock().unwrap().len()
        }

        fn rm_calls(&self) -> Vec<Vec<String>> {
            self.calls()
                .into_iter()
                .filter(|c| c.first().map(String::as_str) == Some("rm"))
                .collect()
        }

        fn ok() -> Result<ExecOutput> {
            Ok(ExecOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        }

        fn status(code: i32) -> Result<ExecOutput> {
            Ok(ExecOutput {
                exit_code: code,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    #[async_trait]
    impl CommandExecutor for FakeRemote {
        async fn execute(
            &self,
            command: &[String],
            _input: Option<&str>,
            _timeout: Option<Duration>,
        ) -> Result<ExecOutput> {
            if self.auth_failure {
                return Err(Error::Authentication("key rejected".to_string()));
            }
            self.calls.lock().unwrap().push(command.to_vec());
            let program = command.first().map(String::as_str).unwrap_or("");
            match program {
                "mkdir" => {
                    let mut dirs = self.dirs.lock().unwrap();
                    for arg in &command[1..] {
                        if arg != "-p" {
                            dirs.insert(arg.clone());
                        }
                    }
                    Self::ok()
                }
                "test" => {
                    let exists = match command[1].as_str() {
                        "-f" => self.files.lock().unwrap().contains_key(&command[2]),
                        "-d" => self.dirs.lock().unwrap().contains(&command[2]),
                        _ => false,
                    };
                    Self::status(if exists { 0 } else { 1 })
                }
                "cp" => {
                    let mut files = self.files.lock().unwrap();
                    match files.get(&command[1]).cloned() {
                        Some(bytes) => {
                            files.insert(command[2].clone(), bytes);
                            Self::ok()
                        }
                        None => Self::status(1),
                    }
                }
                "chmod" => Self::ok(),
                "rm" => {
                    let target = command.last().unwrap().clone();
                    self.files
                        .lock()
                        .unwrap()
                        .retain(|path, _| !path.starts_with(&target));
                    self.dirs
                        .lock()
                        .unwrap()
                        .retain(|path| !path.starts_with(&target));
                    Self::ok()
                }
                "sh" => {
                    // `echo coordination-check > '<path>'`
                    let script = command.last().unwrap();
                    if let Some(redirect) = script.split("> ").nth(1) {
                        let path = redirect.trim().trim_matches('\'').to_string();
                        self.files
                            .lock()
                            .unwrap()
                            .insert(path, b"coordination-check\n".to_vec());
                    }
                    Self::ok()
                }
                "cat" => match self.files.lock().unwrap().get(&command[1]) {
                    Some(bytes) => Ok(ExecOutput {
                        exit_code: 0,
                        stdout: String::from_utf8_lossy(bytes).into_owned(),
                        stderr: String::new(),
                    }),
                    None => Self::status(1),
                },
                _ => {
                    if self.tool_exit_code == 0 && self.create_outputs {
                        let mut files = self.files.lock().unwrap();
                        for arg in command {
                            if arg.contains("/outputs/") {
                                files.insert(arg.clone(), b"processed".to_vec());
                            }
                        }
                    }
                    Self::status(self.tool_exit_code)
                }
            }
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn info(&self) -> HashMap<String, String> {
            HashMap::new()
        }
    }

    #[async_trait]
    impl FileTransport for FakeRemote {
        async fn upload_file(&self, local_path: &Path, remote_path: &str) -> Result<()> {
            if self.fail_uploads {
                return Err(Error::Remote("upload failed (simulated)".to_string()));
            }
            let bytes = fs::read(local_path)
                .map_err(|e| Error::Remote(format!("reading {}: {e}", local_path.display())))?;
            self.files
                .lock()
                .unwrap()
                .insert(remote_path.to_string(), bytes);
            self.uploads
                .lock()
                .unwrap()
                .push((local_path.to_path_buf(), remote_path.to_string()));
            Ok(())
        }

        async fn download_file(&self, remote_path: &str, local_path: &Path) -> Result<()> {
            let bytes = self
                .files
                .lock()
                .unwrap()
                .get(remote_path)
                .cloned()
                .ok_or_else(|| Error::Remote(format!("no remote file {remote_path}")))?;
            if let Some(parent) = local_path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(local_path, bytes).unwrap();
            self.downloads
                .lock()
                .unwrap()
                .push((remote_path.to_string(), local_path.to_path_buf()));
            Ok(())
        }

        async fn upload_dir(&self, _local_dir: &Path, _remote_dir: &str) -> Result<()> {
            Ok(())
        }

        async fn download_dir(&self, remote_dir: &str, local_dir: &Path) -> Result<()> {
            let files = self.files.lock().unwrap().clone();
            for (remote, bytes) in files {
                if let Some(rel) = remote.strip_prefix(&format!("{remote_dir}/")) {
                    let local = local_dir.join(rel);
                    fs::create_dir_all(local.parent().unwrap()).unwrap();
                    fs::write(local, bytes).unwrap();
                }
            }
            Ok(())
        }
    }

    fn coordinator(fake: Arc<FakeRemote>) -> RemoteFileCoordinator<FakeRemote> {
        RemoteFileCoordinator::new(fake, BASE)
    }

    fn cmd(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn round_trip_translates_paths_and_downloads_outputs() {
        let tmp = tempdir().unwrap();
        let input = tmp.path().join("in.jpg");
        fs::write(&input, b"source image").unwrap();
        let output = tmp.path().join("out.jpg");

        let fake = Arc::new(FakeRemote::new());
        let coord = coordinator(fake.clone());

        let command = cmd(&["tpai", input.to_str().unwrap(), "-o", output.to_str().unwrap()]);
        let result = coord.execute_with_files(&command).await.unwrap();
        assert_eq!(result.exit_code, 0);

        let tool_call = fake
            .calls()
            .into_iter()
            .find(|c| c.first().map(String::as_str) == Some("tpai"))
            .expect("tool command was executed");
        assert!(tool_call[1].starts_with(&format!("{BASE}/sessions/")));
        assert!(tool_call[1].ends_with("/inputs/in.jpg"));
        assert!(tool_call[3].ends_with("/outputs/out.jpg"));

        assert_eq!(fake.upload_count(), 1);
        assert_eq!(fs::read(&output).unwrap(), b"processed");
        assert_eq!(fake.rm_calls().len(), 1);
    }

    #[tokio::test]
    async fn nonzero_exit_skips_downloads_but_still_cleans_up() {
        let tmp = tempdir().unwrap();
        let input = tmp.path().join("in.jpg");
        fs::write(&input, b"source image").unwrap();
        let output = tmp.path().join("out.jpg");

        let fake = Arc::new(FakeRemote {
            tool_exit_code: 1,
            ..FakeRemote::new()
        });
        let coord = coordinator(fake.clone());

        let command = cmd(&["tpai", input.to_str().unwrap(), "-o", output.to_str().unwrap()]);
        let result = coord.execute_with_files(&command).await.unwrap();

        assert_eq!(result.exit_code, 1);
        assert_eq!(fake.download_count(), 0);
        assert!(!output.exists());
        assert_eq!(fake.rm_calls().len(), 1);
    }

    #[tokio::test]
    async fn upload_failure_surfaces_one_error_after_cleanup() {
        let tmp = tempdir().unwrap();
        let input = tmp.path().join("in.jpg");
        fs::write(&input, b"source image").unwrap();

        let fake = Arc::new(FakeRemote {
            fail_uploads: true,
            ..FakeRemote::new()
        });
        let coord = coordinator(fake.clone());

        let err = coord
            .execute_with_files(&cmd(&["tpai", input.to_str().unwrap()]))
            .await
            .unwrap_err();

        assert!(matches!(&err, Error::Remote(msg) if msg.contains("remote coordination failed")));
        assert_eq!(fake.rm_calls().len(), 1);
    }

    #[tokio::test]
    async fn identical_content_is_uploaded_exactly_once() {
        let tmp_a = tempdir().unwrap();
        let tmp_b = tempdir().unwrap();
        let first = tmp_a.path().join("in.jpg");
        let second = tmp_b.path().join("in.jpg");
        fs::write(&first, b"identical bytes").unwrap();
        fs::write(&second, b"identical bytes").unwrap();

        let fake = Arc::new(FakeRemote::new());
        let coord = coordinator(fake.clone());

        coord
            .execute_with_files(&cmd(&["tpai", first.to_str().unwrap()]))
            .await
            .unwrap();
        coord
            .execute_with_files(&cmd(&["tpai", second.to_str().unwrap()]))
            .await
            .unwrap();

        assert_eq!(fake.upload_count(), 1);

        // The second run referenced the cache path instead of re-staging.
        let tool_calls: Vec<Vec<String>> = fake
            .calls()
            .into_iter()
            .filter(|c| c.first().map(String::as_str) == Some("tpai"))
            .collect();
        assert_eq!(tool_calls.len(), 2);
        assert!(tool_calls[1][1].starts_with(&format!("{BASE}/cache/")));
    }

    #[tokio::test]
    async fn missing_remote_output_is_a_warning_not_an_error() {
        let tmp = tempdir().unwrap();
        let output = tmp.path().join("out.jpg");

        let fake = Arc::new(FakeRemote {
            create_outputs: false,
            ..FakeRemote::new()
        });
        let coord = coordinator(fake.clone());

        let result = coord
            .execute_with_files(&cmd(&["tpai", "-o", output.to_str().unwrap()]))
            .await
            .unwrap();

        assert_eq!(result.exit_code, 0);
        assert_eq!(fake.download_count(), 0);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn authentication_errors_keep_their_identity() {
        let fake = Arc::new(FakeRemote {
            auth_failure: true,
            ..FakeRemote::new()
        });
        let coord = coordinator(fake);

        let err = coord
            .execute_with_files(&cmd(&["tpai", "in.jpg"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[tokio::test]
    async fn self_test_reports_every_step() {
        let fake = Arc::new(FakeRemote::new());
        let coord = coordinator(fake.clone());

        let report = coord.test_coordination().await;
        assert!(report.session_creation, "session: {report:?}");
        assert!(report.file_roundtrip, "write: {report:?}");
        assert!(report.command_execution, "read: {report:?}");
        assert!(report.cleanup, "cleanup: {report:?}");
        assert!(report.error.is_none());
        assert!(report.passed());
        assert_eq!(fake.rm_calls().len(), 1);
    }

    #[test]
    fn default_report_does_not_pass() {
        assert!(!CoordinationReport::default().passed());
    }
}
