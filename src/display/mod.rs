// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

//! Headless-display bootstrapping for GUI-only tools on remote hosts.
//!
//! Wrapping never executes anything itself; it only rewrites the argv
//! that the remote executor subsequently runs.

use std::time::Duration;
use tokio::sync::OnceCell;

use crate::exec::CommandExecutor;
use crate::util::shell::{join_escaped, sh_escape};

/// Binary names and app-bundle paths that require a display.
/// Substring matching; false negatives fall back to unmodified
/// execution, false positives only add harmless wrapping.
const GUI_PATTERNS: &[&str] = &[
    "/Applications/Topaz Photo AI.app",
    "tpai",
    "Topaz Photo AI",
    "/Applications/Topaz Gigapixel AI.app",
    "gigapixel",
    "Topaz Gigapixel AI",
    "/Applications/Topaz Video AI.app",
    "Video AI",
];

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStrategy {
    Auto,
    Xvfb,
    MacosLaunchctl,
    MacosEnv,
    Xquartz,
    Fallback,
}

impl DisplayStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayStrategy::Auto => "auto",
            DisplayStrategy::Xvfb => "xvfb",
            DisplayStrategy::MacosLaunchctl => "macos_launchctl",
            DisplayStrategy::MacosEnv => "macos_env",
            DisplayStrategy::Xquartz => "xquartz",
            DisplayStrategy::Fallback => "fallback",
        }
    }
}

impl std::str::FromStr for DisplayStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(DisplayStrategy::Auto),
            "xvfb" => Ok(DisplayStrategy::Xvfb),
            "macos_launchctl" => Ok(DisplayStrategy::MacosLaunchctl),
            "macos_env" => Ok(DisplayStrategy::MacosEnv),
            "xquartz" => Ok(DisplayStrategy::Xquartz),
            "fallback" => Ok(DisplayStrategy::Fallback),
            other => Err(format!("unknown display strategy '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DisplayOptions {
    pub enabled: bool,
    pub strategy: DisplayStrategy,
    pub screen_size: String,
    /// Wrap even when the command is not recognized as a GUI application.
    pub force: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: DisplayStrategy::Auto,
            screen_size: "1024x768x24".to_string(),
            force: false,
        }
    }
}

/// What display machinery the remote host offers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayCapabilities {
    pub has_xvfb: bool,
    pub has_xquartz: bool,
    pub has_display: bool,
    pub has_launchctl: bool,
    pub display_var: Option<String>,
}

/// Decides and applies a headless-display strategy for one executor.
/// Platform and capabilities are probed once and memoized; build a new
/// manager alongside a new executor to re-probe.
pub struct VirtualDisplay {
    options: DisplayOptions,
    platform: OnceCell<String>,
    capabilities: OnceCell<DisplayCapabilities>,
}

impl VirtualDisplay {
    pub fn new(options: DisplayOptions) -> Self {
        Self {
            options,
            platform: OnceCell::new(),
            capabilities: OnceCell::new(),
        }
    }

    pub fn options(&self) -> &DisplayOptions {
        &self.options
    }

    pub fn is_gui_command(command: &[String]) -> bool {
        let joined = command.join(" ");
        GUI_PATTERNS.iter().any(|pattern| joined.contains(pattern))
    }

    /// Remote platform from `uname -s`, lowercased; `unknown` on failure.
    pub async fn platform<E: CommandExecutor + ?Sized>(&self, exec: &E) -> String {
        self.platform
            .get_or_init(|| async {
                let uname = vec!["uname".to_string(), "-s".to_string()];
                match exec.execute(&uname, None, Some(PROBE_TIMEOUT)).await {
                    Ok(out) if out.success() => out.stdout.trim().to_lowercase(),
                    Ok(_) | Err(_) => "unknown".to_string(),
                }
            })
            .await
            .clone()
    }

    /// Probe the remote host once. Any individual probe failure is
    /// treated as "capability absent", never as a fatal error.
    pub async fn capabilities<E: CommandExecutor + ?Sized>(&self, exec: &E) -> DisplayCapabilities {
        self.capabilities
            .get_or_init(|| async {
                let mut caps = DisplayCapabilities::default();
                caps.has_xvfb = probe_ok(exec, &["which", "xvfb-run"]).await;
                caps.has_xquartz =
                    probe_ok(exec, &["ls", "/Applications/Utilities/XQuartz.app"]).await;
                caps.has_launchctl = probe_ok(exec, &["which", "launchctl"]).await;
                // $DISPLAY only expands inside a shell
                if let Some(value) = probe_stdout(exec, &["sh", "-c", "echo \"${DISPLAY:-}\""]).await
                {
                    if !value.is_empty() {
                        caps.has_display = true;
                        caps.display_var = Some(value);
                    }
                }
                log::debug!("remote display capabilities: {caps:?}");
                caps
            })
            .await
            .clone()
    }

    /// The decision table. `platform` is the lowercased `uname -s`.
    pub fn choose_strategy(platform: &str, caps: &DisplayCapabilities) -> DisplayStrategy {
        match platform {
            "darwin" => {
                if caps.has_launchctl {
                    DisplayStrategy::MacosLaunchctl
                } else if caps.has_xquartz {
                    DisplayStrategy::Xquartz
                } else {
                    DisplayStrategy::MacosEnv
                }
            }
            "linux" => {
                if caps.has_xvfb {
                    DisplayStrategy::Xvfb
                } else {
                    DisplayStrategy::Fallback
                }
            }
            _ => DisplayStrategy::Fallback,
        }
    }

    /// Rewrite `command` so it can run without a physical display.
    /// Non-GUI commands pass through untouched unless `force` is set.
    /// An explicit strategy bypasses platform/capability detection.
    pub async fn wrap_command<E: CommandExecutor + ?Sized>(
        &self,
        exec: &E,
        command: &[String],
    ) -> Vec<String> {
        if !self.options.enabled {
            return command.to_vec();
        }
        if !Self::is_gui_command(command) && !self.options.force {
            return command.to_vec();
        }

        let strategy = match self.options.strategy {
            DisplayStrategy::Auto => {
                let platform = self.platform(exec).await;
                let caps = self.capabilities(exec).await;
                Self::choose_strategy(&platform, &caps)
            }
            explicit => explicit,
        };
        log::info!("virtual display strategy: {}", strategy.as_str());

        match strategy {
            DisplayStrategy::Xvfb => wrap_xvfb(command, &self.options.screen_size),
            DisplayStrategy::MacosLaunchctl => wrap_macos_launchctl(command),
            DisplayStrategy::MacosEnv => wrap_macos_env(command),
            DisplayStrategy::Xquartz => wrap_xquartz(command),
            DisplayStrategy::Fallback => wrap_env_fallback(command),
            DisplayStrategy::Auto => command.to_vec(),
        }
    }
}

async fn probe_ok<E: CommandExecutor + ?Sized>(exec: &E, argv: &[&str]) -> bool {
    let command: Vec<String> = argv.iter().map(|a| a.to_string()).collect();
    match exec.execute(&command, None, Some(PROBE_TIMEOUT)).await {
        Ok(out) => out.success(),
        Err(e) => {
            log::debug!("display probe {argv:?} failed: {e}");
            false
        }
    }
}

async fn probe_stdout<E: CommandExecutor + ?Sized>(exec: &E, argv: &[&str]) -> Option<String> {
    let command: Vec<String> = argv.iter().map(|a| a.to_string()).collect();
    match exec.execute(&command, None, Some(PROBE_TIMEOUT)).await {
        Ok(out) if out.success() => Some(out.stdout.trim().to_string()),
        Ok(_) => None,
        Err(e) => {
            log::debug!("display probe {argv:?} failed: {e}");
            None
        }
    }
}

fn wrap_xvfb(command: &[String], screen_size: &str) -> Vec<String> {
    let mut wrapped = vec![
        "xvfb-run".to_string(),
        "-a".to_string(),
        "-s".to_string(),
        format!("-screen 0 {screen_size}"),
        "--".to_string(),
    ];
    wrapped.extend(command.iter().cloned());
    wrapped
}

const DYLD_COREGRAPHICS: &str = "export DYLD_LIBRARY_PATH=/System/Library/Frameworks/ApplicationServices.framework/Versions/A/Frameworks/CoreGraphics.framework/Versions/A:$DYLD_LIBRARY_PATH";

/// Direct execution with a headless environment. The wrapper reports a
/// failure on stderr but re-raises the command's exit status so callers
/// still see the real outcome.
fn wrap_macos_launchctl(command: &[String]) -> Vec<String> {
    let env_setup = [
        "export DISPLAY=:99",
        "export QT_QPA_PLATFORM=offscreen",
        "export NSUnbufferedIO=YES",
        "export CI=true",
        "export HEADLESS=true",
        "export NO_GUI=true",
        "export TERM=xterm-256color",
        DYLD_COREGRAPHICS,
        "export NSUIElement=1",
        "export LSUIElement=1",
    ]
    .join("; ");
    let script = format!(
        "{env_setup}; {} 2>&1; status=$?; \
         if [ $status -ne 0 ]; then echo \"command failed with exit code: $status\" >&2; fi; \
         exit $status",
        join_escaped(command)
    );
    shell_command(script)
}

fn wrap_macos_env(command: &[String]) -> Vec<String> {
    let script = format!(
        "export DISPLAY=:0; {DYLD_COREGRAPHICS}; {}",
        join_escaped(command)
    );
    shell_command(script)
}

/// Start an X11 server on display :99, give it a moment, then run.
fn wrap_xquartz(command: &[String]) -> Vec<String> {
    let x11 = sh_escape("/Applications/Utilities/XQuartz.app/Contents/MacOS/X11.bin");
    let script = format!(
        "{x11} :99 & export DISPLAY=:99; sleep 2; {}",
        join_escaped(command)
    );
    shell_command(script)
}

fn wrap_env_fallback(command: &[String]) -> Vec<String> {
    let script = format!(
        "export DISPLAY=\"${{DISPLAY:-:0}}\"; \
         export QT_QPA_PLATFORM=\"${{QT_QPA_PLATFORM:-offscreen}}\"; \
         export QT_ASSUME_NO_WINDOWS_WM=1; {}",
        join_escaped(command)
    );
    shell_command(script)
}

fn shell_command(script: String) -> Vec<String> {
    vec!["bash".to_string(), "-c".to_string(), script]
}

#[cfg(test)]
mod tests {
    use super::{
        DisplayCapabilities, DisplayOptions, DisplayStrategy, VirtualDisplay, wrap_macos_launchctl,
        wrap_xvfb,
    };
    use crate::errors::{Error, Result};
    use crate::exec::{CommandExecutor, ExecOutput};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    fn cmd(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    /// Answers probes from a canned table; anything else errors.
    struct ProbeExec {
        responses: HashMap<String, ExecOutput>,
    }

    impl ProbeExec {
        fn new(entries: &[(&str, i32, &str)]) -> Self {
            let responses = entries
                .iter()
                .map(|(key, code, stdout)| {
                    (
                        key.to_string(),
                        ExecOutput {
                            exit_code: *code,
                            stdout: stdout.to_string(),
                            stderr: String::new(),
                        },
                    )
                })
                .collect();
            Self { responses }
        }
    }

    #[async_trait]
    impl CommandExecutor for ProbeExec {
        async fn execute(
            &self,
            command: &[String],
            _input: Option<&str>,
            _timeout: Option<Duration>,
        ) -> Result<ExecOutput> {
            let key = command.join(" ");
            self.responses
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::Remote(format!("unexpected probe: {key}")))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn info(&self) -> HashMap<String, String> {
            HashMap::new()
        }
    }

    #[test]
    fn decision_table_matches_documented_strategies() {
        let launchctl = DisplayCapabilities {
            has_launchctl: true,
            ..Default::default()
        };
        assert_eq!(
            VirtualDisplay::choose_strategy("darwin", &launchctl),
            DisplayStrategy::MacosLaunchctl
        );

        let xquartz = DisplayCapabilities {
            has_xquartz: true,
            ..Default::default()
        };
        assert_eq!(
            VirtualDisplay::choose_strategy("darwin", &xquartz),
            DisplayStrategy::Xquartz
        );
        assert_eq!(
            VirtualDisplay::choose_strategy("darwin", &DisplayCapabilities::default()),
            DisplayStrategy::MacosEnv
        );

        let xvfb = DisplayCapabilities {
            has_xvfb: true,
            ..Default::default()
        };
        assert_eq!(
            VirtualDisplay::choose_strategy("linux", &xvfb),
            DisplayStrategy::Xvfb
        );
        assert_eq!(
            VirtualDisplay::choose_strategy("linux", &DisplayCapabilities::default()),
            DisplayStrategy::Fallback
        );
        assert_eq!(
            VirtualDisplay::choose_strategy("windows_nt", &DisplayCapabilities::default()),
            DisplayStrategy::Fallback
        );
        assert_eq!(
            VirtualDisplay::choose_strategy("unknown", &DisplayCapabilities::default()),
            DisplayStrategy::Fallback
        );
    }

    #[test]
    fn strategy_strings_round_trip() {
        for s in [
            DisplayStrategy::Auto,
            DisplayStrategy::Xvfb,
            DisplayStrategy::MacosLaunchctl,
            DisplayStrategy::MacosEnv,
            DisplayStrategy::Xquartz,
            DisplayStrategy::Fallback,
        ] {
            assert_eq!(s.as_str().parse::<DisplayStrategy>().unwrap(), s);
        }
        assert!("x11vnc".parse::<DisplayStrategy>().is_err());
    }

    #[test]
    fn recognizes_gui_binaries_by_substring() {
        assert!(VirtualDisplay::is_gui_command(&cmd(&[
            "/Applications/Topaz Photo AI.app/Contents/Resources/bin/tpai",
            "--cli",
            "in.jpg"
        ])));
        assert!(VirtualDisplay::is_gui_command(&cmd(&["tpai", "in.jpg"])));
        assert!(!VirtualDisplay::is_gui_command(&cmd(&["ffmpeg", "-i", "in.mp4"])));
    }

    #[test]
    fn xvfb_keeps_screen_spec_as_one_token() {
        let wrapped = wrap_xvfb(&cmd(&["tpai", "my photo.jpg"]), "1024x768x24");
        assert_eq!(
            wrapped,
            cmd(&["xvfb-run", "-a", "-s", "-screen 0 1024x768x24", "--", "tpai", "my photo.jpg"])
        );
    }

    #[test]
    fn launchctl_wrapper_quotes_args_and_preserves_exit_status() {
        let wrapped = wrap_macos_launchctl(&cmd(&["tpai", "my photo.jpg"]));
        assert_eq!(wrapped[0], "bash");
        assert_eq!(wrapped[1], "-c");
        let script = &wrapped[2];
        assert!(script.contains("'tpai' 'my photo.jpg'"));
        assert!(script.contains("export QT_QPA_PLATFORM=offscreen"));
        assert!(script.contains("exit $status"));
    }

    #[tokio::test]
    async fn non_gui_commands_pass_through_untouched() {
        let display = VirtualDisplay::new(DisplayOptions::default());
        let exec = ProbeExec::new(&[]);
        let command = cmd(&["ffmpeg", "-i", "in.mp4"]);
        assert_eq!(display.wrap_command(&exec, &command).await, command);
    }

    #[tokio::test]
    async fn disabled_manager_never_wraps() {
        let display = VirtualDisplay::new(DisplayOptions {
            enabled: false,
            ..Default::default()
        });
        let exec = ProbeExec::new(&[]);
        let command = cmd(&["tpai", "in.jpg"]);
        assert_eq!(display.wrap_command(&exec, &command).await, command);
    }

    #[tokio::test]
    async fn auto_resolves_via_probes_and_memoizes() {
        let display = VirtualDisplay::new(DisplayOptions::default());
        let exec = ProbeExec::new(&[
            ("uname -s", 0, "Linux\n"),
            ("which xvfb-run", 0, "/usr/bin/xvfb-run\n"),
            ("ls /Applications/Utilities/XQuartz.app", 1, ""),
            ("which launchctl", 1, ""),
            ("sh -c echo \"${DISPLAY:-}\"", 0, "\n"),
        ]);

        let wrapped = display.wrap_command(&exec, &cmd(&["tpai", "in.jpg"])).await;
        assert_eq!(wrapped[0], "xvfb-run");

        // Second wrap reuses memoized facts; a probing executor that
        // answers nothing would now error if probes re-ran.
        let silent = ProbeExec::new(&[]);
        let again = display.wrap_command(&silent, &cmd(&["tpai", "in.jpg"])).await;
        assert_eq!(again[0], "xvfb-run");
    }

    #[tokio::test]
    async fn explicit_strategy_bypasses_detection() {
        let display = VirtualDisplay::new(DisplayOptions {
            strategy: DisplayStrategy::Fallback,
            ..Default::default()
        });
        // No probe responses configured: detection would error loudly.
        let exec = ProbeExec::new(&[]);
        let wrapped = display.wrap_command(&exec, &cmd(&["tpai", "in.jpg"])).await;
        assert_eq!(wrapped[0], "bash");
        assert!(wrapped[2].contains("QT_QPA_PLATFORM"));
    }

    #[tokio::test]
    async fn force_wraps_non_gui_commands() {
        let display = VirtualDisplay::new(DisplayOptions {
            strategy: DisplayStrategy::Fallback,
            force: true,
            ..Default::default()
        });
        let exec = ProbeExec::new(&[]);
        let wrapped = display.wrap_command(&exec, &cmd(&["ffmpeg", "-i", "a.mp4"])).await;
        assert_eq!(wrapped[0], "bash");
    }
}
