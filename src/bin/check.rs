// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

//! Smoke-test a remote host: connect, authenticate, gather server facts,
//! then run the coordination self-test (session, round trip, cleanup).

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use topyaz::config::{self, Overrides};
use topyaz::{RemoteExecutor, RemoteFileCoordinator};

#[derive(Parser)]
#[command(
    name = "topyaz-check",
    version,
    about = "Connection and coordination smoke tests for a remote host",
    after_help = "Configuration precedence: defaults < config file < command-line flags.\n\
Config path precedence: TOPYAZ_CONFIG_PATH < --config.\n\
If --config is omitted, topyaz-check tries TOPYAZ_CONFIG_PATH, then the default config file location; a missing default config is OK."
)]
struct Opts {
    #[arg(short, long, value_name = "PATH", help = "Path to a TOML config file")]
    config: Option<PathBuf>,
    #[arg(long, help = "Remote host. Overrides `host` from the config file")]
    host: Option<String>,
    #[arg(long, help = "Remote user. Overrides `user` from the config file")]
    user: Option<String>,
    #[arg(long, help = "SSH port. Overrides `port` from the config file")]
    port: Option<u16>,
    #[arg(
        long,
        value_name = "PATH",
        help = "Private key file. Overrides `ssh_key` from the config file"
    )]
    identity: Option<PathBuf>,
    #[arg(
        long,
        value_name = "DIR",
        help = "Remote staging base directory. Overrides `base_dir` from the config file"
    )]
    base_dir: Option<String>,
    #[arg(short, long, action = clap::ArgAction::SetTrue, help = "Enable debug logging")]
    verbose: bool,
}

fn step(name: &str, ok: bool) {
    println!("  {} {}", if ok { "ok  " } else { "FAIL" }, name);
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();
    topyaz::logging::init(opts.verbose);

    let config = config::load(
        opts.config,
        Overrides {
            host: opts.host,
            user: opts.user,
            port: opts.port,
            ssh_key: opts.identity,
            base_dir: opts.base_dir,
        },
    )?;
    let params = config.ssh_params()?;

    println!(
        "checking {}@{}:{}",
        params.username, params.host, params.port
    );
    let executor = Arc::new(RemoteExecutor::new(params)?);

    let diag = executor.test_connection().await;
    step("connection", diag.connected);
    if let Some(latency) = diag.latency_ms {
        println!("       latency: {latency:.0} ms");
    }
    for (key, value) in &diag.server {
        println!("       {key}: {value}");
    }
    if let Some(error) = &diag.error {
        println!("       error: {error}");
        std::process::exit(1);
    }

    let coordinator = RemoteFileCoordinator::new(executor.clone(), config.base_dir.clone());
    let report = coordinator.test_coordination().await;
    step("session creation", report.session_creation);
    step("file round trip", report.file_roundtrip);
    step("command execution", report.command_execution);
    step("cleanup", report.cleanup);
    if let Some(error) = &report.error {
        println!("       error: {error}");
    }

    executor.close().await;
    if !report.passed() {
        std::process::exit(1);
    }
    println!("all checks passed");
    Ok(())
}
