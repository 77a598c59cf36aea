// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use log::LevelFilter;

/// Initialize env_logger for binaries and tests. The library itself only
/// emits through the `log` facade and never installs a logger.
///
/// Verbose mode enables debug logging including dependencies; otherwise
/// only this crate logs, at info. Safe to call more than once.
pub fn init(verbose: bool) {
    let mut builder = env_logger::builder();
    builder.format_timestamp_secs();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    } else {
        builder
            .filter_level(LevelFilter::Off)
            .filter_module("topyaz", LevelFilter::Info);
    }
    let _ = builder.try_init();
}
