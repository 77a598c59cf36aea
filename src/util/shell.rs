// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

/// Very small, safe-ish shell escaper for paths and argv tokens.
pub fn sh_escape(p: &str) -> String {
    let mut out = String::from("'");
    out.push_str(&p.replace('\'', r"'\''"));
    out.push('\'');
    out
}

/// Join argv tokens into a single shell command string, each token
/// individually quoted so word-splitting and injection cannot occur.
pub fn join_escaped(command: &[String]) -> String {
    command
        .iter()
        .map(|arg| sh_escape(arg))
        .collect::<Vec<_>>()
        .join(" ")
}
