// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::collections::HashMap;

/// Rewrite every token of `command` from local to remote paths.
///
/// Exact-match tokens are replaced outright. Other tokens go through
/// substring replacement ordered by local path length, longest first, so
/// a short path never corrupts a longer one that contains it as a prefix.
pub fn translate_command(command: &[String], mapping: &HashMap<String, String>) -> Vec<String> {
    let mut by_length: Vec<(&String, &String)> = mapping.iter().collect();
    by_length.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    command
        .iter()
        .map(|arg| match mapping.get(arg) {
            Some(remote) => remote.clone(),
            None => {
                let mut result = arg.clone();
                for (local, remote) in &by_length {
                    if result.contains(local.as_str()) {
                        result = result.replace(local.as_str(), remote.as_str());
                    }
                }
                result
            }
        })
        .collect()
}
