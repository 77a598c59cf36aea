// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::path::Path;

/// Local paths found in an argv, split by direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectedFiles {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

const OUTPUT_FLAGS: &[&str] = &["-o", "--output"];
const INPUT_FLAGS: &[&str] = &["-i", "--input"];

/// Scan an argv for file paths, positionally.
///
/// Best-effort heuristic: a token that follows `-o`/`--output` is an
/// output; a token that follows `-i`/`--input`, or a bare positional
/// path that exists locally, is an input. No other flags are
/// special-cased, so an argument that merely looks like a path can be
/// misclassified; callers get unmodified pass-through for anything
/// not detected.
pub fn detect_files(command: &[String]) -> DetectedFiles {
    let mut detected = DetectedFiles::default();
    for (i, arg) in command.iter().enumerate() {
        if !looks_like_path(arg) {
            continue;
        }
        let prev = if i > 0 { command[i - 1].as_str() } else { "" };
        if OUTPUT_FLAGS.contains(&prev) {
            detected.outputs.push(arg.clone());
        } else if INPUT_FLAGS.contains(&prev)
            || (!prev.starts_with('-') && Path::new(arg).exists())
        {
            detected.inputs.push(arg.clone());
        }
    }
    detected
}

/// A candidate path does not start with `-`, has at least two
/// characters, and either carries an extension or exists locally.
fn looks_like_path(arg: &str) -> bool {
    if arg.starts_with('-') || arg.len() < 2 {
        return false;
    }
    let path = Path::new(arg);
    path.extension().is_some() || path.exists()
}

#[cfg(test)]
mod tests {
    use super::{detect_files, looks_like_path};
    use std::fs;
    use tempfile::tempdir;

    fn cmd(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn flags_and_short_tokens_are_not_paths() {
        assert!(!looks_like_path("--verbose"));
        assert!(!looks_like_path("-i"));
        assert!(!looks_like_path("x"));
        assert!(looks_like_path("in.jpg"));
    }

    #[test]
    fn extensionless_token_needs_to_exist() {
        let tmp = tempdir().unwrap();
        let present = tmp.path().join("model");
        fs::write(&present, b"weights").unwrap();

        assert!(looks_like_path(present.to_str().unwrap()));
        assert!(!looks_like_path("no_such_file_anywhere"));
    }

    #[test]
    fn output_flag_claims_the_next_token() {
        let detected = detect_files(&cmd(&["tool", "-o", "/out/result.jpg"]));
        assert_eq!(detected.outputs, vec!["/out/result.jpg"]);
        assert!(detected.inputs.is_empty());
    }

    #[test]
    fn input_flag_claims_even_missing_files() {
        let detected = detect_files(&cmd(&["tool", "--input", "/nowhere/in.jpg"]));
        assert_eq!(detected.inputs, vec!["/nowhere/in.jpg"]);
    }

    #[test]
    fn bare_positional_path_must_exist_locally() {
        let tmp = tempdir().unwrap();
        let input = tmp.path().join("frame.png");
        fs::write(&input, b"png").unwrap();
        let input = input.to_str().unwrap();

        let detected = detect_files(&cmd(&["tool", input, "/absent/other.png"]));
        assert_eq!(detected.inputs, vec![input.to_string()]);
    }

    #[test]
    fn value_of_unknown_flag_is_not_an_input() {
        // `--model best.onnx` looks like a path but follows a flag that
        // is not special-cased; only an existing bare positional counts.
        let detected = detect_files(&cmd(&["tool", "--model", "best.onnx"]));
        assert!(detected.inputs.is_empty());
        assert!(detected.outputs.is_empty());
    }

    #[test]
    fn mixed_command_splits_both_directions() {
        let tmp = tempdir().unwrap();
        let input = tmp.path().join("in.jpg");
        fs::write(&input, b"jpg").unwrap();
        let input = input.to_str().unwrap();

        let detected = detect_files(&cmd(&[
            "tpai", input, "-o", "/results/out.jpg", "--scale", "2",
        ]));
        assert_eq!(detected.inputs, vec![input.to_string()]);
        assert_eq!(detected.outputs, vec!["/results/out.jpg"]);
    }
}
