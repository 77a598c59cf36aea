//! Helpers for remote paths, which are plain '/'-separated strings and
//! must never be interpreted through the local platform's path rules.

/// Expand a remote directory into the chain of paths that must exist for
/// it, outermost first. `.` and `..` segments are skipped rather than
/// resolved; remote paths handed to this crate are expected to be clean.
pub fn dir_chain(remote_dir: &str) -> Vec<String> {
    let absolute = remote_dir.starts_with('/');
    let mut chain = Vec::new();
    let mut cur = String::new();
    for seg in remote_dir.split('/') {
        if seg.is_empty() || seg == "." || seg == ".." {
            continue;
        }
        if cur.is_empty() {
            if absolute {
                cur.push('/');
            }
        } else if cur != "/" {
            cur.push('/');
        }
        cur.push_str(seg);
        chain.push(cur.clone());
    }
    chain
}

/// Parent of a remote path, if it has one.
pub fn parent(remote_path: &str) -> Option<&str> {
    let trimmed = remote_path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&trimmed[..idx]),
        None => None,
    }
}

/// Final component of a remote path.
pub fn basename(remote_path: &str) -> &str {
    remote_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(remote_path)
}

/// Join a remote base and a relative suffix with '/'.
pub fn join(base: &str, rel: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), rel.trim_start_matches('/'))
}
