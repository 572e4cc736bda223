//! Builtin tool implementations.
//!
//! Each tool is a self-contained module. To add a new tool:
//! 1. Create a new file in this directory
//! 2. Implement the Tool trait
//! 3. Add `pub mod <name>;` here
//! 4. Register it in create_default_registry() in ../lib.rs

pub mod browser;
pub mod clock;
pub mod files;
pub mod mode;

use std::path::{Path, PathBuf};

/// Field separator for tools that take more than one value.
pub const FIELD_DELIMITER: &str = "|||";

/// Split `input` on `|||` into exactly `n` trimmed fields. The last field
/// keeps any further delimiters and its inner whitespace.
pub fn split_fields(input: &str, n: usize) -> Option<Vec<&str>> {
    let parts: Vec<&str> = input.splitn(n, FIELD_DELIMITER).collect();
    if parts.len() != n {
        return None;
    }
    let last = n - 1;
    Some(
        parts
            .into_iter()
            .enumerate()
            .map(|(i, p)| if i == last { p.trim_start() } else { p.trim() })
            .collect(),
    )
}

/// Resolve a user-supplied path: `~/` expands to home, relative paths join
/// the workspace root, absolute paths pass through.
pub(crate) fn resolve_path(workspace_root: &Path, path: &str) -> PathBuf {
    let path = path.trim();
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        workspace_root.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_fields_keeps_extra_delimiters_in_last_field() {
        assert_eq!(split_fields("a.txt ||| x ||| y", 2), Some(vec!["a.txt", "x ||| y"]));
        assert_eq!(split_fields("no delimiter", 2), None);
        assert_eq!(split_fields(" one ", 1), Some(vec!["one "]));
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let root = Path::new("/work");
        assert_eq!(resolve_path(root, "notes.txt"), PathBuf::from("/work/notes.txt"));
        assert_eq!(resolve_path(root, "/etc/hosts"), PathBuf::from("/etc/hosts"));
    }
}
