//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No blocking I/O inside async code
//! - No sleep() calls in production code
//! - The core engine stays free of terminal output and front-end crates
//!
//! The helpers here do a line-based scan of the production sources; they are
//! heuristics, not a parser, and err on the side of reporting.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source trees checked by every rule
pub const PRODUCTION_DIRS: &[&str] = &["chatline/core/src", "chatline/cli/src"];

/// Workspace root, resolved from this crate's manifest
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// One line of production source with its context
#[derive(Debug)]
pub struct SourceLine<'a> {
    /// File the line came from
    pub path: &'a Path,
    /// 1-based line number
    pub number: usize,
    /// Full line text
    pub text: &'a str,
    /// Line text before any `//` comment
    pub code: &'a str,
    /// Inside `#[test]` functions or a `#[cfg(test)]` module
    pub in_test: bool,
    /// Inside an `async fn`
    pub in_async: bool,
}

impl SourceLine<'_> {
    /// `path:line - kind: text` for violation reports
    #[must_use]
    pub fn report(&self, kind: &str) -> String {
        format!(
            "{}:{} - {}: {}",
            self.path.display(),
            self.number,
            kind,
            self.text.trim()
        )
    }
}

/// All `.rs` files under `dir` (relative to the workspace root)
#[must_use]
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    if !root.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Run `check` over every line of every production file
pub fn scan_production_code<F>(mut check: F)
where
    F: FnMut(&SourceLine<'_>),
{
    for dir in PRODUCTION_DIRS {
        for path in rust_files(dir) {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let lines: Vec<&str> = content.lines().collect();
            let test_module_start = test_module_start(&lines);

            for (idx, text) in lines.iter().enumerate() {
                let line = SourceLine {
                    path: &path,
                    number: idx + 1,
                    text,
                    code: text.split("//").next().unwrap_or(text),
                    in_test: test_module_start.is_some_and(|start| idx > start)
                        || is_in_test_function(&lines, idx),
                    in_async: is_in_async_function(&lines, idx),
                };
                check(&line);
            }
        }
    }
}

/// Index of the first `#[cfg(test)]` attribute followed by a `mod`
fn test_module_start(lines: &[&str]) -> Option<usize> {
    lines.iter().enumerate().find_map(|(idx, line)| {
        let is_cfg_test = line.trim() == "#[cfg(test)]";
        let next_is_mod = lines
            .get(idx + 1)
            .is_some_and(|next| next.trim_start().starts_with("mod "));
        (is_cfg_test && next_is_mod).then_some(idx)
    })
}

/// Check if line is inside a test function
#[must_use]
pub fn is_in_test_function(lines: &[&str], current_idx: usize) -> bool {
    // Scan backwards to find the enclosing function
    let mut found_fn_idx = None;
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if line.starts_with("fn ") || line.contains(" fn ") || line.starts_with("async fn ") {
            found_fn_idx = Some(i);
            break;
        }

        // Stop at module boundaries
        if line.starts_with("mod ") || (line.starts_with("impl ") && line.contains('{')) {
            return false;
        }
    }

    let Some(fn_idx) = found_fn_idx else {
        return false;
    };

    // Scan backwards from the function to find test markers
    for i in (0..fn_idx).rev() {
        let line = lines[i].trim();

        if line.starts_with("#[test]")
            || line.starts_with("#[tokio::test")
            || line.starts_with("#[cfg(test)]")
        {
            return true;
        }

        if !line.starts_with("#[") && !line.starts_with("///") {
            break;
        }
    }

    false
}

/// Check if line is inside an async function
#[must_use]
pub fn is_in_async_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if line.contains("async fn ") {
            return true;
        }

        if (line.starts_with("fn ") || line.contains(" fn ")) && !line.contains("async") {
            return false;
        }

        // Stop at module/impl boundaries
        if line.starts_with("mod ") || (line.starts_with("impl ") && line.contains('{')) {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_function_detection() {
        let code = vec![
            "async fn bad_function() {",
            "    let contents = std::fs::read_to_string(\"file.txt\")?;",
            "}",
        ];
        assert!(is_in_async_function(&code, 1));
        assert!(!is_in_test_function(&code, 1));
    }

    #[test]
    fn test_non_async_function_detection() {
        let code = vec![
            "pub fn load() {",
            "    let contents = std::fs::read_to_string(\"config.toml\")?;",
            "}",
        ];
        assert!(!is_in_async_function(&code, 1));
    }

    #[test]
    fn test_test_function_detection() {
        let code = vec![
            "#[tokio::test]",
            "async fn test_something() {",
            "    tokio::time::sleep(d).await;",
            "}",
        ];
        assert!(is_in_test_function(&code, 2));
    }

    #[test]
    fn test_test_module_detection() {
        let code = vec!["fn real() {}", "", "#[cfg(test)]", "mod tests {", "    fn helper() {}"];
        assert_eq!(test_module_start(&code), Some(2));
        assert_eq!(test_module_start(&code[..2]), None);
    }

    #[test]
    fn test_production_dirs_exist() {
        for dir in PRODUCTION_DIRS {
            assert!(
                !rust_files(dir).is_empty(),
                "no Rust sources found under {dir}"
            );
        }
    }
}
