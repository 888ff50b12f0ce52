//! Integration Test: Core / Front-End Separation
//!
//! **Policy**: `chatline-core` is a library. It never writes to the terminal,
//! never installs a tracing subscriber, and never depends on front-end crates;
//! the CLI owns stdout and logging setup. Production code propagates errors
//! instead of unwrapping.

use std::fs;

use architectural_enforcement::{scan_production_code, workspace_root};

/// Crates only a front end may depend on
const FRONT_END_CRATES: &[&str] = &["clap", "tracing-subscriber", "crossterm", "ratatui"];

#[test]
fn test_core_does_not_print_or_init_logging() {
    let mut violations = Vec::new();

    scan_production_code(|line| {
        if line.in_test || !line.path.to_string_lossy().contains("chatline/core/") {
            return;
        }
        let code = line.code;
        if code.contains("println!(") || code.contains("eprintln!(") || code.contains("dbg!(") {
            violations.push(line.report("Terminal output in core"));
        }
        if code.contains("tracing_subscriber") {
            violations.push(line.report("Subscriber setup in core"));
        }
    });

    assert!(violations.is_empty(), "{violations:#?}");
}

#[test]
fn test_core_manifest_has_no_front_end_crates() {
    let manifest = fs::read_to_string(workspace_root().join("chatline/core/Cargo.toml"))
        .expect("core manifest readable");

    let dependency_names: Vec<&str> = manifest
        .lines()
        .map(str::trim)
        .filter(|l| !l.starts_with('#') && !l.starts_with('['))
        .filter_map(|l| l.split('=').next())
        .map(str::trim)
        .collect();

    for krate in FRONT_END_CRATES {
        assert!(
            !dependency_names.contains(krate),
            "chatline-core must not depend on {krate}"
        );
    }
}

#[test]
fn test_no_unwrap_in_production_code() {
    let mut violations = Vec::new();

    scan_production_code(|line| {
        if line.in_test {
            return;
        }
        if line.code.contains(".unwrap()") || line.code.contains(".expect(") {
            violations.push(line.report("Unwrap in production code"));
        }
    });

    assert!(violations.is_empty(), "{violations:#?}");
}
