//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async code in the core engine and the CLI MUST NOT use blocking I/O.
//! **Required**: Use `tokio::fs`, `tokio::net`, `tokio::io`, not `std::fs`, `std::net`, `std::io`
//!
//! Blocking calls are tolerated in plain (non-async) functions that run before
//! or outside the runtime's hot path, such as loading the config file.

use architectural_enforcement::scan_production_code;

/// Test that async production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_async_code() {
    let mut violations = Vec::new();

    scan_production_code(|line| {
        if line.in_test || !line.in_async {
            return;
        }
        let code = line.code;

        if code.contains("std::fs::") || code.contains("use std::fs") {
            violations.push(line.report("Blocking file I/O"));
        }
        if code.contains("std::net::") || code.contains("use std::net") {
            violations.push(line.report("Blocking network I/O"));
        }
        if code.contains("std::process::Command") {
            violations.push(line.report("Blocking process I/O"));
        }
        if code.contains("reqwest::blocking") {
            violations.push(line.report("Blocking HTTP client"));
        }
        if code.contains("std::io::stdin()") || code.contains("std::io::stdout()") {
            violations.push(line.report("Blocking stdin/stdout in async"));
        }
        if code.contains("println!(") || code.contains("print!(") {
            violations.push(line.report("Blocking stdout macro in async"));
        }
    });

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O calls found in async production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::fs::read().await, tokio::fs::write().await");
        eprintln!("  - tokio::io::stdout() with AsyncWriteExt");
        eprintln!("  - reqwest::Client (async)");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// The HTTP client must never be the blocking flavor, async or not
#[test]
fn test_no_blocking_http_client_anywhere() {
    let mut violations = Vec::new();

    scan_production_code(|line| {
        if line.code.contains("reqwest::blocking") {
            violations.push(line.report("Blocking HTTP client"));
        }
    });

    assert!(violations.is_empty(), "{violations:#?}");
}
