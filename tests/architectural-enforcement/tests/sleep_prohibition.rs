//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT call sleep methods. Stream sessions
//! suspend only on the transport; everything else reacts to channel and
//! watch notifications.
//!
//! **Exceptions**: test code.

use architectural_enforcement::scan_production_code;

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();

    scan_production_code(|line| {
        if line.in_test {
            return;
        }
        let code = line.code;
        if code.contains("::sleep(") || code.contains(".sleep(") || code.contains("sleep_until(")
        {
            violations.push(line.report("Sleep call"));
        }
    });

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ ACCEPTABLE waiting:");
        eprintln!("  - awaiting the next transport chunk");
        eprintln!("  - watch::Receiver::changed(), mpsc::Receiver::recv()");
        eprintln!("  - tokio::time::timeout() around a real future");
        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - Sleep in polling loops");
        eprintln!("  - Sleep as poor man's synchronization");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}
