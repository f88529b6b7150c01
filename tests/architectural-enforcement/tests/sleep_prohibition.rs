//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in `tutor-core` and `tutor-cli` MUST NOT call
//! sleep. Timers go through `tokio::time::interval`; everything else waits on
//! I/O or a channel.
//! **Exceptions**: test modules.

use architectural_enforcement::{code_part, is_interval_context, production_sources};

#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();

    for file in production_sources() {
        for (idx, line) in file.lines.iter().enumerate() {
            let code = code_part(line);
            if !(code.contains("::sleep(") || code.contains(".sleep(")) {
                continue;
            }
            if is_interval_context(&file.lines, idx) {
                continue;
            }
            violations.push(file.violation(idx, "Sleep call"));
        }
    }

    if !violations.is_empty() {
        eprintln!("\nSleep calls found in production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nUse tokio::time::interval for periodic work, or wait on the event itself.");

        panic!("Found {} sleep violation(s)", violations.len());
    }
}

#[test]
fn test_scanner_sees_the_timer_modules() {
    let files = production_sources();
    for name in ["typing.rs", "sync.rs", "surface.rs"] {
        assert!(
            files.iter().any(|f| f.path.ends_with(name)),
            "{name} was not scanned"
        );
    }
}
