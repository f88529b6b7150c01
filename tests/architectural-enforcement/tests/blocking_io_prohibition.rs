//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async functions in `tutor-core` and `tutor-cli` MUST NOT use
//! blocking I/O. Use `tokio::io`, `tokio::fs` and async `reqwest`.
//! **Exceptions**: non-async functions (config loading runs before any
//! request is made) and test modules.

use architectural_enforcement::{code_part, enclosing_fn, production_sources, FnKind};

/// Patterns forbidden inside `async fn`
const BLOCKING_IN_ASYNC: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("std::io::stdin()", "Blocking stdin"),
    ("std::thread::sleep", "Blocking sleep"),
];

#[test]
fn test_no_blocking_io_in_async_code() {
    let mut violations = Vec::new();

    for file in production_sources() {
        for (idx, line) in file.lines.iter().enumerate() {
            let code = code_part(line);

            // Never acceptable, sync or not
            if code.contains("reqwest::blocking") {
                violations.push(file.violation(idx, "Blocking HTTP client"));
                continue;
            }

            if enclosing_fn(&file.lines, idx) != Some(FnKind::Async) {
                continue;
            }
            for (pattern, what) in BLOCKING_IN_ASYNC {
                if code.contains(pattern) {
                    violations.push(file.violation(idx, what));
                }
            }
        }
    }

    if !violations.is_empty() {
        eprintln!("\nBlocking I/O found in async code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nRequired: tokio::io / tokio::fs / async reqwest inside async fns.");

        panic!("Found {} blocking I/O violation(s)", violations.len());
    }
}

#[test]
fn test_config_file_read_stays_synchronous() {
    let files = production_sources();
    let config = files
        .iter()
        .find(|f| f.path.ends_with("config.rs"))
        .expect("config.rs scanned");

    let reads: Vec<usize> = config
        .lines
        .iter()
        .enumerate()
        .filter(|(_, line)| code_part(line).contains("std::fs::read_to_string"))
        .map(|(idx, _)| idx)
        .collect();

    assert!(!reads.is_empty());
    for idx in reads {
        assert_eq!(enclosing_fn(&config.lines, idx), Some(FnKind::Sync));
    }
}
