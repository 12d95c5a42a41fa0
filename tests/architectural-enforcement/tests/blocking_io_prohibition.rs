//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Production code MUST NOT use blocking I/O once the runtime is
//! up. Use `tokio::fs`, `tokio::io` and `reqwest`'s async client.
//!
//! **Exception**: the config loader reads one small file during start-up,
//! before any task is spawned.

use architectural_enforcement::{fail_on, production_sources};

const FORBIDDEN: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("use std::fs", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("use std::net", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("reqwest::blocking", "Blocking HTTP client"),
    ("std::io::stdin", "Blocking terminal input"),
    ("println!", "Blocking terminal output"),
];

#[test]
fn test_no_blocking_io_in_production_code() {
    let mut violations = Vec::new();

    for file in production_sources() {
        if file.is("config/mod.rs") {
            continue;
        }
        for (line_number, code) in file.code_lines() {
            for (pattern, kind) in FORBIDDEN {
                if code.contains(pattern) {
                    violations.push(format!(
                        "{}:{} - {}: {}",
                        file.path.display(),
                        line_number,
                        kind,
                        code.trim()
                    ));
                }
            }
        }
    }

    fail_on(&violations, "CRITICAL: Blocking I/O calls found in production code!");
}
