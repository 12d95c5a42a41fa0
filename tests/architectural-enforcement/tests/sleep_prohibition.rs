//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT call sleep methods. Animation timing
//! lives on the virtual clock; only the console driver waits, and it waits
//! for the next deadline with `sleep_until`, never a fixed nap.

use architectural_enforcement::{fail_on, production_sources};

#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();

    for file in production_sources() {
        for (line_number, code) in file.code_lines() {
            if code.contains("::sleep(") || code.contains(".sleep(") || code.contains("thread::sleep")
            {
                violations.push(format!(
                    "{}:{} - {}",
                    file.path.display(),
                    line_number,
                    code.trim()
                ));
            }
        }
    }

    fail_on(&violations, "CRITICAL: Sleep calls found in production code!");
}

#[test]
fn test_only_the_console_waits_for_deadlines() {
    let mut violations = Vec::new();

    for file in production_sources() {
        if file.path.starts_with("oracle/console") {
            continue;
        }
        for (line_number, code) in file.code_lines() {
            if code.contains("sleep_until") || code.contains("tokio::time") {
                violations.push(format!(
                    "{}:{} - {}",
                    file.path.display(),
                    line_number,
                    code.trim()
                ));
            }
        }
    }

    fail_on(&violations, "Core code must not wait on timers");
}
