//! Integration Test: Virtual Clock and Injected Randomness
//!
//! **Policy**: The sequencer and the controller take time as an argument.
//! They never read the wall clock, so playback can be stepped in tests.
//! Random draws go through the `Jitter` trait; only `animation/timing.rs`
//! touches `rand` directly.

use architectural_enforcement::{fail_on, production_sources};

#[test]
fn test_playback_never_reads_the_wall_clock() {
    let mut violations = Vec::new();

    for file in production_sources() {
        let on_virtual_clock =
            file.path.starts_with("oracle/core/src/animation") || file.is("oracle.rs");
        if !on_virtual_clock {
            continue;
        }
        for (line_number, code) in file.code_lines() {
            if code.contains("Instant") || code.contains("SystemTime") || code.contains("Utc::now")
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

    fail_on(&violations, "Playback code reads the wall clock");
}

#[test]
fn test_rand_is_confined_to_the_jitter_source() {
    let mut violations = Vec::new();

    for file in production_sources() {
        if file.is("animation/timing.rs") {
            continue;
        }
        for (line_number, code) in file.code_lines() {
            if code.contains("rand::") || code.contains("thread_rng") {
                violations.push(format!(
                    "{}:{} - {}",
                    file.path.display(),
                    line_number,
                    code.trim()
                ));
            }
        }
    }

    fail_on(&violations, "Randomness bypasses the Jitter trait");
}
