//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Only the per-character runner may wait. Pacing is data (the
//! executor returns delays), and the runner is the one place that awaits it.
//! Blocking `std::thread::sleep` is forbidden everywhere.

use architectural_enforcement::{production_sources, violation};

const ALLOWED_SLEEP: &str = "stage/core/src/playback/runner.rs";

#[test]
fn test_no_sleep_outside_runner() {
    let mut violations = Vec::new();

    for dir in ["stage/core/src", "stage/player/src"] {
        for file in production_sources(dir) {
            for (line, code) in file.code_lines() {
                let sleeps = code.contains("::sleep(") || code.contains(".sleep(");
                if sleeps && !file.is(ALLOWED_SLEEP) {
                    violations.push(violation(&file, line, code));
                }
            }
        }
    }

    if !violations.is_empty() {
        eprintln!("\nSleep calls found outside the runner:\n");
        for v in &violations {
            eprintln!("  {v}");
        }
        panic!("Found {} sleep violation(s)", violations.len());
    }
}

#[test]
fn test_no_blocking_sleep() {
    let mut violations = Vec::new();

    for dir in ["stage/core/src", "stage/player/src"] {
        for file in production_sources(dir) {
            for (line, code) in file.code_lines() {
                if code.contains("thread::sleep") {
                    violations.push(violation(&file, line, code));
                }
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Blocking sleep in async code:\n{}",
        violations.join("\n")
    );
}

#[test]
fn test_runner_sleeps_only_via_tokio() {
    let runner = production_sources("stage/core/src")
        .into_iter()
        .find(|f| f.is(ALLOWED_SLEEP))
        .expect("runner source present");

    for (line, code) in runner.code_lines() {
        if code.contains("sleep(") {
            assert!(
                code.contains("tokio::time::sleep"),
                "{}",
                violation(&runner, line, code)
            );
        }
    }
}
