//! Integration Test: Layering and Error Discipline
//!
//! **Policy**:
//! - The engine crate never pulls in CLI, subscriber or `anyhow` machinery;
//!   those belong to the player binary.
//! - Production code propagates errors instead of panicking on them.

use std::fs;

use architectural_enforcement::{production_sources, violation, workspace_root};

#[test]
fn test_core_has_no_host_dependencies() {
    let manifest = fs::read_to_string(workspace_root().join("stage/core/Cargo.toml"))
        .expect("core manifest readable");
    let (deps, _) = manifest
        .split_once("[dev-dependencies]")
        .unwrap_or((manifest.as_str(), ""));

    for forbidden in ["clap", "anyhow", "tracing-subscriber"] {
        assert!(
            !deps
                .lines()
                .any(|l| l.trim_start().starts_with(&format!("{forbidden} ="))),
            "stage-core must not depend on {forbidden}"
        );
    }
}

#[test]
fn test_core_does_not_use_host_crates() {
    let mut violations = Vec::new();
    for file in production_sources("stage/core/src") {
        for (line, code) in file.code_lines() {
            if code.contains("anyhow::") || code.contains("clap::") || code.contains("println!") {
                violations.push(violation(&file, line, code));
            }
        }
    }
    assert!(violations.is_empty(), "{}", violations.join("\n"));
}

#[test]
fn test_no_unwrap_in_production_code() {
    let mut violations = Vec::new();
    for dir in ["stage/core/src", "stage/player/src"] {
        for file in production_sources(dir) {
            for (line, code) in file.code_lines() {
                if code.contains(".unwrap()") || code.contains(".expect(") {
                    violations.push(violation(&file, line, code));
                }
            }
        }
    }

    assert!(
        violations.is_empty(),
        "unwrap/expect in production code:\n{}",
        violations.join("\n")
    );
}
