//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - The discovery core stays free of UI-framework dependencies
//! - The TUI never talks to the backend directly
//! - No blocking sleeps in production code
//!
//! These tests are designed to catch violations early in the development cycle.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// The workspace root, resolved from this package's manifest directory.
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("manifest dir has a workspace root")
        .to_path_buf()
}

/// All Rust sources under the given workspace-relative directory.
pub fn rust_sources(relative: &str) -> Vec<PathBuf> {
    let dir = workspace_root().join(relative);
    WalkDir::new(&dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|entry| entry.into_path())
        .collect()
}

/// Files under `relative` with a non-comment line mentioning any of the
/// given needles. Comment lines are skipped so that documentation may talk
/// about what the code must not do.
pub fn files_mentioning(relative: &str, needles: &[&str]) -> Vec<(PathBuf, String)> {
    let mut hits = Vec::new();
    for path in rust_sources(relative) {
        let contents = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
        let code = contents
            .lines()
            .filter(|line| !line.trim_start().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        for needle in needles {
            if code.contains(needle) {
                hits.push((path.clone(), (*needle).to_string()));
            }
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_are_found() {
        assert!(
            !rust_sources("discovery/core/src").is_empty(),
            "expected discovery core sources under the workspace root"
        );
        assert!(!rust_sources("tui/src").is_empty());
    }

    /// The core is a headless library: any surface (TUI or otherwise) must
    /// be able to depend on it without dragging in a UI stack.
    #[test]
    fn test_discovery_core_has_no_ui_framework_imports() {
        let hits = files_mentioning("discovery/core/src", &["ratatui", "crossterm"]);
        assert!(
            hits.is_empty(),
            "UI framework references in discovery core: {hits:?}"
        );
    }

    /// All backend traffic goes through the core's transport; the TUI
    /// renders what the controller reduced and nothing else.
    #[test]
    fn test_tui_has_no_direct_backend_transport() {
        let hits = files_mentioning("tui/src", &["reqwest", "tungstenite"]);
        assert!(
            hits.is_empty(),
            "direct backend transport references in the TUI: {hits:?}"
        );
    }

    /// Blocking sleeps stall the single UI/event thread; waiting is always
    /// tokio's job.
    #[test]
    fn test_no_blocking_sleep_in_production_code() {
        for dir in ["discovery/core/src", "tui/src"] {
            let hits = files_mentioning(dir, &["std::thread::sleep", "thread::sleep"]);
            assert!(hits.is_empty(), "blocking sleep in {dir}: {hits:?}");
        }
    }
}
