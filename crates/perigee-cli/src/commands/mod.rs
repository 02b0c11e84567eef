//! CLI subcommand implementations.

pub mod build;
pub mod deploy;
pub mod invoke;
pub mod local;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Directory holding named JSON payload fixtures.
const EVENTS_DIR: &str = "events";

/// The path a named payload fixture lives at.
fn event_fixture_path(name: &str) -> PathBuf {
    Path::new(EVENTS_DIR).join(format!("{name}.json"))
}

/// Read a named JSON payload fixture from the events folder.
pub fn read_event_fixture(name: &str) -> Result<Vec<u8>> {
    let path = event_fixture_path(name);
    std::fs::read(&path)
        .with_context(|| format!("the event fixture '{}' does not exist", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_path_is_under_the_events_folder() {
        assert_eq!(
            event_fixture_path("empty"),
            PathBuf::from("events/empty.json")
        );
    }

    #[test]
    fn missing_fixture_names_the_path() {
        let err = read_event_fixture("does-not-exist").unwrap_err();
        assert!(err.to_string().contains("events/does-not-exist.json"));
    }
}
