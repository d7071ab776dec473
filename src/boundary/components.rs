// src/boundary/components.rs

//! `Components.config`: the per-application file that tells a boundary how
//! to find the workload's entry point.
//!
//! ```toml
//! [entry]
//! locator = "orders"            # in-process catalog key
//! command = "bin/orders-svc"    # child process, relative to the base path
//! args = ["--port", "8080"]
//! ready_on_stdout = "^listening"
//! ready_timeout = "10s"
//!
//! [env]
//! ORDERS_MODE = "prod"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::errors::BoundaryError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentsConfig {
    #[serde(default)]
    pub entry: EntrySection,

    /// Extra environment for out-of-process workloads.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[entry]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntrySection {
    /// Catalog key of an in-process workload. Defaults to the boundary name.
    #[serde(default)]
    pub locator: Option<String>,

    /// Program to run for out-of-process workloads.
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    /// Regex a stdout line must match before the workload counts as started.
    #[serde(default)]
    pub ready_on_stdout: Option<String>,

    /// How long to wait for `ready_on_stdout` (e.g. `"10s"`).
    #[serde(default)]
    pub ready_timeout: Option<String>,
}

impl ComponentsConfig {
    pub fn load(path: &Path) -> Result<Self, BoundaryError> {
        let contents = std::fs::read_to_string(path).map_err(|e| BoundaryError::Components {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(path, &contents)
    }

    pub fn parse(path: &Path, contents: &str) -> Result<Self, BoundaryError> {
        toml::from_str(contents).map_err(|e| BoundaryError::Components {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = ComponentsConfig::parse(Path::new("Components.config"), "").unwrap();
        assert!(cfg.entry.locator.is_none());
        assert!(cfg.entry.command.is_none());
        assert!(cfg.env.is_empty());
    }

    #[test]
    fn full_entry_section_parses() {
        let cfg = ComponentsConfig::parse(
            Path::new("Components.config"),
            r#"
[entry]
command = "bin/orders"
args = ["--port", "8080"]
ready_on_stdout = "^listening"
ready_timeout = "3s"

[env]
MODE = "prod"
"#,
        )
        .unwrap();

        assert_eq!(cfg.entry.command.as_deref(), Some("bin/orders"));
        assert_eq!(cfg.entry.args, vec!["--port", "8080"]);
        assert_eq!(cfg.entry.ready_on_stdout.as_deref(), Some("^listening"));
        assert_eq!(cfg.entry.ready_timeout.as_deref(), Some("3s"));
        assert_eq!(cfg.env.get("MODE").map(String::as_str), Some("prod"));
    }

    #[test]
    fn malformed_file_is_a_components_error() {
        let err = ComponentsConfig::parse(Path::new("Components.config"), "[entry\n").unwrap_err();
        assert!(matches!(err, BoundaryError::Components { .. }));
    }
}
