// src/descriptor.rs

//! Immutable description of one deployable unit.

use std::io;
use std::path::{Path, PathBuf};

/// File name used when a descriptor does not name its config explicitly.
pub const DEFAULT_COMPONENTS_CONFIG: &str = "Components.config";

/// One deployable unit: where its binaries live, which config file drives
/// its boundary, and whether on-disk changes should trigger a reload.
///
/// Built once at group startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationDescriptor {
    name: String,
    source_path: PathBuf,
    config_path: PathBuf,
    watch: bool,
    shadow_copy: bool,
}

impl ApplicationDescriptor {
    /// Descriptor with `config_path = source_path/Components.config`,
    /// watching disabled and no shadow copy.
    pub fn new(name: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        let source_path = source_path.into();
        let config_path = source_path.join(DEFAULT_COMPONENTS_CONFIG);
        Self {
            name: name.into(),
            source_path,
            config_path,
            watch: false,
            shadow_copy: false,
        }
    }

    /// Override the config file. Relative paths are taken relative to the
    /// source directory.
    pub fn with_config_path(mut self, config_path: impl AsRef<Path>) -> Self {
        let config_path = config_path.as_ref();
        self.config_path = if config_path.is_absolute() {
            config_path.to_path_buf()
        } else {
            self.source_path.join(config_path)
        };
        self
    }

    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn with_shadow_copy(mut self, shadow_copy: bool) -> Self {
        self.shadow_copy = shadow_copy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn watch(&self) -> bool {
        self.watch
    }

    pub fn shadow_copy(&self) -> bool {
        self.shadow_copy
    }

    /// Absolute `(source, config)` paths. Neither needs to exist.
    pub fn resolved_paths(&self) -> io::Result<(PathBuf, PathBuf)> {
        Ok((
            std::path::absolute(&self.source_path)?,
            std::path::absolute(&self.config_path)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_components_config_in_source_dir() {
        let d = ApplicationDescriptor::new("Orders", "/apps/orders");
        assert_eq!(d.config_path(), Path::new("/apps/orders/Components.config"));
        assert!(!d.watch());
        assert!(!d.shadow_copy());
    }

    #[test]
    fn relative_config_is_joined_to_source() {
        let d = ApplicationDescriptor::new("Orders", "/apps/orders").with_config_path("conf/app.toml");
        assert_eq!(d.config_path(), Path::new("/apps/orders/conf/app.toml"));

        let d = d.with_config_path("/etc/orders.config");
        assert_eq!(d.config_path(), Path::new("/etc/orders.config"));
    }

    #[test]
    fn resolved_paths_are_absolute() {
        let d = ApplicationDescriptor::new("Orders", "relative/orders");
        let (src, cfg) = d.resolved_paths().unwrap();
        assert!(src.is_absolute());
        assert!(cfg.is_absolute());
        assert!(cfg.ends_with("relative/orders/Components.config"));
    }
}
