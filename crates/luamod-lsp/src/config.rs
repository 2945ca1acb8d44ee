//! Server and CLI configuration.
//!
//! The only setting that shapes indexing is the list of module directories,
//! relative to each workspace root. The server reads it from the client's
//! `initializationOptions`:
//!
//! ```json
//! { "moduleDirs": ["src"], "indexOnStartup": true }
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Module directories used when none are configured.
pub const DEFAULT_MODULE_DIRS: &[&str] = &["src"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Directories, relative to a workspace root, searched for module files.
    pub module_dirs: Vec<String>,
    /// Index every module directory once the client is initialized.
    pub index_on_startup: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            module_dirs: DEFAULT_MODULE_DIRS.iter().map(|d| d.to_string()).collect(),
            index_on_startup: true,
        }
    }
}

impl Config {
    /// Parse `initializationOptions`. Missing options give the defaults;
    /// malformed ones are logged and also give the defaults.
    pub fn from_init_options(options: Option<Value>) -> Self {
        match options {
            None | Some(Value::Null) => Self::default(),
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!("[config] ignoring malformed initializationOptions: {e}");
                Self::default()
            }),
        }
    }

    /// Defaults with `dirs` as the module directories, if any are given.
    pub fn with_module_dirs(dirs: Vec<String>) -> Self {
        let mut config = Self::default();
        if !dirs.is_empty() {
            config.module_dirs = dirs;
        }
        config
    }

    /// Absolute module directories under `workspace_root`.
    pub fn module_roots(&self, workspace_root: &Path) -> Vec<PathBuf> {
        self.module_dirs
            .iter()
            .map(|dir| workspace_root.join(dir))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let config = Config::from_init_options(None);
        assert_eq!(config.module_dirs, vec!["src"]);
        assert!(config.index_on_startup);
        assert_eq!(Config::from_init_options(Some(Value::Null)), config);
    }

    #[test]
    fn camel_case_options() {
        let config = Config::from_init_options(Some(json!({
            "moduleDirs": ["src/game/module", "lib"],
            "indexOnStartup": false
        })));
        assert_eq!(config.module_dirs, vec!["src/game/module", "lib"]);
        assert!(!config.index_on_startup);
    }

    #[test]
    fn partial_and_malformed_options() {
        let config = Config::from_init_options(Some(json!({ "indexOnStartup": false })));
        assert_eq!(config.module_dirs, vec!["src"]);

        let config = Config::from_init_options(Some(json!({ "moduleDirs": 3 })));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn module_roots_join_workspace() {
        let config = Config::with_module_dirs(vec!["a".into(), "b/c".into()]);
        assert_eq!(
            config.module_roots(Path::new("/ws")),
            vec![PathBuf::from("/ws/a"), PathBuf::from("/ws/b/c")]
        );
        assert_eq!(Config::with_module_dirs(Vec::new()), Config::default());
    }
}
