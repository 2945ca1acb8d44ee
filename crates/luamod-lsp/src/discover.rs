//! Module file discovery.
//!
//! A candidate is a `.lua` file whose name ends in `M.lua` or `Util.lua`
//! (case-sensitive), found recursively under a module directory.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::registry::IndexError;

/// Glob the server registers with the client's file watcher.
pub const MODULE_GLOB: &str = "**/*{M,Util}.lua";

const MODULE_SUFFIXES: &[&str] = &["M.lua", "Util.lua"];

pub fn is_module_candidate(path: &Path) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some("lua") {
        return false;
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| MODULE_SUFFIXES.iter().any(|s| name.ends_with(s)))
}

/// A candidate file inside one of the module directories `roots`.
pub fn is_watched(path: &Path, roots: &[PathBuf]) -> bool {
    is_module_candidate(path) && roots.iter().any(|root| path.starts_with(root))
}

/// Every candidate file under `root`, sorted. Unreadable entries are logged
/// and skipped.
pub fn find_module_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_module_candidate(entry.path()) => {
                tracing::debug!("[discover] candidate {}", entry.path().display());
                files.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => {
                let e = IndexError::from(e);
                tracing::warn!("[discover] skipping entry under {}: {e}", root.display());
            }
        }
    }
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn candidate_names() {
        assert!(is_module_candidate(Path::new("src/PlayerM.lua")));
        assert!(is_module_candidate(Path::new("src/bag/BagUtil.lua")));
        assert!(is_module_candidate(Path::new("M.lua")));
        assert!(!is_module_candidate(Path::new("src/Playerm.lua")));
        assert!(!is_module_candidate(Path::new("src/bagutil.lua")));
        assert!(!is_module_candidate(Path::new("src/Player.lua")));
        assert!(!is_module_candidate(Path::new("src/PlayerM.lua.bak")));
        assert!(!is_module_candidate(Path::new("src/PlayerM.luac")));
    }

    #[test]
    fn watched_files_stay_inside_module_dirs() {
        let roots = vec![PathBuf::from("/ws/src"), PathBuf::from("/ws/lib")];
        assert!(is_watched(Path::new("/ws/src/PlayerM.lua"), &roots));
        assert!(is_watched(Path::new("/ws/lib/deep/BagUtil.lua"), &roots));
        assert!(!is_watched(Path::new("/ws/backup/PlayerM.lua"), &roots));
        // Component-wise prefix, not a string prefix.
        assert!(!is_watched(Path::new("/ws/src2/PlayerM.lua"), &roots));
        assert!(!is_watched(Path::new("/ws/src/player.lua"), &roots));
        assert!(!is_watched(Path::new("/ws/src/PlayerM.lua"), &[]));
    }

    #[test]
    fn finds_candidates_recursively() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("game/bag");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("PlayerM.lua"), "").unwrap();
        fs::write(nested.join("BagUtil.lua"), "").unwrap();
        fs::write(nested.join("config.lua"), "").unwrap();
        fs::create_dir_all(dir.path().join("DirM.lua")).unwrap();

        let files = find_module_files(dir.path());
        assert_eq!(
            files,
            vec![nested.join("BagUtil.lua"), dir.path().join("PlayerM.lua")]
        );
    }

    #[test]
    fn missing_root_yields_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(find_module_files(&dir.path().join("absent")).is_empty());
    }
}
