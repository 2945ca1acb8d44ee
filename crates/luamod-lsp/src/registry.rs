//! Module registry: the indexed view of every module file in the workspace.
//!
//! Keys are lowercased module names. Each tracked file also remembers the key
//! it produced last, so a rescan that renames or drops the `module(...)`
//! declaration removes the stale entry instead of leaving it behind.
//!
//! All methods take `&self`; the registry is shared as `Arc<Registry>` between
//! LSP request handlers and the blocking indexing task.

use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

use luamod_syntax::{module_key, ModuleInfo};

use crate::discover;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to walk module directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Files handled so far by the running (or last) bulk load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadProgress {
    pub processed: usize,
    pub total: usize,
}

impl std::fmt::Display for LoadProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.processed, self.total)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Candidate files found.
    pub files: usize,
    /// Files that declared a module.
    pub modules: usize,
    /// Files that could not be read.
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct Registry {
    modules: DashMap<String, Arc<ModuleInfo>>,
    /// Tracked file -> key of the module it produced, if any.
    files: DashMap<PathBuf, Option<String>>,
    processed: AtomicUsize,
    total: AtomicUsize,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every candidate file under `roots`, reporting progress after
    /// each file. Existing entries are kept; call [`Registry::clear`] first
    /// for a fresh index.
    pub fn load_all(&self, roots: &[PathBuf], mut on_progress: impl FnMut(LoadProgress)) -> LoadSummary {
        let mut files: Vec<PathBuf> = roots
            .iter()
            .flat_map(|root| discover::find_module_files(root))
            .collect();
        files.sort();
        files.dedup();

        let total = files.len();
        self.total.store(total, Ordering::Relaxed);
        self.processed.store(0, Ordering::Relaxed);

        let mut summary = LoadSummary {
            files: total,
            ..LoadSummary::default()
        };
        for path in &files {
            self.files.entry(path.clone()).or_insert(None);
            match self.on_file_changed(path) {
                Ok(Some(_)) => summary.modules += 1,
                Ok(None) => tracing::trace!("[registry] {} declares no module", path.display()),
                Err(e) => {
                    tracing::warn!("[registry] {e}");
                    summary.failed += 1;
                }
            }
            let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
            on_progress(LoadProgress { processed, total });
        }

        tracing::info!(
            "[registry] indexed {} modules from {} files ({} unreadable)",
            summary.modules,
            summary.files,
            summary.failed
        );
        summary
    }

    /// Re-read `path` from disk and rescan it.
    ///
    /// A read failure leaves any previous entry for the file untouched.
    pub fn on_file_changed(&self, path: &Path) -> Result<Option<Arc<ModuleInfo>>, IndexError> {
        let text = fs::read_to_string(path).map_err(|source| IndexError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.index_text(path, &text))
    }

    /// Scan `text` as the contents of `path` and update the registry.
    ///
    /// A module declared under the same name by another file is replaced.
    pub fn index_text(&self, path: &Path, text: &str) -> Option<Arc<ModuleInfo>> {
        let scanned = luamod_syntax::scan(text, path).map(Arc::new);
        let key = scanned.as_ref().map(|module| module.key());

        let previous = self.files.insert(path.to_path_buf(), key.clone()).flatten();
        if let Some(previous) = previous.filter(|prev| key.as_ref() != Some(prev)) {
            if self.remove_owned(&previous, path) {
                tracing::debug!("[registry] {} no longer declares {previous}", path.display());
            }
        }

        let module = scanned?;
        let key = module.key();
        if let Some(old) = self.modules.insert(key, Arc::clone(&module)) {
            if old.file_path != path {
                tracing::warn!(
                    "[registry] module {} from {} replaces the one from {}",
                    module.name,
                    path.display(),
                    old.file_path.display()
                );
            }
        }
        tracing::debug!(
            "[registry] {} -> {} ({} functions)",
            path.display(),
            module.name,
            module.functions.len()
        );
        Some(module)
    }

    /// Stop tracking `path` and drop the module it produced.
    pub fn forget(&self, path: &Path) -> Option<Arc<ModuleInfo>> {
        let (_, key) = self.files.remove(path)?;
        let key = key?;
        self.modules
            .remove_if(&key, |_, module| module.file_path == path)
            .map(|(_, module)| module)
    }

    /// Case-insensitive lookup by module name.
    pub fn lookup(&self, name: &str) -> Option<Arc<ModuleInfo>> {
        self.modules
            .get(&module_key(name))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of every module, sorted by name.
    pub fn modules(&self) -> Vec<Arc<ModuleInfo>> {
        let mut modules: Vec<_> = self
            .modules
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn progress(&self) -> LoadProgress {
        LoadProgress {
            processed: self.processed.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        self.modules.clear();
        self.files.clear();
        self.processed.store(0, Ordering::Relaxed);
        self.total.store(0, Ordering::Relaxed);
    }

    fn remove_owned(&self, key: &str, path: &Path) -> bool {
        self.modules
            .remove_if(key, |_, module| module.file_path == path)
            .is_some()
    }
}
