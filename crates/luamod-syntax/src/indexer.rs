//! Module indexer: one pass over a file's lines.

use crate::doc;
use crate::model::{Location, ModuleInfo, Range};
use crate::patterns;
use crate::text::{lines, utf16_col};
use indexmap::IndexMap;
use std::path::Path;

/// Index a Lua source file.
///
/// Returns `None` when the text declares no `module("Name", ...)`; such files
/// are not module files and produce no entry.
pub fn scan(text: &str, path: &Path) -> Option<ModuleInfo> {
    let name = patterns::module_name(text)?;
    let lines = lines(text);
    let mut functions = IndexMap::new();

    for (index, line) in lines.iter().enumerate() {
        let Some(def) = patterns::function_definition(line) else {
            continue;
        };
        tracing::trace!("[indexer] {}:{} function {}", path.display(), index + 1, def.name);

        let location = Location {
            path: path.to_path_buf(),
            range: Range::on_line(
                index as u32,
                utf16_col(line, def.start),
                utf16_col(line, def.end),
            ),
        };
        let info = doc::collect(&lines, index).into_function(def.name, location);
        functions.insert(def.name.to_string(), info);
    }

    tracing::debug!(
        "[indexer] module {} from {}: {} functions",
        name,
        path.display(),
        functions.len()
    );
    Some(ModuleInfo {
        name: name.to_string(),
        file_path: path.to_path_buf(),
        functions,
    })
}
