//! Data model for indexed Lua modules.

use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;

/// Zero-based line and UTF-16 column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Range between two columns of a single line.
    pub const fn on_line(line: u32, start: u32, end: u32) -> Self {
        Self::new(Position::new(line, start), Position::new(line, end))
    }

    /// Zero-width range at `pos`, used for insertions.
    pub const fn empty(pos: Position) -> Self {
        Self::new(pos, pos)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub path: PathBuf,
    pub range: Range,
}

/// One documented `@param` or `@return`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamInfo {
    #[serde(rename = "type")]
    pub ty: String,
    pub detail: String,
    /// The fragment after the tag, as written, for redisplay.
    pub text: String,
}

/// A function found by the indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionInfo {
    pub name: String,
    /// Synthesized one-line signature plus numbered return lines.
    pub title: String,
    /// Free-text description lines joined with spaces.
    pub detail: String,
    /// Spans exactly the function-name token of the definition line.
    pub location: Location,
    /// Declaration order.
    pub params: IndexMap<String, ParamInfo>,
    /// Declaration order.
    #[serde(rename = "return")]
    pub returns: Vec<ParamInfo>,
}

/// Everything indexed from one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleInfo {
    /// Declared name, original case.
    pub name: String,
    pub file_path: PathBuf,
    /// First-definition order; a later duplicate replaces the value in place.
    pub functions: IndexMap<String, FunctionInfo>,
}

impl ModuleInfo {
    /// Case-insensitive registry key.
    pub fn key(&self) -> String {
        module_key(&self.name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.get(name)
    }
}

/// Normalize a module name for case-insensitive lookup.
pub fn module_key(name: &str) -> String {
    name.to_lowercase()
}
