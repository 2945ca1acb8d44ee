//! luamod syntax library.
//!
//! Scans Lua files written in the legacy `module("Name", ...)` style without a
//! parser:
//!
//! - [`indexer::scan`] builds a [`ModuleInfo`] with every function and its doc
//!   comment (`@param`, `@return`, free text).
//! - [`rewrite::rewrite`] computes the edits that turn such a file into a
//!   table-based module (`Name = {}` ... `return Name;`).
//!
//! Shared by the `luamod-lsp` server and the `luamod` command-line tool.

pub mod doc;
pub mod edit;
pub mod indexer;
pub mod model;
pub mod patterns;
pub mod rewrite;
pub mod text;

pub use edit::{apply_edits, EditBuffer, EditError, TextEdit};
pub use indexer::scan;
pub use model::{module_key, FunctionInfo, Location, ModuleInfo, ParamInfo, Position, Range};
pub use rewrite::{rewrite, ModuleRewrite, RewriteOutcome};
