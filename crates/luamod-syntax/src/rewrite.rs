//! Rewrites a `module("Name", ...)` file into a table-based module.
//!
//! Three passes over the original text, all feeding one edit buffer:
//!
//! 1. **Declarations**: `module("Name", ...);` becomes `Name = {};` and each
//!    column-0 `function name(` becomes `function Name.name(`.
//! 2. **Calls**: on the remaining lines, unqualified calls to the functions
//!    found in pass 1 become `Name.name(`.
//! 3. **Export**: `return Name;` is appended.
//!
//! ```text
//! module("Foo", package.seeall);     Foo = {};
//! function bar(x)                    function Foo.bar(x)
//!   return x                   =>      return x
//! end                                end
//! function baz()                     function Foo.baz()
//!   bar(1)                             Foo.bar(1)
//! end                                end
//!
//!                                    return Foo;
//! ```

use crate::edit::{apply_edits, EditBuffer, EditError, TextEdit};
use crate::model::{Position, Range};
use crate::patterns::{self, CallSites, NameSpan};
use crate::text::{lines, utf16_col, utf16_len};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// No `module("Name", ...);` statement: the file is left alone.
    NoChanges,
    Rewritten(ModuleRewrite),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRewrite {
    /// Name every definition and call is qualified with.
    pub module_name: String,
    /// Top-level functions found in pass 1, in source order.
    pub functions: Vec<String>,
    /// Disjoint edits against the original text, in document order.
    pub edits: Vec<TextEdit>,
}

impl ModuleRewrite {
    /// The rewritten text of `source`, which must be the text this rewrite
    /// was computed from.
    pub fn apply(&self, source: &str) -> Result<String, EditError> {
        apply_edits(source, &self.edits)
    }
}

/// Compute the edits that turn `text` into a table-based module.
pub fn rewrite(text: &str) -> Result<RewriteOutcome, EditError> {
    let lines = lines(text);
    // Declarations are matched per line, so one split across lines is not a
    // module statement at all.
    let Some(module) = lines
        .iter()
        .find_map(|line| patterns::module_statement(line))
        .map(|stmt| stmt.name)
    else {
        return Ok(RewriteOutcome::NoChanges);
    };

    let mut buffer = EditBuffer::new(text);
    let mut rewritten = vec![false; lines.len()];
    let mut functions: Vec<String> = Vec::new();

    // Pass 1: declarations and definitions
    for (index, line) in lines.iter().enumerate() {
        if let Some(stmt) = patterns::module_statement(line) {
            buffer.replace(span_range(index, line, stmt), format!("{} = {{}};", stmt.name))?;
            rewritten[index] = true;
            continue;
        }
        if let Some(def) = patterns::top_level_function(line) {
            buffer.replace(span_range(index, line, def), format!("{module}.{}", def.name))?;
            if !functions.iter().any(|f| f == def.name) {
                functions.push(def.name.to_string());
            }
            rewritten[index] = true;
        }
    }

    // Pass 2: calls to the module's own functions
    if let Some(calls) = CallSites::new(&functions) {
        for (index, line) in lines.iter().enumerate() {
            if rewritten[index] {
                continue;
            }
            for call in calls.find(line) {
                tracing::trace!("[rewrite] line {}: call {}", index + 1, call.name);
                buffer.replace(span_range(index, line, call), format!("{module}.{}(", call.name))?;
            }
        }
    }

    // Pass 3: export
    append_export(&mut buffer, &lines, module)?;

    tracing::debug!(
        "[rewrite] module {}: {} functions, {} edits",
        module,
        functions.len(),
        buffer.len()
    );
    Ok(RewriteOutcome::Rewritten(ModuleRewrite {
        module_name: module.to_string(),
        functions,
        edits: buffer.into_edits(),
    }))
}

fn span_range(index: usize, line: &str, span: NameSpan<'_>) -> Range {
    Range::on_line(
        index as u32,
        utf16_col(line, span.start),
        utf16_col(line, span.end),
    )
}

/// A blank last line is reused for the export; otherwise the export goes
/// after the last line, separated by an empty line.
fn append_export(buffer: &mut EditBuffer<'_>, lines: &[&str], module: &str) -> Result<(), EditError> {
    let export = format!("\nreturn {module};\n");
    let last_index = lines.len() - 1;
    let last = lines[last_index];
    if last.trim().is_empty() {
        buffer.insert(Position::new(last_index as u32, 0), export)
    } else {
        buffer.insert(
            Position::new(last_index as u32, utf16_len(last)),
            format!("\n{export}"),
        )
    }
}
