//! Cursor queries against the registry: hover/definition resolution,
//! completion candidates and markdown documentation.

use luamod_syntax::patterns::{self, MemberAccess};
use luamod_syntax::text::{byte_col, LineIndex};
use luamod_syntax::{FunctionInfo, Position};

use crate::registry::Registry;

/// A `Module.function` reference resolved through the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Module name as written at the cursor.
    pub module_name: String,
    pub function: FunctionInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionCandidate {
    pub name: String,
    pub function: FunctionInfo,
}

/// Resolve the `Module.function` expression under `position`.
pub fn resolve_at_position(registry: &Registry, text: &str, position: Position) -> Option<Resolved> {
    let access = access_at(text, position)?;
    let member = access.member?;
    let module = registry.lookup(access.module)?;
    let function = module.function(member)?.clone();
    Some(Resolved {
        module_name: access.module.to_string(),
        function,
    })
}

/// Every function of the module named before the last `.` ahead of the
/// cursor, in definition order.
pub fn completion_candidates(registry: &Registry, text: &str, position: Position) -> Vec<CompletionCandidate> {
    let Some(module) = access_at(text, position).and_then(|access| registry.lookup(access.module)) else {
        return Vec::new();
    };
    module
        .functions
        .values()
        .map(|function| CompletionCandidate {
            name: function.name.clone(),
            function: function.clone(),
        })
        .collect()
}

fn access_at(text: &str, position: Position) -> Option<MemberAccess<'_>> {
    let line = LineIndex::new(text).line(position.line as usize)?;
    // Clients may send a column past the end of the line.
    let cursor = byte_col(line, position.character).unwrap_or(line.len());
    patterns::member_access(line, cursor)
}

/// Markdown documentation for a function: its signature as a Lua block, an
/// optional `---` rule, the escaped description and a block of the raw
/// `@param` / `@return` tags.
pub fn format_doc(function: &FunctionInfo, include_separator: bool) -> String {
    let mut out = String::new();
    push_code_block(&mut out, &function.title);
    if include_separator {
        out.push_str("---\n");
    }
    out.push_str(&escape_markdown(&function.detail));

    let tags: Vec<String> = function
        .params
        .values()
        .map(|p| format!("@param {}", p.text))
        .chain(function.returns.iter().map(|r| format!("@return {}", r.text)))
        .collect();
    if !tags.is_empty() {
        push_code_block(&mut out, &tags.join("\n"));
    }
    out
}

fn push_code_block(out: &mut String, code: &str) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("```lua\n");
    out.push_str(code);
    out.push_str("\n```\n");
}

fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '`' | '*' | '_' | '{' | '}' | '[' | ']' | '(' | ')' | '#' | '+' | '-' | '!' | '~'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
