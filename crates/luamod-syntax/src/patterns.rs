//! The textual patterns the indexer and rewriter scan for.
//!
//! There is no Lua parser behind these: each matcher recognises one narrow
//! idiom on a single line (or, for module names, anywhere in the text).
//! Occurrences inside strings and comments are matched like any other.

use regex::Regex;
use std::sync::LazyLock;

// -- Regex patterns -----------------------------------------------------------

/// `module("Name", ...)` anywhere in the text.
static RE_MODULE_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"module\(["'](\w+)['"][,\s\w.]*\)"#).unwrap());

/// `module("Name", ...);`: the statement form the rewriter replaces.
static RE_MODULE_STMT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"module\(["'](\w+)['"][,\s\w.]*\);"#).unwrap());

/// `function name(` anywhere on a line.
static RE_FUNCTION_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bfunction\s+(\w+)\s*\(").unwrap());

/// `function name(` at column 0.
static RE_TOP_LEVEL_FUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^function\s+(\w+)\s*\(").unwrap());

/// `<type> <detail>` after `@return`.
static RE_RETURN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9.]+)\s+(.*)").unwrap());

/// `<name> <type> <detail>` after `@param`.
static RE_PARAM_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9.]+)\s+([A-Za-z0-9.]+)\s+(.*)").unwrap());

static RE_TRAILING_IDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+$").unwrap());

static RE_LEADING_IDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+").unwrap());

// -- Matchers -----------------------------------------------------------------

/// An identifier (or a larger matched construct) with its byte span on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameSpan<'a> {
    pub name: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Name from the first `module("Name", ...)` in `text`.
pub fn module_name(text: &str) -> Option<&str> {
    RE_MODULE_DECL
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// A `module("Name", ...);` statement on `line`. The span covers the whole
/// statement including its semicolon.
pub fn module_statement(line: &str) -> Option<NameSpan<'_>> {
    let caps = RE_MODULE_STMT.captures(line)?;
    let whole = caps.get(0)?;
    Some(NameSpan {
        name: caps.get(1)?.as_str(),
        start: whole.start(),
        end: whole.end(),
    })
}

/// A `function name(` definition anywhere on `line`; the span covers the name.
pub fn function_definition(line: &str) -> Option<NameSpan<'_>> {
    name_capture(&RE_FUNCTION_DEF, line)
}

/// A `function name(` definition starting at column 0; the span covers the name.
pub fn top_level_function(line: &str) -> Option<NameSpan<'_>> {
    name_capture(&RE_TOP_LEVEL_FUNCTION, line)
}

fn name_capture<'a>(re: &Regex, line: &'a str) -> Option<NameSpan<'a>> {
    let m = re.captures(line)?.get(1)?;
    Some(NameSpan {
        name: m.as_str(),
        start: m.start(),
        end: m.end(),
    })
}

/// `(type, detail)` from the text following `@return`.
pub fn return_tag(rest: &str) -> Option<(&str, &str)> {
    let caps = RE_RETURN_TAG.captures(rest)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// `(name, type, detail)` from the text following `@param`.
pub fn param_tag(rest: &str) -> Option<(&str, &str, &str)> {
    let caps = RE_PARAM_TAG.captures(rest)?;
    Some((
        caps.get(1)?.as_str(),
        caps.get(2)?.as_str(),
        caps.get(3)?.as_str(),
    ))
}

/// Finds unqualified calls to a fixed set of function names.
///
/// A call is `name(` where the character before `name` is neither a word
/// character nor `.` or `:`, so `obj.name(`, `obj:name(` and `xname(` are
/// left alone.
#[derive(Debug)]
pub struct CallSites {
    re: Regex,
}

impl CallSites {
    /// `None` when `names` is empty.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Option<Self> {
        if names.is_empty() {
            return None;
        }
        let alternation = names
            .iter()
            .map(|n| regex::escape(n.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        let re = Regex::new(&format!(r"\b(?:{alternation})\(")).ok()?;
        Some(Self { re })
    }

    /// Every call on `line`, left to right. The span covers `name(`.
    pub fn find<'a>(&self, line: &'a str) -> Vec<NameSpan<'a>> {
        self.re
            .find_iter(line)
            .filter(|m| !matches!(line[..m.start()].chars().next_back(), Some('.' | ':')))
            .map(|m| NameSpan {
                name: &line[m.start()..m.end() - 1],
                start: m.start(),
                end: m.end(),
            })
            .collect()
    }
}

/// `Module.member` under a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberAccess<'a> {
    pub module: &'a str,
    /// The identifier right after the dot, if any.
    pub member: Option<&'a str>,
}

/// Find the `Module.member` expression the cursor sits in.
///
/// Uses the last `.` before the byte offset `cursor`: the identifier ending
/// at that dot is the module, the identifier starting after it (on the whole
/// line) is the member.
pub fn member_access(line: &str, cursor: usize) -> Option<MemberAccess<'_>> {
    let before = line.get(..cursor)?;
    let dot = before.rfind('.')?;
    let module = RE_TRAILING_IDENT.find(&before[..dot])?.as_str();
    let member = RE_LEADING_IDENT
        .find(line[dot + 1..].trim())
        .map(|m| m.as_str());
    Some(MemberAccess { module, member })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_name_accepts_both_quotes() {
        assert_eq!(module_name("module(\"Foo\", package.seeall)"), Some("Foo"));
        assert_eq!(module_name("-- header\nmodule('BagUtil')\n"), Some("BagUtil"));
        assert_eq!(module_name("local M = {}\nreturn M\n"), None);
    }

    #[test]
    fn module_name_takes_first_declaration() {
        let text = "module(\"First\")\nmodule(\"Second\")\n";
        assert_eq!(module_name(text), Some("First"));
    }

    #[test]
    fn statement_form_requires_semicolon() {
        assert!(module_statement("module(\"Foo\", package.seeall)").is_none());
        let line = "  module(\"Foo\", package.seeall); -- legacy";
        let stmt = module_statement(line).unwrap();
        assert_eq!(stmt.name, "Foo");
        assert_eq!(&line[stmt.start..stmt.end], "module(\"Foo\", package.seeall);");
    }

    #[test]
    fn function_definition_spans_name() {
        let line = "local function helper (a, b)";
        let def = function_definition(line).unwrap();
        assert_eq!(def.name, "helper");
        assert_eq!(&line[def.start..def.end], "helper");
        assert!(function_definition("local x = myfunction foo(1)").is_none());
        assert!(function_definition("function Obj:method()").is_none());
    }

    #[test]
    fn top_level_requires_column_zero() {
        assert!(top_level_function("function run()").is_some());
        assert!(top_level_function("  function run()").is_none());
        assert!(top_level_function("local function run()").is_none());
    }

    #[test]
    fn doc_tags() {
        assert_eq!(return_tag("number the total"), Some(("number", "the total")));
        assert_eq!(return_tag("number"), None);
        assert_eq!(
            param_tag("id int32 player id"),
            Some(("id", "int32", "player id"))
        );
        assert_eq!(param_tag("cfg table.Config"), None);
    }

    #[test]
    fn call_sites_skip_qualified_calls() {
        let calls = CallSites::new(&["foo", "bar"]).unwrap();
        let line = "  foo(obj.foo(1), obj:bar(2), bar(3))";
        let found: Vec<_> = calls.find(line).iter().map(|c| (c.name, c.start)).collect();
        assert_eq!(found, vec![("foo", 2), ("bar", 30)]);
    }

    #[test]
    fn call_sites_respect_identifier_boundaries() {
        let calls = CallSites::new(&["foo"]).unwrap();
        assert!(calls.find("x1foo(1)").is_empty());
        assert!(calls.find("_foo(1)").is_empty());
        assert!(calls.find("foobar(1)").is_empty());
        assert_eq!(calls.find("foo(1)").len(), 1);
        assert_eq!(calls.find("foo(foo(1))").len(), 2);
    }

    #[test]
    fn call_sites_prefer_longest_alternative() {
        let calls = CallSites::new(&["get", "getAll"]).unwrap();
        let found = calls.find("local t = getAll(get(1))");
        let names: Vec<_> = found.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["getAll", "get"]);
    }

    #[test]
    fn no_names_no_matcher() {
        assert!(CallSites::new::<&str>(&[]).is_none());
    }

    #[test]
    fn member_access_uses_last_dot() {
        let line = "local v = BagUtil.getItem(id).count";
        let cursor = line.find("getItem").unwrap() + 3;
        let access = member_access(line, cursor).unwrap();
        assert_eq!(access.module, "BagUtil");
        assert_eq!(access.member, Some("getItem"));
    }

    #[test]
    fn member_access_without_member() {
        let line = "PlayerM.";
        let access = member_access(line, line.len()).unwrap();
        assert_eq!(access.module, "PlayerM");
        assert_eq!(access.member, None);
        assert!(member_access("no dot here", 5).is_none());
        assert!(member_access("(1).x", 4).is_none());
    }
}
