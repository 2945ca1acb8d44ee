//! Doc comments: the run of `--` lines directly above a function definition.
//!
//! ```lua
//! -- Computes the bag weight
//! --@param bag table the bag
//! --@return number total weight
//! function weight(bag)
//! ```
//!
//! Lines are visited nearest-first and pushed to the front of their list, so
//! every list ends up in source order.

use crate::model::{FunctionInfo, Location, ParamInfo};
use crate::patterns;
use indexmap::IndexMap;
use std::collections::VecDeque;

/// How far above a definition the lookback goes.
pub const MAX_DOC_LINES: usize = 10;

/// Documentation gathered for one function, in source order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DocComment {
    pub description: Vec<String>,
    pub params: Vec<(String, ParamInfo)>,
    pub returns: Vec<ParamInfo>,
}

enum DocLine {
    Text(String),
    Param(String, ParamInfo),
    Return(ParamInfo),
    Malformed,
}

/// Collect the doc comment above line `def_line` of `lines`.
pub fn collect(lines: &[&str], def_line: usize) -> DocComment {
    let mut description = VecDeque::new();
    let mut params = VecDeque::new();
    let mut returns = VecDeque::new();

    for above in lines[..def_line].iter().rev().take(MAX_DOC_LINES) {
        let trimmed = above.trim();
        if trimmed.is_empty() || !trimmed.starts_with("--") {
            break;
        }
        match classify(trimmed.trim_start_matches('-').trim_start()) {
            DocLine::Text(text) => description.push_front(text),
            DocLine::Param(name, info) => params.push_front((name, info)),
            DocLine::Return(info) => returns.push_front(info),
            DocLine::Malformed => {}
        }
    }

    DocComment {
        description: description.into(),
        params: params.into(),
        returns: returns.into(),
    }
}

fn classify(body: &str) -> DocLine {
    if let Some(rest) = body.strip_prefix("@return") {
        let rest = rest.trim();
        return match patterns::return_tag(rest) {
            Some((ty, detail)) => DocLine::Return(ParamInfo {
                ty: ty.to_string(),
                detail: detail.to_string(),
                text: rest.to_string(),
            }),
            None => DocLine::Malformed,
        };
    }
    if let Some(rest) = body.strip_prefix("@param") {
        let rest = rest.trim();
        return match patterns::param_tag(rest) {
            Some((name, ty, detail)) => DocLine::Param(
                name.to_string(),
                ParamInfo {
                    ty: ty.to_string(),
                    detail: detail.to_string(),
                    text: rest.to_string(),
                },
            ),
            None => DocLine::Malformed,
        };
    }
    DocLine::Text(body.to_string())
}

impl DocComment {
    /// `function name(p: type, ...)`, followed by one tab-indented
    /// `->N. type\t-- detail` line per return value.
    pub fn title(&self, name: &str) -> String {
        let params = self
            .params
            .iter()
            .map(|(param, info)| format!("{param}: {}", info.ty))
            .collect::<Vec<_>>()
            .join(", ");
        let mut title = format!("function {name}({params})");
        if !self.returns.is_empty() {
            let returns = self
                .returns
                .iter()
                .enumerate()
                .map(|(i, info)| format!("->{}. {}\t-- {}", i + 1, info.ty, info.detail))
                .collect::<Vec<_>>()
                .join("\n\t");
            title.push_str("\n\t");
            title.push_str(&returns);
        }
        title
    }

    pub fn into_function(self, name: &str, location: Location) -> FunctionInfo {
        let title = self.title(name);
        FunctionInfo {
            name: name.to_string(),
            title,
            detail: self.description.join(" "),
            location,
            // A repeated @param keeps its first position and its last text.
            params: self.params.into_iter().collect::<IndexMap<_, _>>(),
            returns: self.returns,
        }
    }
}
