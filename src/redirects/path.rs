//! Segment pattern matching for path rules.
//!
//! # Responsibilities
//! - Split patterns and request paths on unescaped `/`
//! - Compile pattern segments into literals, placeholders and a trailing splat
//! - Match request paths segment by segment, binding placeholders
//!
//! # Design Decisions
//! - Patterns are validated once at compile time; matching never fails with an error
//! - An empty request segment never satisfies a named placeholder
//! - Literal comparison is exact and case-sensitive

use crate::redirects::error::CompileErrorKind;
use crate::redirects::{restore_colons, Bindings, COLON_SENTINEL, SPLAT};

/// One compiled pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// `:name`, binds a single non-empty request segment.
    Param(String),
    /// `*` or `:splat`, binds the rest of the path. Always last.
    Splat,
}

/// A compiled `<from-path>` pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a raw pattern as written in the rule file.
    pub fn compile(pattern: &str) -> Result<Self, CompileErrorKind> {
        let raw = split_segments(pattern);
        let last = raw.len().saturating_sub(1);
        let mut segments = Vec::with_capacity(raw.len());

        for (i, segment) in raw.into_iter().enumerate() {
            let compiled = if segment == "*" {
                if i != last {
                    return Err(CompileErrorKind::NonFinalSplat("*".into()));
                }
                Segment::Splat
            } else if let Some(name) = segment.strip_prefix(':') {
                if name == SPLAT {
                    if i != last {
                        return Err(CompileErrorKind::NonFinalSplat(":splat".into()));
                    }
                    Segment::Splat
                } else if name.contains(':') {
                    return Err(CompileErrorKind::MidSegmentColon(restore_colons(&segment)));
                } else if name.is_empty() {
                    return Err(CompileErrorKind::EmptyPlaceholder(segment));
                } else {
                    Segment::Param(restore_colons(name))
                }
            } else if segment.contains(':') {
                return Err(CompileErrorKind::MidSegmentColon(restore_colons(&segment)));
            } else {
                Segment::Literal(restore_colons(&segment))
            };
            segments.push(compiled);
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Match a decoded request path, returning the bound placeholders.
    pub fn matches(&self, path: &str) -> Option<Bindings> {
        let request: Vec<&str> = path.split('/').collect();
        let mut bindings = Bindings::new();

        for (i, segment) in self.segments.iter().enumerate() {
            let actual = *request.get(i)?;
            match segment {
                Segment::Splat => {
                    bindings.insert(SPLAT.to_string(), request[i..].join("/"));
                    return Some(bindings);
                }
                Segment::Param(name) => {
                    if actual.is_empty() {
                        return None;
                    }
                    bindings.insert(name.clone(), actual.to_string());
                }
                Segment::Literal(expected) => {
                    if expected != actual {
                        return None;
                    }
                }
            }
        }

        (self.segments.len() == request.len()).then_some(bindings)
    }

    /// Names this pattern can bind, `splat` included.
    pub fn placeholder_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Splat => Some(SPLAT),
            Segment::Literal(_) => None,
        })
    }
}

/// Split on unescaped `/`.
///
/// A backslash escapes the next character; `\:` becomes the colon sentinel so
/// it is never read as a placeholder marker.
pub(crate) fn split_segments(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(':') => current.push(COLON_SENTINEL),
                Some(next) => current.push(next),
                None => current.push('\\'),
            },
            '/' => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}
