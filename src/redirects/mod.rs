//! Redirect rule engine.
//!
//! # Data Flow
//! ```text
//! Rule Compilation (at startup or reload):
//!     rule file text
//!     → parser.rs (line grammar, comments, status keywords)
//!     → path.rs / query.rs / replacement.rs (compile + validate)
//!     → Engine (ordered, immutable)
//!
//! Per Request:
//!     request URI
//!     → Engine::resolve (parse URI, walk rules in order)
//!     → rule.rs (path + query match, or regex match)
//!     → destination.rs / replacement.rs (build destination)
//!     → Redirect or NoMatch
//! ```
//!
//! # Design Decisions
//! - Rules compiled once, immutable at runtime (shared without locks)
//! - Reload builds a new Engine and swaps it atomically, never mutates one
//! - First matching rule wins, in declaration order
//! - No match is an ordinary outcome, not an error
//! - Nothing is cached between requests

pub mod destination;
pub mod error;
mod parser;
pub mod path;
pub mod query;
pub mod replacement;
pub mod rule;

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::Uri;
use percent_encoding::percent_decode_str;

pub use error::{CompileError, CompileErrorKind, ResolveError};
pub use rule::{PathRule, RedirectRule, RedirectStatus, RegexRule};

/// Placeholder name bound by `*` and `:splat`.
pub(crate) const SPLAT: &str = "splat";

/// Stand-in for an escaped `\:` while patterns are split and validated.
pub(crate) const COLON_SENTINEL: char = '\0';

/// Placeholder values bound during one match attempt.
pub type Bindings = BTreeMap<String, String>;

/// Engine handle shared by request handlers and the reload task.
pub type SharedEngine = Arc<ArcSwap<Engine>>;

/// A matched rule's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub destination: String,
    pub status: RedirectStatus,
}

/// Result of evaluating a request against the rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Redirect(Redirect),
    NoMatch,
}

/// An ordered, compiled rule set.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    rules: Vec<RedirectRule>,
}

impl Engine {
    /// Compile rule file text. Any invalid line fails the whole compile.
    pub fn compile(text: &str) -> Result<Self, CompileError> {
        let rules = parser::parse_rules(text)?;
        Ok(Self { rules })
    }

    /// Wrap this engine for sharing and atomic replacement.
    pub fn into_shared(self) -> SharedEngine {
        Arc::new(ArcSwap::from_pointee(self))
    }

    pub fn rules(&self) -> &[RedirectRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate a request target (`/path?query` or an absolute URI).
    pub fn resolve(&self, request_uri: &str) -> Result<Resolution, ResolveError> {
        let invalid = |reason: String| ResolveError::InvalidUri {
            uri: request_uri.to_string(),
            reason,
        };

        let uri: Uri = request_uri.parse().map_err(|e| invalid(format!("{e}")))?;
        if uri.scheme().is_none() && !request_uri.starts_with('/') {
            return Err(invalid("expected an absolute path or absolute URI".into()));
        }

        let raw_path = uri.path();
        let raw_query = uri.query().unwrap_or("");
        let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or(raw_path);
        let path = decode_path(raw_path)?;

        for rule in &self.rules {
            let destination = match rule {
                RedirectRule::Path(rule) => rule.apply(&path, raw_query),
                RedirectRule::Regex(rule) => rule.apply(target),
            };
            if let Some(destination) = destination {
                return Ok(Resolution::Redirect(Redirect {
                    destination,
                    status: rule.status(),
                }));
            }
        }

        Ok(Resolution::NoMatch)
    }
}

impl FromStr for Engine {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

/// Percent-decode a request path, rejecting malformed escapes.
fn decode_path(raw: &str) -> Result<String, ResolveError> {
    let bytes = raw.as_bytes();
    for (i, _) in raw.match_indices('%') {
        let well_formed = bytes
            .get(i + 1..i + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !well_formed {
            return Err(ResolveError::InvalidEscape(raw.to_string()));
        }
    }
    Ok(percent_decode_str(raw).decode_utf8_lossy().into_owned())
}

/// `\:` becomes the colon sentinel and `\\` a single backslash; any other
/// backslash sequence is kept for later stages.
pub(crate) fn unescape_colons(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(':') => {
                    chars.next();
                    out.push(COLON_SENTINEL);
                    continue;
                }
                Some('\\') => {
                    chars.next();
                    out.push('\\');
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

pub(crate) fn restore_colons(s: &str) -> String {
    s.replace(COLON_SENTINEL, ":")
}
