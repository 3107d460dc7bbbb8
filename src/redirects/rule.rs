//! Compiled rule types.
//!
//! A rule file line compiles to exactly one [`RedirectRule`]. Each variant
//! owns everything needed to match and build a destination, so evaluation
//! never re-parses rule text.

use axum::http::StatusCode;
use regex::Regex;

use crate::redirects::destination;
use crate::redirects::path::PathPattern;
use crate::redirects::query::{self, QueryConstraint};
use crate::redirects::replacement::Replacement;

/// Redirect status. Only 301 and 302 are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectStatus {
    /// `permanent` (301 Moved Permanently).
    Permanent,
    /// `temporary` (302 Found).
    Temporary,
}

impl RedirectStatus {
    /// Parse a status keyword, case-insensitively.
    pub fn from_keyword(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("permanent") {
            Some(Self::Permanent)
        } else if s.eq_ignore_ascii_case("temporary") {
            Some(Self::Temporary)
        } else {
            None
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Self::Permanent => 301,
            Self::Temporary => 302,
        }
    }
}

impl From<RedirectStatus> for StatusCode {
    fn from(status: RedirectStatus) -> Self {
        match status {
            RedirectStatus::Permanent => StatusCode::MOVED_PERMANENTLY,
            RedirectStatus::Temporary => StatusCode::FOUND,
        }
    }
}

/// A single compiled line of the rule file.
#[derive(Debug, Clone)]
pub enum RedirectRule {
    Path(PathRule),
    Regex(RegexRule),
}

impl RedirectRule {
    pub fn status(&self) -> RedirectStatus {
        match self {
            Self::Path(rule) => rule.status,
            Self::Regex(rule) => rule.status,
        }
    }
}

/// A segment-pattern rule with optional query constraints.
#[derive(Debug, Clone)]
pub struct PathRule {
    pub from_path: PathPattern,
    pub from_params: Vec<QueryConstraint>,
    /// Destination template; escaped colons are held as the internal sentinel.
    pub to: String,
    pub status: RedirectStatus,
    pub keep_query_params: bool,
}

impl PathRule {
    /// Match a decoded request path and raw query, returning the destination.
    pub(crate) fn apply(&self, path: &str, raw_query: &str) -> Option<String> {
        let mut bindings = self.from_path.matches(path)?;
        if !query::matches(&self.from_params, raw_query, &mut bindings) {
            return None;
        }
        Some(destination::build(self, &bindings, raw_query))
    }

    /// Every parameter name this rule claims, excluded from query merging.
    pub(crate) fn claimed_names(&self) -> impl Iterator<Item = &str> {
        self.from_path
            .placeholder_names()
            .chain(self.from_params.iter().flat_map(QueryConstraint::names))
    }
}

/// A full regular-expression rule over the raw request target.
#[derive(Debug, Clone)]
pub struct RegexRule {
    pub pattern: Regex,
    pub replacement: Replacement,
    pub status: RedirectStatus,
}

impl RegexRule {
    pub(crate) fn apply(&self, request_target: &str) -> Option<String> {
        let captures = self.pattern.captures(request_target)?;
        Some(self.replacement.expand(&captures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_keywords() {
        assert_eq!(RedirectStatus::from_keyword("permanent"), Some(RedirectStatus::Permanent));
        assert_eq!(RedirectStatus::from_keyword("TEMPORARY"), Some(RedirectStatus::Temporary));
        assert_eq!(RedirectStatus::from_keyword("Permanent"), Some(RedirectStatus::Permanent));
        assert_eq!(RedirectStatus::from_keyword("forever"), None);
        assert_eq!(RedirectStatus::from_keyword("301"), None);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RedirectStatus::Permanent.code(), 301);
        assert_eq!(RedirectStatus::Temporary.code(), 302);
        assert_eq!(StatusCode::from(RedirectStatus::Temporary), StatusCode::FOUND);
    }
}
