//! Rule file parsing.
//!
//! # Responsibilities
//! - Skip blank lines and comments, strip inline comments outside quotes
//! - Parse `regexp "<pattern>" "<replacement>" <status>` lines
//! - Parse `<from> <to> <status>` path rule lines
//! - Validate every line fully before accepting it
//!
//! # Design Decisions
//! - Pure function of the input text; no shared parser state
//! - The first invalid line aborts the whole parse
//! - Line numbers in errors are 1-based and count every physical line

use regex::Regex;

use crate::redirects::error::{CompileError, CompileErrorKind};
use crate::redirects::path::PathPattern;
use crate::redirects::query::QueryConstraint;
use crate::redirects::replacement::Replacement;
use crate::redirects::rule::{PathRule, RedirectRule, RedirectStatus, RegexRule};
use crate::redirects::unescape_colons;

const REGEX_KEYWORD: &str = "regexp";
const KEEP_QUERY_SUFFIX: &str = "?!";

/// Parse a complete rule file into rules, in declaration order.
pub(crate) fn parse_rules(text: &str) -> Result<Vec<RedirectRule>, CompileError> {
    let mut rules = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let is_regex = line.starts_with(REGEX_KEYWORD);
        let line = strip_comment(line, is_regex).trim_end();

        let rule = if is_regex {
            parse_regex_line(line)
        } else {
            parse_path_line(line)
        };
        rules.push(rule.map_err(|kind| CompileError::new(idx + 1, kind))?);
    }

    Ok(rules)
}

/// Cut the line at the first `#` outside a quoted string. Only regex lines
/// have quoted strings; elsewhere `"` is an ordinary character.
fn strip_comment(line: &str, quoted: bool) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' if quoted => in_quotes = !in_quotes,
            '#' if !in_quotes => return &line[..i],
            _ => {}
        }
    }
    line
}

fn parse_status(word: &str) -> Result<RedirectStatus, CompileErrorKind> {
    RedirectStatus::from_keyword(word).ok_or_else(|| CompileErrorKind::Status(word.to_string()))
}

fn parse_path_line(line: &str) -> Result<RedirectRule, CompileErrorKind> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let &[from, to, status] = tokens.as_slice() else {
        return Err(CompileErrorKind::TokenCount(line.to_string()));
    };
    let status = parse_status(status)?;

    let (from, keep_query_params) = match from.strip_suffix(KEEP_QUERY_SUFFIX) {
        Some(stripped) => (stripped, true),
        None => (from, false),
    };
    let (from_path, from_query) = from.split_once('?').unwrap_or((from, ""));

    Ok(RedirectRule::Path(PathRule {
        from_path: PathPattern::compile(from_path)?,
        from_params: QueryConstraint::parse_list(from_query)?,
        to: unescape_colons(to),
        status,
        keep_query_params,
    }))
}

fn parse_regex_line(line: &str) -> Result<RedirectRule, CompileErrorKind> {
    let format_error = || CompileErrorKind::RegexFormat(line.to_string());

    let rest = &line[REGEX_KEYWORD.len()..];
    let (pattern, rest) = take_quoted(require_space(rest).ok_or_else(format_error)?)
        .ok_or_else(format_error)?;
    let (template, rest) = take_quoted(require_space(rest).ok_or_else(format_error)?)
        .ok_or_else(format_error)?;
    let status = require_space(rest).ok_or_else(format_error)?;
    if status.is_empty() || !status.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(format_error());
    }
    let status = parse_status(status)?;

    let pattern = Regex::new(&pattern).map_err(|e| CompileErrorKind::Regex(e.to_string()))?;
    let replacement = Replacement::compile(&template, &pattern)?;

    Ok(RedirectRule::Regex(RegexRule {
        pattern,
        replacement,
        status,
    }))
}

/// Require at least one leading whitespace character and skip all of it.
fn require_space(s: &str) -> Option<&str> {
    let trimmed = s.trim_start();
    (trimmed.len() < s.len()).then_some(trimmed)
}

/// Read a `"..."` literal, unescaping `\"` and `\\`. Other escapes are kept
/// verbatim for the regex engine or the replacement scanner.
fn take_quoted(s: &str) -> Option<(String, &str)> {
    let body = s.strip_prefix('"')?;
    let mut out = String::new();
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((out, &body[i + 1..])),
            '\\' => match chars.next() {
                Some((_, next @ ('"' | '\\'))) => out.push(next),
                Some((_, next)) => {
                    out.push('\\');
                    out.push(next);
                }
                None => return None,
            },
            _ => out.push(c),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redirects::path::Segment;
    use crate::redirects::query::QueryValue;

    fn kind(text: &str) -> CompileErrorKind {
        parse_rules(text).unwrap_err().kind
    }

    fn single_path_rule(text: &str) -> PathRule {
        match parse_rules(text).unwrap().pop() {
            Some(RedirectRule::Path(rule)) => rule,
            other => panic!("expected a path rule, got {other:?}"),
        }
    }

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let rules = parse_rules("\n   # heading\n\n/old /new permanent # trailing\n   ").unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].status(), RedirectStatus::Permanent);
    }

    #[test]
    fn test_path_rule_fields() {
        let rule = single_path_rule("/posts/:id?lang=:lang&v=2?! /p/:id TEMPORARY");
        assert!(rule.keep_query_params);
        assert_eq!(rule.status, RedirectStatus::Temporary);
        assert_eq!(rule.to, "/p/:id");
        assert_eq!(
            rule.from_path.segments(),
            &[Segment::Literal(String::new()), Segment::Literal("posts".into()), Segment::Param("id".into())]
        );
        assert_eq!(rule.from_params.len(), 2);
        assert_eq!(rule.from_params[0].value, QueryValue::Placeholder("lang".into()));
        assert_eq!(rule.from_params[1].value, QueryValue::Literal("2".into()));
    }

    #[test]
    fn test_token_count_errors() {
        for text in ["/old", "/old /new", "/old /new temporary extra", "this is an invalid rule"] {
            assert!(
                matches!(kind(text), CompileErrorKind::TokenCount(_) | CompileErrorKind::Status(_)),
                "{text}"
            );
        }
        assert!(matches!(kind("/old /new"), CompileErrorKind::TokenCount(_)));
    }

    #[test]
    fn test_error_reports_line_number() {
        let err = parse_rules("# comment\n/a /b permanent\n\n/c /d sometimes\n/e /f permanent").unwrap_err();
        assert_eq!(err.line, 4);
        assert_eq!(err.kind, CompileErrorKind::Status("sometimes".into()));
    }

    #[test]
    fn test_pattern_errors() {
        assert!(matches!(kind("/foo/*/bar /posts temporary"), CompileErrorKind::NonFinalSplat(_)));
        assert!(matches!(kind("/:splat/foo /posts temporary"), CompileErrorKind::NonFinalSplat(_)));
        assert!(matches!(kind("/foo:id/foo/* /x temporary"), CompileErrorKind::MidSegmentColon(_)));
        assert!(matches!(kind("/a/: /x temporary"), CompileErrorKind::EmptyPlaceholder(_)));
        assert!(matches!(kind("/a?id=: /x temporary"), CompileErrorKind::EmptyPlaceholder(_)));
    }

    #[test]
    fn test_regex_rule() {
        let rules = parse_rules(r#"regexp "^/old-path\\?ref=(\\w+)$" "/new-path?source=$1" temporary"#).unwrap();
        let RedirectRule::Regex(rule) = &rules[0] else {
            panic!("expected a regex rule");
        };
        assert_eq!(rule.pattern.as_str(), r"^/old-path\?ref=(\w+)$");
        assert_eq!(rule.apply("/old-path?ref=abc123").as_deref(), Some("/new-path?source=abc123"));
    }

    #[test]
    fn test_regex_rule_keeps_hash_inside_quotes() {
        let rules = parse_rules(r#"regexp "^/a#b$" "/c#d" permanent # comment"#).unwrap();
        let RedirectRule::Regex(rule) = &rules[0] else {
            panic!("expected a regex rule");
        };
        assert_eq!(rule.apply("/a#b").as_deref(), Some("/c#d"));
    }

    #[test]
    fn test_regex_rule_errors() {
        assert!(matches!(kind(r#"regexp "^/a$" permanent"#), CompileErrorKind::RegexFormat(_)));
        assert!(matches!(kind(r#"regexp "^/a$" "/b" permanent extra"#), CompileErrorKind::RegexFormat(_)));
        assert!(matches!(kind(r#"regexp "^/a$" "/b" forever"#), CompileErrorKind::Status(_)));
        assert!(matches!(kind(r#"regexp "^/(a$" "/b" permanent"#), CompileErrorKind::Regex(_)));
        assert_eq!(
            kind(r#"regexp "^/user/(.+)$" "/profile/$2" temporary"#),
            CompileErrorKind::UndefinedPlaceholder("2".into())
        );
    }

    #[test]
    fn test_take_quoted() {
        assert_eq!(take_quoted(r#""a\"b\\c\d" rest"#), Some((r#"a"b\c\d"#.to_string(), " rest")));
        assert_eq!(take_quoted(r#""unterminated"#), None);
        assert_eq!(take_quoted("no quote"), None);
    }

    #[test]
    fn test_strip_comment() {
        assert_eq!(strip_comment("/a /b permanent # note", false), "/a /b permanent ");
        let quoted = r##"regexp "\"#\"" "/x" permanent"##;
        assert_eq!(strip_comment(quoted, true), quoted);
        assert_eq!(strip_comment(r#"/a"b /c permanent # note"#, false), r#"/a"b /c permanent "#);
    }

    #[test]
    fn test_quote_in_path_rule_is_literal() {
        let rule = single_path_rule(r#"/a"b /c permanent # note"#);
        assert_eq!(rule.to, "/c");
        assert_eq!(rule.from_path.segments()[1], Segment::Literal(r#"a"b"#.into()));
    }
}
