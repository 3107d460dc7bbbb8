//! Regex replacement templates.
//!
//! Templates are scanned once, left to right, by a three-state machine:
//!
//! ```text
//! Normal ──'\'──▶ AfterBackslash ──'$' or '\'──▶ literal char, Normal
//!    │                  └──────other──────────▶ literal '\' + char, Normal
//!    └────'$'──▶ Placeholder ──[A-Za-z0-9_]──▶ Placeholder
//!                     └──other──▶ $name reference (or literal '$' if no name),
//!                                 char re-read in Normal
//! ```
//!
//! Every `$name` / `$N` reference must resolve to a capture group of the
//! rule's pattern; that is checked when the rule compiles.

use regex::{Captures, Regex};

use crate::redirects::error::CompileErrorKind;

/// Output of [`scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    /// `$name` or `$N`, without the `$`.
    Placeholder(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    AfterBackslash,
    Placeholder,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Tokenize a template. Adjacent literal text is merged.
pub fn scan(template: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut name = String::new();
    let mut state = State::Normal;

    let mut chars = template.chars().peekable();
    while let Some(&c) = chars.peek() {
        match state {
            State::Normal => {
                match c {
                    '\\' => state = State::AfterBackslash,
                    '$' => state = State::Placeholder,
                    _ => literal.push(c),
                }
                chars.next();
            }
            State::AfterBackslash => {
                if c != '$' && c != '\\' {
                    literal.push('\\');
                }
                literal.push(c);
                state = State::Normal;
                chars.next();
            }
            State::Placeholder => {
                if is_word_char(c) {
                    name.push(c);
                    chars.next();
                    continue;
                }
                // Leave `c` unconsumed so Normal sees it.
                close_placeholder(&mut tokens, &mut literal, &mut name);
                state = State::Normal;
            }
        }
    }

    match state {
        State::Normal => {}
        State::AfterBackslash => literal.push('\\'),
        State::Placeholder => close_placeholder(&mut tokens, &mut literal, &mut name),
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

fn close_placeholder(tokens: &mut Vec<Token>, literal: &mut String, name: &mut String) {
    if name.is_empty() {
        literal.push('$');
        return;
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }
    tokens.push(Token::Placeholder(std::mem::take(name)));
}

/// Index of the group a placeholder refers to: a group name, or a decimal
/// position between 1 and the group count.
fn group_index(pattern: &Regex, name: &str) -> Option<usize> {
    if let Some(idx) = pattern.capture_names().position(|n| n == Some(name)) {
        return Some(idx);
    }
    let idx: usize = name.parse().ok()?;
    (idx >= 1 && idx < pattern.captures_len() && idx.to_string() == name).then_some(idx)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Group(usize),
}

/// A template with every placeholder resolved to a capture group index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pieces: Vec<Piece>,
}

impl Replacement {
    /// Scan `template` and bind its placeholders to groups of `pattern`.
    pub fn compile(template: &str, pattern: &Regex) -> Result<Self, CompileErrorKind> {
        let pieces = scan(template)
            .into_iter()
            .map(|token| match token {
                Token::Literal(text) => Ok(Piece::Literal(text)),
                Token::Placeholder(name) => group_index(pattern, &name)
                    .map(Piece::Group)
                    .ok_or(CompileErrorKind::UndefinedPlaceholder(name)),
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { pieces })
    }

    /// Build the destination from a successful match. A group that did not
    /// participate in the match contributes an empty string.
    pub fn expand(&self, captures: &Captures<'_>) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Group(idx) => {
                    out.push_str(captures.get(*idx).map(|m| m.as_str()).unwrap_or(""))
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> Token {
        Token::Literal(s.into())
    }

    fn ph(s: &str) -> Token {
        Token::Placeholder(s.into())
    }

    fn expand(pattern: &str, template: &str, input: &str) -> String {
        let re = Regex::new(pattern).unwrap();
        let replacement = Replacement::compile(template, &re).unwrap();
        replacement.expand(&re.captures(input).unwrap())
    }

    #[test]
    fn test_scan_placeholders() {
        assert_eq!(scan("/articles/$1"), vec![lit("/articles/"), ph("1")]);
        assert_eq!(
            scan("/orders/$orderId/items/$2"),
            vec![lit("/orders/"), ph("orderId"), lit("/items/"), ph("2")]
        );
        assert_eq!(scan("$a$b"), vec![ph("a"), ph("b")]);
    }

    #[test]
    fn test_scan_escapes() {
        assert_eq!(scan(r"\$20"), vec![lit("$20")]);
        assert_eq!(scan(r"\$\$\$"), vec![lit("$$$")]);
        assert_eq!(scan(r"\\"), vec![lit(r"\")]);
        assert_eq!(scan(r"/new\path\$"), vec![lit(r"/new\path$")]);
        assert_eq!(scan(r"\$$name"), vec![lit("$"), ph("name")]);
        assert_eq!(scan(r"trailing\"), vec![lit(r"trailing\")]);
    }

    #[test]
    fn test_scan_bare_dollar_is_literal() {
        assert_eq!(scan("cost: $"), vec![lit("cost: $")]);
        assert_eq!(scan("$-x"), vec![lit("$-x")]);
        assert_eq!(scan("$$1"), vec![lit("$"), ph("1")]);
        assert_eq!(scan("$\\$"), vec![lit("$$")]);
    }

    #[test]
    fn test_compile_rejects_unknown_groups() {
        let re = Regex::new(r"^/user/(?P<foobar>[^/]+)$").unwrap();
        assert_eq!(
            Replacement::compile("/profile/$username", &re),
            Err(CompileErrorKind::UndefinedPlaceholder("username".into()))
        );
        assert!(Replacement::compile("/profile/$2", &re).is_err());
        assert!(Replacement::compile("/profile/$0", &re).is_err());
        assert!(Replacement::compile("/profile/$01", &re).is_err());
        assert!(Replacement::compile("/profile/$1/$foobar", &re).is_ok());
    }

    #[test]
    fn test_expand() {
        assert_eq!(expand(r"^/blog/(.+)$", "/articles/$1", "/blog/my-post"), "/articles/my-post");
        assert_eq!(
            expand(r"^/order/(?P<orderId>\d+)/item/(\d+)$", "/orders/$orderId/items/$2", "/order/456/item/789"),
            "/orders/456/items/789"
        );
        assert_eq!(expand(r"^/product/(\d+)$", r"/store/item/$1?price=\$20", "/product/123"), "/store/item/123?price=$20");
        assert_eq!(expand(r"^/x(/y)?$", "/z$1", "/x"), "/z");
    }
}
