//! Query-string constraints and order-preserving query handling.

use url::form_urlencoded;

use crate::redirects::error::CompileErrorKind;
use crate::redirects::{restore_colons, unescape_colons, Bindings};

/// What a rule requires of one query key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// The first request value must equal this exactly.
    Literal(String),
    /// Any first value is accepted and bound under this name.
    Placeholder(String),
}

/// A `key[=value]` pair from the `?` part of a rule's `<from>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConstraint {
    pub key: String,
    pub value: QueryValue,
}

impl QueryConstraint {
    /// Parse an `&`-joined constraint list. Empty pairs are skipped.
    pub fn parse_list(query: &str) -> Result<Vec<Self>, CompileErrorKind> {
        let mut constraints = Vec::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = restore_colons(&unescape_colons(key));
            let value = unescape_colons(value);

            let value = match value.strip_prefix(':') {
                Some("") => return Err(CompileErrorKind::EmptyPlaceholder(pair.to_string())),
                Some(name) => QueryValue::Placeholder(restore_colons(name)),
                None => QueryValue::Literal(restore_colons(&value)),
            };
            constraints.push(Self { key, value });
        }
        Ok(constraints)
    }

    /// The key itself plus the placeholder name, if any.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        let bound = match &self.value {
            QueryValue::Placeholder(name) => Some(name.as_str()),
            QueryValue::Literal(_) => None,
        };
        std::iter::once(self.key.as_str()).chain(bound)
    }
}

/// Check every constraint against the request's raw query string.
///
/// Only the first value of a repeated key is considered. A missing key and a
/// mismatched literal both simply fail to match.
pub fn matches(constraints: &[QueryConstraint], raw_query: &str, bindings: &mut Bindings) -> bool {
    if constraints.is_empty() {
        return true;
    }
    let request = parse_ordered(raw_query);

    for constraint in constraints {
        let Some(first) = request.iter().find(|p| p.key == constraint.key) else {
            return false;
        };
        match &constraint.value {
            QueryValue::Placeholder(name) => {
                bindings.insert(name.clone(), first.value.clone());
            }
            QueryValue::Literal(expected) => {
                if *expected != first.value {
                    return false;
                }
            }
        }
    }
    true
}

/// A decoded query parameter. Sequences of these keep their original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParam {
    pub key: String,
    pub value: String,
}

/// Decode a raw query string, keeping pair order and duplicates.
pub fn parse_ordered(raw_query: &str) -> Vec<QueryParam> {
    form_urlencoded::parse(raw_query.as_bytes())
        .map(|(key, value)| QueryParam {
            key: key.into_owned(),
            value: value.into_owned(),
        })
        .collect()
}

/// Re-encode parameters in order. Empty values keep their `=`.
pub fn encode(params: &[QueryParam]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|p| (p.key.as_str(), p.value.as_str())))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints(q: &str) -> Vec<QueryConstraint> {
        QueryConstraint::parse_list(q).unwrap()
    }

    #[test]
    fn test_parse_list() {
        let parsed = constraints(r"id=:id&&lang=en&flag&name=foo\:bar");
        assert_eq!(
            parsed,
            vec![
                QueryConstraint { key: "id".into(), value: QueryValue::Placeholder("id".into()) },
                QueryConstraint { key: "lang".into(), value: QueryValue::Literal("en".into()) },
                QueryConstraint { key: "flag".into(), value: QueryValue::Literal(String::new()) },
                QueryConstraint { key: "name".into(), value: QueryValue::Literal("foo:bar".into()) },
            ]
        );
        assert!(QueryConstraint::parse_list("id=:").is_err());
    }

    #[test]
    fn test_placeholder_binds_first_value() {
        let mut bindings = Bindings::new();
        assert!(matches(&constraints("id=:post"), "id=123&id=456", &mut bindings));
        assert_eq!(bindings.get("post").map(String::as_str), Some("123"));
    }

    #[test]
    fn test_missing_key_or_mismatch_fails() {
        let mut bindings = Bindings::new();
        assert!(!matches(&constraints("id=:id"), "", &mut bindings));
        assert!(!matches(&constraints("lang=en"), "lang=fr", &mut bindings));
        assert!(matches(&constraints("lang=en"), "other=1&lang=en", &mut bindings));
        assert!(matches(&[], "anything=1", &mut bindings));
    }

    #[test]
    fn test_decoded_comparison() {
        let mut bindings = Bindings::new();
        assert!(matches(&constraints("name=foo:bar"), "name=foo%3Abar", &mut bindings));
        assert!(matches(&constraints("q=:q"), "q=hello+world", &mut bindings));
        assert_eq!(bindings.get("q").map(String::as_str), Some("hello world"));
    }

    #[test]
    fn test_ordered_round_trip_keeps_order_and_empty_values() {
        let params = parse_ordered("b=2&name&a=1&&b=3");
        let keys: Vec<_> = params.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "name", "a", "b"]);
        assert_eq!(encode(&params), "b=2&name=&a=1&b=3");
    }
}
