//! Destination URL synthesis for path rules.
//!
//! # Responsibilities
//! - Substitute bound placeholders into the `<to>` template
//! - Optionally append request query parameters the rule does not own
//!
//! # Design Decisions
//! - Substitution is a single left-to-right pass, so bound values are never
//!   re-scanned and the longest matching `:name` wins
//! - Query merging keeps the destination's own parameters first, then the
//!   request's unowned ones, both in original order
//! - Only the query component is rewritten; scheme, host, path and fragment
//!   pass through untouched, so absolute targets work unchanged

use std::collections::HashSet;

use crate::redirects::query::{self, QueryParam};
use crate::redirects::rule::PathRule;
use crate::redirects::{Bindings, COLON_SENTINEL, SPLAT};

/// Build the final destination for a matched path rule.
pub(crate) fn build(rule: &PathRule, bindings: &Bindings, raw_query: &str) -> String {
    let destination = substitute(&rule.to, bindings);
    if !rule.keep_query_params {
        return destination;
    }
    merge_query(&destination, rule.claimed_names(), raw_query)
}

/// Replace `*`, `:splat` and `:name` occurrences with their bound values and
/// turn colon sentinels back into `:`.
pub fn substitute(template: &str, bindings: &Bindings) -> String {
    let splat = bindings.get(SPLAT);
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(c) = rest.chars().next() {
        let after = &rest[c.len_utf8()..];

        if c == '*' {
            if let Some(value) = splat {
                out.push_str(value);
                rest = after;
                continue;
            }
        }

        if c == ':' {
            let longest = bindings
                .iter()
                .filter(|(name, _)| after.starts_with(name.as_str()))
                .max_by_key(|(name, _)| name.len());
            if let Some((name, value)) = longest {
                out.push_str(value);
                rest = &after[name.len()..];
                continue;
            }
        }

        out.push(if c == COLON_SENTINEL { ':' } else { c });
        rest = after;
    }
    out
}

/// Append every request parameter whose key is not owned by the rule or the
/// destination's own query.
pub fn merge_query<'a>(
    destination: &str,
    claimed: impl Iterator<Item = &'a str>,
    raw_query: &str,
) -> String {
    let (before_fragment, fragment) = match destination.split_once('#') {
        Some((head, frag)) => (head, Some(frag)),
        None => (destination, None),
    };
    let (base, own_query) = before_fragment.split_once('?').unwrap_or((before_fragment, ""));

    let mut params = query::parse_ordered(own_query);
    let claimed: HashSet<&str> = claimed.collect();
    let extra: Vec<QueryParam> = query::parse_ordered(raw_query)
        .into_iter()
        .filter(|p| {
            !claimed.contains(p.key.as_str()) && !params.iter().any(|own| own.key == p.key)
        })
        .collect();
    params.extend(extra);

    let mut out = String::from(base);
    let encoded = query::encode(&params);
    if !encoded.is_empty() {
        out.push('?');
        out.push_str(&encoded);
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
