//! Route pattern compilation.
//!
//! A pattern is a literal path relative to its package, optionally containing
//! placeholders:
//!
//! - `[:name]` - mandatory parameter
//! - `[/:name]` - optional parameter, with an optional leading slash
//!
//! Patterns without placeholders match by prefix: the literal must equal the
//! remaining path or be followed by `/`, and any leftover segments are
//! captured positionally as `"0"`, `"1"`, ... The empty pattern is a prefix
//! of every path. Patterns with placeholders are
//! compiled to an anchored regex with one named group per placeholder, the
//! group body taken from the entry's constraint (or `[^/]+` when the
//! placeholder is unconstrained).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

#[allow(clippy::expect_used)]
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(/)?:([A-Za-z_][A-Za-z0-9_]*)\]").expect("placeholder regex is valid")
});

/// Body used for placeholders without a constraint
pub const DEFAULT_CONSTRAINT: &str = "[^/]+";

/// Compiled form of a route pattern
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    /// Literal prefix; leftover segments are captured positionally
    Prefix(String),
    /// Anchored regex with named groups
    Regex { regex: Regex, names: Vec<String> },
}

impl CompiledPattern {
    /// Compile `pattern` with `constraints`.
    ///
    /// Fails when a constraint names a parameter the pattern does not
    /// declare, or when the assembled regex does not compile.
    pub fn compile(pattern: &str, constraints: &HashMap<String, String>) -> Result<Self, String> {
        let pattern = pattern.trim_matches('/');
        let names: Vec<String> = PLACEHOLDER
            .captures_iter(pattern)
            .filter_map(|c| c.get(2).map(|m| m.as_str().to_string()))
            .collect();

        let mut unknown: Vec<&String> = constraints.keys().filter(|k| !names.contains(k)).collect();
        if !unknown.is_empty() {
            unknown.sort();
            return Err(format!(
                "constraint(s) {unknown:?} have no placeholder in pattern '{pattern}'"
            ));
        }

        if names.is_empty() {
            return Ok(CompiledPattern::Prefix(pattern.to_string()));
        }

        let mut source = String::with_capacity(pattern.len() * 2 + 2);
        source.push('^');
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(pattern) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            source.push_str(&regex::escape(&pattern[last..whole.start()]));
            let body = constraints
                .get(name.as_str())
                .map(String::as_str)
                .unwrap_or(DEFAULT_CONSTRAINT);
            if caps.get(1).is_some() {
                source.push_str(&format!("/?(?P<{}>{body})?", name.as_str()));
            } else {
                source.push_str(&format!("(?P<{}>{body})", name.as_str()));
            }
            last = whole.end();
        }
        source.push_str(&regex::escape(&pattern[last..]));
        source.push('$');

        let regex = Regex::new(&source)
            .map_err(|e| format!("pattern '{pattern}' compiles to an invalid regex: {e}"))?;
        Ok(CompiledPattern::Regex { regex, names })
    }

    /// Match the remaining path (package segment removed, no surrounding
    /// slashes). Returns the captured arguments on success.
    #[must_use]
    pub fn matches(&self, remaining: &str) -> Option<BTreeMap<String, String>> {
        match self {
            CompiledPattern::Prefix(literal) => {
                let rest = if literal.is_empty() {
                    remaining
                } else if remaining == literal {
                    ""
                } else {
                    remaining.strip_prefix(literal.as_str())?.strip_prefix('/')?
                };
                Some(positional(rest))
            }
            CompiledPattern::Regex { regex, names } => {
                let caps = regex.captures(remaining)?;
                let mut args = BTreeMap::new();
                for name in names {
                    if let Some(m) = caps.name(name) {
                        args.insert(name.clone(), m.as_str().to_string());
                    }
                }
                Some(args)
            }
        }
    }
}

fn positional(rest: &str) -> BTreeMap<String, String> {
    rest.split('/')
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(i, s)| (i.to_string(), s.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_optional_placeholder_round_trip() {
        let p = CompiledPattern::compile("update[/:id]", &constraints(&[("id", "[0-9]+")])).unwrap();
        let args = p.matches("update/42").unwrap();
        assert_eq!(args.get("id").map(String::as_str), Some("42"));
        assert!(p.matches("update").unwrap().is_empty());
        assert!(p.matches("update/abc").is_none());
    }

    #[test]
    fn test_mandatory_placeholder() {
        let p = CompiledPattern::compile(
            "view/[:slug]/page[/:page]",
            &constraints(&[("page", "[0-9]+")]),
        )
        .unwrap();
        let args = p.matches("view/hello-world/page/3").unwrap();
        assert_eq!(args["slug"], "hello-world");
        assert_eq!(args["page"], "3");
        assert!(p.matches("view//page").is_none());
    }

    #[test]
    fn test_literal_text_is_escaped() {
        let p = CompiledPattern::compile("a.b/[:x]", &HashMap::new()).unwrap();
        assert!(p.matches("a.b/1").is_some());
        assert!(p.matches("axb/1").is_none());
    }

    #[test]
    fn test_prefix_captures_leftover_positionally() {
        let p = CompiledPattern::compile("/profile/", &HashMap::new()).unwrap();
        assert!(p.matches("profile").unwrap().is_empty());
        let args = p.matches("profile/7/edit").unwrap();
        assert_eq!(args["0"], "7");
        assert_eq!(args["1"], "edit");
        assert!(p.matches("profiles").is_none());
    }

    #[test]
    fn test_empty_prefix_matches_everything() {
        let p = CompiledPattern::compile("", &HashMap::new()).unwrap();
        assert!(p.matches("").unwrap().is_empty());
        let args = p.matches("42/edit").unwrap();
        assert_eq!(args["0"], "42");
        assert_eq!(args["1"], "edit");
    }

    #[test]
    fn test_constraint_without_placeholder_rejected() {
        let err = CompiledPattern::compile("update", &constraints(&[("id", "[0-9]+")])).unwrap_err();
        assert!(err.contains("\"id\""));
        assert!(err.contains("update"));
    }

    #[test]
    fn test_invalid_constraint_regex_rejected() {
        let err = CompiledPattern::compile("x/[:id]", &constraints(&[("id", "([0-9]+")])).unwrap_err();
        assert!(err.contains("invalid regex"));
    }
}
