//! Permit-rule matching for the authentication layer
//!
//! Patterns are paths with an optional method prefix:
//!
//! - `/health` matches that exact path
//! - `GET /ready` matches only `GET` requests
//! - `*` and `{name}` match a single path segment
//! - `**` matches any number of segments; a trailing `/**` also matches the
//!   bare prefix, so `/api/**` covers `/api` and `/api/users/1`

use axum::http::Method;
use regex::Regex;

use crate::error::{Error, Result};

/// One compiled permit rule
#[derive(Debug, Clone)]
struct PermitRule {
    original: String,
    method: Option<Method>,
    regex: Regex,
}

/// Compiled permit list; anything not matched requires authentication
#[derive(Debug, Clone, Default)]
pub struct AccessRules {
    rules: Vec<PermitRule>,
}

impl AccessRules {
    /// Compile permit patterns
    ///
    /// Fails on a pattern that does not start with `/` after its optional
    /// method prefix.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let rules = patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                let (method, path) = parse_method_prefix(pattern);
                if !path.starts_with('/') {
                    return Err(Error::from(figment::Error::from(format!(
                        "Permit pattern must be an absolute path: '{}'",
                        pattern
                    ))));
                }
                let regex = Regex::new(&compile_pattern_to_regex(path)).map_err(|e| {
                    Error::from(figment::Error::from(format!(
                        "Invalid permit pattern '{}': {}",
                        pattern, e
                    )))
                })?;
                Ok(PermitRule {
                    original: pattern.trim().to_string(),
                    method,
                    regex,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// Whether a request may pass without credentials
    pub fn is_permitted(&self, method: &Method, path: &str) -> bool {
        self.matching_rule(method, path).is_some()
    }

    /// The first permit pattern that matches, if any
    pub fn matching_rule(&self, method: &Method, path: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| {
                rule.method.as_ref().is_none_or(|m| m == method) && rule.regex.is_match(path)
            })
            .map(|rule| rule.original.as_str())
    }

    /// Number of compiled rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when nothing is permitted anonymously
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Split `"POST /api/users"` into `(Some(POST), "/api/users")`
fn parse_method_prefix(pattern: &str) -> (Option<Method>, &str) {
    let trimmed = pattern.trim();

    if let Some((head, rest)) = trimmed.split_once(char::is_whitespace) {
        let rest = rest.trim_start();
        if rest.starts_with('/') {
            if let Ok(method) = Method::from_bytes(head.as_bytes()) {
                return (Some(method), rest);
            }
        }
    }

    (None, trimmed)
}

fn compile_pattern_to_regex(pattern: &str) -> String {
    let (body, open_tail) = match pattern.strip_suffix("/**") {
        Some(prefix) => (prefix, true),
        None => (pattern, false),
    };

    let mut regex_str = String::from("^");
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    regex_str.push_str(".*");
                } else {
                    regex_str.push_str("[^/]+");
                }
            }
            '{' => {
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                }
                regex_str.push_str("[^/]+");
            }
            '.' | '+' | '?' | '(' | ')' | '[' | ']' | '^' | '$' | '|' | '\\' => {
                regex_str.push('\\');
                regex_str.push(c);
            }
            _ => regex_str.push(c),
        }
    }

    if open_tail {
        regex_str.push_str("(/.*)?");
    }
    regex_str.push('$');
    regex_str
}
