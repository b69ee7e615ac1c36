use regex::RegexSet;

use crate::{Error, Result};

/// Host matcher for AdGuard-style domain rules.
///
/// Supported syntax: `||` anchors at a domain boundary, `|` anchors at the
/// start of the host, a trailing `^` or `|` anchors at its end and `*` is a
/// wildcard. Anything else is a plain substring of the host. Blank lines and
/// `!` comments are skipped.
#[derive(Debug, Clone)]
pub struct AdGuardMatcher {
    rules: RegexSet,
}

impl AdGuardMatcher {
    pub fn new<I>(rules: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut patterns = Vec::new();
        for rule in rules {
            if let Some(pattern) = compile_rule(rule.as_ref())? {
                patterns.push(pattern);
            }
        }
        Ok(Self {
            rules: RegexSet::new(patterns)?,
        })
    }

    pub fn matches(&self, host: &str) -> bool {
        self.rules.is_match(host.trim_end_matches('.'))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile_rule(rule: &str) -> Result<Option<String>> {
    let rule = rule.trim();
    if rule.is_empty() || rule.starts_with('!') {
        return Ok(None);
    }
    if rule.starts_with("@@") || rule.contains('$') {
        return Err(Error::InvalidConfig(format!(
            "unsupported adguard rule: {rule}"
        )));
    }

    let (prefix, body) = if let Some(body) = rule.strip_prefix("||") {
        (r"^(?:.*\.)?", body)
    } else if let Some(body) = rule.strip_prefix('|') {
        ("^", body)
    } else {
        ("", rule)
    };
    let (body, suffix) = match body.strip_suffix('^').or(body.strip_suffix('|')) {
        Some(body) => (body, "$"),
        None => (body, ""),
    };
    if body.is_empty() || body.contains(['^', '|']) {
        return Err(Error::InvalidConfig(format!("invalid adguard rule: {rule}")));
    }

    let body = body
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Ok(Some(format!("(?i){prefix}{body}{suffix}")))
}
