use std::collections::HashSet;

/// Exact domains plus domain suffixes, matched label by label.
///
/// A suffix without a leading dot (`example.com`) matches the domain itself
/// and all of its subdomains; with a leading dot (`.example.com`) it only
/// matches subdomains.
#[derive(Debug, Default, Clone)]
pub struct DomainMatcher {
    domains: HashSet<String>,
    suffixes: HashSet<String>,
    subdomain_suffixes: HashSet<String>,
}

impl DomainMatcher {
    pub fn new<D, S>(domains: D, suffixes: S) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let mut matcher = Self {
            domains: domains.into_iter().map(|d| normalize(d.as_ref())).collect(),
            ..Default::default()
        };
        for suffix in suffixes {
            let suffix = normalize(suffix.as_ref());
            if suffix.starts_with('.') {
                matcher.subdomain_suffixes.insert(suffix);
            } else {
                matcher.suffixes.insert(suffix);
            }
        }
        matcher
    }

    pub fn matches(&self, host: &str) -> bool {
        let host = normalize(host);
        if self.domains.contains(&host) || self.suffixes.contains(&host) {
            return true;
        }
        let mut rest = host.as_str();
        while let Some(idx) = rest.find('.') {
            if self.subdomain_suffixes.contains(&rest[idx..]) {
                return true;
            }
            rest = &rest[idx + 1..];
            if self.suffixes.contains(rest) {
                return true;
            }
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
            && self.suffixes.is_empty()
            && self.subdomain_suffixes.is_empty()
    }
}

fn normalize(host: &str) -> String {
    host.trim_end_matches('.').to_ascii_lowercase()
}
