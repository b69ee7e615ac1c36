use std::sync::Arc;

use crate::{
    app::router::rules::RuleItem, common::DomainMatcher, session::Session,
};

/// `domain` and `domain_suffix` share one matcher.
pub struct DomainItem {
    matcher: DomainMatcher,
    description: String,
}

impl DomainItem {
    pub fn new(domains: Vec<String>, domain_suffixes: Vec<String>) -> Self {
        let mut description = String::new();
        describe_domains(&mut description, "domain", &domains);
        describe_domains(&mut description, "domain_suffix", &domain_suffixes);
        Self {
            matcher: DomainMatcher::new(domains, domain_suffixes),
            description,
        }
    }
}

/// Long lists are cut to the first three entries.
fn describe_domains(description: &mut String, key: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    if !description.is_empty() {
        description.push(' ');
    }
    description.push_str(key);
    description.push('=');
    match values.len() {
        1 => description.push_str(&values[0]),
        n if n > 3 => {
            description.push('[');
            description.push_str(&values[..3].join(" "));
            description.push_str("...]");
        }
        _ => {
            description.push('[');
            description.push_str(&values.join(" "));
            description.push(']');
        }
    }
}

impl std::fmt::Display for DomainItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description)
    }
}

impl RuleItem for DomainItem {
    fn matches(&self, sess: &Session) -> bool {
        sess.domain_host()
            .is_some_and(|host| self.matcher.matches(host))
    }
}

/// A domain matcher built elsewhere, e.g. loaded from a rule set.
pub struct RawDomainItem {
    matcher: Arc<DomainMatcher>,
}

impl RawDomainItem {
    pub fn new(matcher: Arc<DomainMatcher>) -> Self {
        Self { matcher }
    }
}

impl std::fmt::Display for RawDomainItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "domain/domain_suffix=<binary>")
    }
}

impl RuleItem for RawDomainItem {
    fn matches(&self, sess: &Session) -> bool {
        sess.domain_host()
            .is_some_and(|host| self.matcher.matches(host))
    }
}
