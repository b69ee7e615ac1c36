use crate::{
    app::router::rules::{RuleItem, describe},
    session::Session,
};

pub struct DomainKeywordItem {
    keywords: Vec<String>,
    lowercase: Vec<String>,
}

impl DomainKeywordItem {
    pub fn new(keywords: Vec<String>) -> Self {
        let lowercase = keywords.iter().map(|k| k.to_ascii_lowercase()).collect();
        Self {
            keywords,
            lowercase,
        }
    }
}

impl std::fmt::Display for DomainKeywordItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        describe(f, "domain_keyword", &self.keywords)
    }
}

impl RuleItem for DomainKeywordItem {
    fn matches(&self, sess: &Session) -> bool {
        let Some(host) = sess.domain_host() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.lowercase
            .iter()
            .any(|keyword| host.contains(keyword.as_str()))
    }
}
