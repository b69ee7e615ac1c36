use regex::RegexSet;

use crate::{
    Result,
    app::router::rules::{RuleItem, describe},
    session::Session,
};

pub struct DomainRegexItem {
    regexes: Vec<String>,
    set: RegexSet,
}

impl DomainRegexItem {
    pub fn new(regexes: Vec<String>) -> Result<Self> {
        let set = RegexSet::new(&regexes)?;
        Ok(Self { regexes, set })
    }
}

impl std::fmt::Display for DomainRegexItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        describe(f, "domain_regex", &self.regexes)
    }
}

impl RuleItem for DomainRegexItem {
    fn matches(&self, sess: &Session) -> bool {
        sess.domain_host().is_some_and(|host| self.set.is_match(host))
    }
}

#[cfg(test)]
mod tests {
    use super::DomainRegexItem;
    use crate::{
        app::router::rules::RuleItem,
        session::{Session, SocksAddr},
    };

    #[test]
    fn test_domain_regex() {
        let item = DomainRegexItem::new(vec![r"^ad[0-9]+\.".to_owned()]).unwrap();
        let mut sess = Session {
            destination: SocksAddr::from(("ad42.example.com", 443)),
            ..Default::default()
        };
        assert!(item.matches(&sess));
        sess.destination = SocksAddr::from(("ads.example.com", 443));
        assert!(!item.matches(&sess));
        sess.destination = SocksAddr::from(("10.0.0.1", 443));
        assert!(!item.matches(&sess));
    }

    #[test]
    fn test_domain_regex_invalid() {
        assert!(DomainRegexItem::new(vec!["(".to_owned()]).is_err());
    }
}
