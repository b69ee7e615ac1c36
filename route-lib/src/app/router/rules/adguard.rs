use std::sync::Arc;

use crate::{
    Result,
    app::router::rules::{RuleItem, describe},
    common::AdGuardMatcher,
    session::Session,
};

pub struct AdGuardDomainItem {
    rules: Vec<String>,
    matcher: AdGuardMatcher,
}

impl AdGuardDomainItem {
    pub fn new(rules: Vec<String>) -> Result<Self> {
        let matcher = AdGuardMatcher::new(&rules)?;
        Ok(Self { rules, matcher })
    }
}

impl std::fmt::Display for AdGuardDomainItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        describe(f, "adguard_domain", &self.rules)
    }
}

impl RuleItem for AdGuardDomainItem {
    fn matches(&self, sess: &Session) -> bool {
        sess.domain_host()
            .is_some_and(|host| self.matcher.matches(host))
    }
}

pub struct RawAdGuardDomainItem {
    matcher: Arc<AdGuardMatcher>,
}

impl RawAdGuardDomainItem {
    pub fn new(matcher: Arc<AdGuardMatcher>) -> Self {
        Self { matcher }
    }
}

impl std::fmt::Display for RawAdGuardDomainItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "adguard_domain=<binary>")
    }
}

impl RuleItem for RawAdGuardDomainItem {
    fn matches(&self, sess: &Session) -> bool {
        sess.domain_host()
            .is_some_and(|host| self.matcher.matches(host))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{AdGuardDomainItem, RawAdGuardDomainItem};
    use crate::{
        app::router::rules::RuleItem,
        common::AdGuardMatcher,
        session::{Session, SocksAddr},
    };

    fn sess(host: &str) -> Session {
        Session {
            destination: SocksAddr::from((host, 443)),
            ..Default::default()
        }
    }

    #[test]
    fn test_adguard_domain_item() {
        let item = AdGuardDomainItem::new(vec![
            "||doubleclick.net^".to_owned(),
            "|ads.".to_owned(),
        ])
        .unwrap();
        assert!(item.matches(&sess("stats.doubleclick.net")));
        assert!(item.matches(&sess("ads.example.com")));
        assert!(!item.matches(&sess("example.com")));
        assert!(!item.matches(&sess("8.8.8.8")));
        assert_eq!(item.to_string(), "adguard_domain=[||doubleclick.net^ |ads.]");
    }

    #[test]
    fn test_raw_adguard_domain_item() {
        let matcher = Arc::new(AdGuardMatcher::new(["||example.org^"]).unwrap());
        let item = RawAdGuardDomainItem::new(matcher);
        assert!(item.matches(&sess("www.example.org")));
        assert_eq!(item.to_string(), "adguard_domain=<binary>");
    }
}
