use std::{fmt::Display, net::IpAddr, sync::Arc};

use async_trait::async_trait;
use tracing::Span;

#[cfg(test)]
use mockall::automock;

use crate::{
    Error, Result,
    app::dns::DomainStrategy,
    config::{HeadlessRuleOptions, RULE_TYPE_DEFAULT, RULE_TYPE_LOGICAL},
    session::Session,
};

mod default;
mod domain_strategy;
mod logical;
mod rules;

pub use default::DefaultHeadlessRule;
pub use domain_strategy::RuleDomainStrategy;
pub use logical::LogicalHeadlessRule;
pub use rules::RuleItem;

/// Wi-Fi network the host is currently joined to, empty when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WifiState {
    pub ssid: String,
    pub bssid: String,
}

/// The Clash-compatible control plane.
#[cfg_attr(test, automock)]
pub trait ClashServer: Send + Sync {
    /// current proxy mode, e.g. `Rule` or `Global`
    fn mode(&self) -> String;
}

/// What rules borrow from the surrounding router at match time.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Router: Send + Sync {
    /// Resolve `domain` on behalf of a rule. `sess` is a copy of the session
    /// being routed, flagged with `inside_domain_strategy_rule`, so DNS
    /// rules evaluated for this lookup can tell where it came from.
    async fn lookup(
        &self,
        sess: &Session,
        domain: &str,
        strategy: DomainStrategy,
    ) -> anyhow::Result<Vec<IpAddr>>;

    fn clash_server(&self) -> Option<Arc<dyn ClashServer>>;

    fn wifi_state(&self) -> WifiState;
}

pub type ThreadSafeRouter = Arc<dyn Router>;

/// A rule that only answers whether it applies, with no outbound attached.
/// Usable on its own or nested in a logical rule.
#[async_trait]
pub trait HeadlessRule: Send + Sync + Display {
    /// check if the rule applies to the session. May resolve the
    /// destination and record the result on the session.
    async fn matches(&self, sess: &mut Session) -> bool;
}

/// Build a rule tree from its options. Logical rules call back into this
/// for each of their sub-rules.
pub fn new_headless_rule(
    router: ThreadSafeRouter,
    logger: &Span,
    options: HeadlessRuleOptions,
) -> Result<Box<dyn HeadlessRule>> {
    match options.rule_type.as_str() {
        "" | RULE_TYPE_DEFAULT => {
            if !options.default_options.is_valid() {
                return Err(Error::InvalidConfig("missing conditions".to_owned()));
            }
            Ok(Box::new(DefaultHeadlessRule::new(
                router,
                logger,
                options.default_options,
            )?))
        }
        RULE_TYPE_LOGICAL => {
            // sub-rules are checked one by one so errors carry their index
            if options.logical_options.rules.is_empty() {
                return Err(Error::InvalidConfig("missing conditions".to_owned()));
            }
            Ok(Box::new(LogicalHeadlessRule::new(
                router,
                logger,
                options.logical_options,
            )?))
        }
        other => Err(Error::InvalidConfig(format!("unknown rule type: {other}"))),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        net::IpAddr,
        sync::{Arc, Mutex},
    };

    use serde_json::json;
    use tracing::Span;

    use super::{HeadlessRule, MockRouter, new_headless_rule};
    use crate::{
        DomainStrategy, HeadlessRuleOptions, Router,
        session::{Network, Session, SocksAddr},
    };

    pub fn session(destination: (&str, u16), network: Network) -> Session {
        Session {
            destination: SocksAddr::from(destination),
            network,
            ..Default::default()
        }
    }

    pub fn options(value: serde_json::Value) -> HeadlessRuleOptions {
        serde_json::from_value(value).unwrap()
    }

    /// Match a fresh session against `rule`.
    pub async fn evaluate(
        rule: &dyn HeadlessRule,
        destination: (&str, u16),
        network: Network,
    ) -> bool {
        rule.matches(&mut session(destination, network)).await
    }

    /// A router whose lookups must never happen.
    pub fn offline_router() -> Arc<dyn Router> {
        let mut router = MockRouter::new();
        router.expect_lookup().times(0);
        Arc::new(router)
    }

    fn build_err(value: serde_json::Value) -> String {
        match new_headless_rule(offline_router(), &Span::none(), options(value)) {
            Ok(rule) => panic!("rule {rule} should not build"),
            Err(e) => e.to_string(),
        }
    }

    #[test]
    fn test_missing_conditions() {
        assert!(build_err(json!({})).contains("missing conditions"));
        assert!(build_err(json!({"invert": true})).contains("missing conditions"));
        assert!(
            build_err(json!({"domain_strategy": "prefer_ipv4"}))
                .contains("missing conditions")
        );
        assert!(
            build_err(json!({"type": "logical", "mode": "and", "rules": []}))
                .contains("missing conditions")
        );
    }

    #[test]
    fn test_logical_with_empty_sub_rule_fails() {
        let err = build_err(json!({
            "type": "logical",
            "mode": "or",
            "rules": [{"network": "tcp"}, {}],
        }));
        assert_eq!(err, "sub rule[1]: invalid config: missing conditions");
    }

    #[test]
    fn test_logical_with_unknown_sub_rule_type() {
        let err = build_err(json!({
            "type": "logical",
            "mode": "or",
            "rules": [{"network": "tcp"}, {"type": "rule_set", "tag": "x"}],
        }));
        assert_eq!(
            err,
            "sub rule[1]: invalid config: unknown rule type: rule_set"
        );
    }

    #[test]
    fn test_unknown_rule_type() {
        let err = build_err(json!({"type": "rule_set"}));
        assert_eq!(err, "invalid config: unknown rule type: rule_set");
    }

    #[test]
    fn test_unknown_logical_mode() {
        let err = build_err(json!({
            "type": "logical",
            "mode": "xor",
            "rules": [{"network": "tcp"}],
        }));
        assert!(err.contains("unknown logical mode: xor"));
    }

    #[test]
    fn test_sub_rule_error_names_index() {
        let err = build_err(json!({
            "type": "logical",
            "mode": "and",
            "rules": [
                {"network": "tcp"},
                {"type": "logical", "mode": "or", "rules": [
                    {"port": 80},
                    {"domain_regex": "(unclosed"},
                ]},
            ],
        }));
        assert!(
            err.starts_with("sub rule[1]: sub rule[1]: domain_regex: "),
            "{err}"
        );
    }

    #[test]
    fn test_invalid_values_fail_construction() {
        assert!(
            build_err(json!({"ip_cidr": "10.0.0.0/33"})).starts_with("ip_cidr: ")
        );
        assert!(
            build_err(json!({"source_ip_cidr": "not-an-ip"}))
                .starts_with("source_ip_cidr: ")
        );
        assert!(
            build_err(json!({"port_range": "2000:1000"})).starts_with("port_range: ")
        );
        assert!(
            build_err(json!({"source_port_range": "a:b"}))
                .starts_with("source_port_range: ")
        );
        assert!(
            build_err(json!({"process_path_regex": "["}))
                .starts_with("process_path_regex: ")
        );
        assert!(
            build_err(json!({"adguard_domain": "@@||example.com^"}))
                .starts_with("adguard_domain: ")
        );
    }

    #[tokio::test]
    async fn test_end_to_end_resolve_and_match() {
        crate::tests::initialize();

        let lookups = Arc::new(Mutex::new(Vec::new()));
        let seen = lookups.clone();
        let mut router = MockRouter::new();
        router
            .expect_lookup()
            .times(1)
            .returning(move |sess, domain, strategy| {
                assert!(sess.inside_domain_strategy_rule);
                seen.lock().unwrap().push((domain.to_owned(), strategy));
                Ok(vec!["93.184.216.34".parse().unwrap()])
            });

        let rule = new_headless_rule(
            Arc::new(router),
            &Span::none(),
            options(json!({
                "domain_suffix": ["example.com"],
                "domain_strategy": "prefer_ipv4",
            })),
        )
        .unwrap();

        let mut sess = session(("api.example.com", 443), Network::Tcp);
        assert!(rule.matches(&mut sess).await);
        assert!(!sess.inside_domain_strategy_rule);
        assert_eq!(sess.applied_domain_strategy, DomainStrategy::PreferIpv4);
        assert!(sess.destination_addresses.iter().any(IpAddr::is_ipv4));
        assert_eq!(
            *lookups.lock().unwrap(),
            vec![("api.example.com".to_owned(), DomainStrategy::PreferIpv4)]
        );

        // memoized: no second lookup
        assert!(rule.matches(&mut sess).await);
        assert_eq!(sess.applied_domain_strategy, DomainStrategy::PreferIpv4);
    }

    #[tokio::test]
    async fn test_end_to_end_lookup_failure_is_not_retried() {
        crate::tests::initialize();

        let mut router = MockRouter::new();
        router
            .expect_lookup()
            .times(1)
            .returning(|_, _, _| Err(anyhow::anyhow!("SERVFAIL")));

        let rule = new_headless_rule(
            Arc::new(router),
            &Span::none(),
            options(json!({
                "domain_suffix": ["example.com"],
                "domain_strategy": "prefer_ipv4",
            })),
        )
        .unwrap();

        let mut sess = session(("api.example.com", 443), Network::Tcp);
        assert!(!rule.matches(&mut sess).await);
        assert_eq!(sess.applied_domain_strategy, DomainStrategy::AsIs);
        assert!(sess.destination_addresses.is_empty());

        assert!(!rule.matches(&mut sess).await);
        assert_eq!(sess.applied_domain_strategy, DomainStrategy::AsIs);
    }

    #[tokio::test]
    async fn test_shared_strategy_across_logical_branches() {
        let mut router = MockRouter::new();
        router
            .expect_lookup()
            .times(1)
            .returning(|_, _, _| Ok(vec!["10.0.0.7".parse().unwrap()]));

        let rule = new_headless_rule(
            Arc::new(router),
            &Span::none(),
            options(json!({
                "type": "logical",
                "mode": "or",
                "rules": [
                    {"ip_cidr": "192.168.0.0/16", "domain_strategy": "ipv4_only"},
                    {"ip_cidr": "10.0.0.0/8", "domain_strategy": "ipv4_only"},
                ],
            })),
        )
        .unwrap();

        let mut sess = session(("internal.corp", 443), Network::Tcp);
        assert!(rule.matches(&mut sess).await);
        assert_eq!(sess.applied_domain_strategy, DomainStrategy::Ipv4Only);
    }

    #[tokio::test]
    async fn test_rule_tree_is_shared_across_tasks() {
        let rule: Arc<dyn HeadlessRule> = new_headless_rule(
            offline_router(),
            &Span::none(),
            options(json!({
                "type": "logical",
                "mode": "and",
                "rules": [{"network": "udp"}, {"port": [53, 853]}],
            })),
        )
        .unwrap()
        .into();

        let handles = [("1.1.1.1", 53), ("1.1.1.1", 443), ("8.8.8.8", 853)]
            .into_iter()
            .map(|(ip, port)| {
                let rule = rule.clone();
                tokio::spawn(async move {
                    let mut sess = session((ip, port), Network::Udp);
                    rule.matches(&mut sess).await
                })
            })
            .collect::<Vec<_>>();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        assert_eq!(results, vec![true, false, true]);
    }
}
