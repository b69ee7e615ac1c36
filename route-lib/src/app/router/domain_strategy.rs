use std::{fmt::Display, time::Duration};

use tracing::{Span, debug, error};

use crate::{
    Error,
    app::{dns::DomainStrategy, router::ThreadSafeRouter},
    session::Session,
};

const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves the destination of a session before a rule looks at its
/// addresses. The outcome is recorded on the session so that later rules
/// configured with the same strategy reuse it.
pub struct RuleDomainStrategy {
    router: ThreadSafeRouter,
    logger: Span,
    domain_strategy: DomainStrategy,
    timeout: Duration,
}

impl RuleDomainStrategy {
    pub fn new(
        router: ThreadSafeRouter,
        logger: &Span,
        domain_strategy: DomainStrategy,
    ) -> Self {
        Self {
            router,
            logger: logger.clone(),
            domain_strategy,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn domain_strategy(&self) -> DomainStrategy {
        self.domain_strategy
    }

    /// Returns false when the destination could not be resolved; callers
    /// treat that as a non-match.
    pub async fn resolve(&self, sess: &mut Session) -> bool {
        if sess.inside_domain_strategy_rule {
            error!(
                parent: &self.logger,
                "domain_strategy rule is not supported while resolving for \
                 another domain_strategy rule: {}",
                sess
            );
            return false;
        }
        if sess.applied_domain_strategy == self.domain_strategy {
            return true;
        }
        if sess.failed_domain_strategies.contains(&self.domain_strategy) {
            debug!(
                parent: &self.logger,
                "skip resolving {} with {}: failed before",
                sess.destination,
                self.domain_strategy
            );
            return false;
        }

        let domain = match sess.destination.domain() {
            Some(domain) if self.domain_strategy != DomainStrategy::AsIs => {
                domain.to_owned()
            }
            _ => {
                sess.applied_domain_strategy = DomainStrategy::AsIs;
                if sess.destination.is_ip() || !sess.destination_addresses.is_empty()
                {
                    return true;
                }
                error!(
                    parent: &self.logger,
                    "rule failed to resolve addresses: no FQDN: {}", sess
                );
                return false;
            }
        };

        match self.lookup(sess, &domain).await {
            Ok(addresses) => {
                debug!(
                    parent: &self.logger,
                    "rule resolved {} => {:?}", domain, addresses
                );
                sess.destination_addresses = addresses;
                sess.applied_domain_strategy = self.domain_strategy;
                true
            }
            Err(e) => {
                error!(
                    parent: &self.logger,
                    "rule failed to resolve {}: {}", domain, e
                );
                sess.applied_domain_strategy = DomainStrategy::AsIs;
                sess.failed_domain_strategies.insert(self.domain_strategy);
                false
            }
        }
    }

    async fn lookup(
        &self,
        sess: &Session,
        domain: &str,
    ) -> crate::Result<Vec<std::net::IpAddr>> {
        let mut derived = sess.clone();
        derived.reset_rule_cache();
        derived.inside_domain_strategy_rule = true;

        let addresses = tokio::time::timeout(
            self.timeout,
            self.router.lookup(&derived, domain, self.domain_strategy),
        )
        .await
        .map_err(|_| Error::DNSError(format!("lookup {domain} timed out")))??;

        if addresses.is_empty() {
            return Err(Error::DNSError(format!("no address found for {domain}")));
        }
        Ok(addresses)
    }
}

impl Display for RuleDomainStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "domain_strategy={}", self.domain_strategy)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        net::IpAddr,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use async_trait::async_trait;
    use tracing::Span;

    use super::RuleDomainStrategy;
    use crate::{
        app::{
            dns::DomainStrategy,
            router::{
                ClashServer, MockRouter, Router, WifiState,
                tests::{offline_router, session},
            },
        },
        session::{Network, Session},
    };

    fn resolver(
        router: Arc<dyn Router>,
        strategy: DomainStrategy,
    ) -> RuleDomainStrategy {
        RuleDomainStrategy::new(router, &Span::none(), strategy)
    }

    #[tokio::test]
    async fn test_reentrant_resolve_is_refused() {
        crate::tests::initialize();

        let rule = resolver(offline_router(), DomainStrategy::PreferIpv4);
        let mut sess = session(("example.com", 443), Network::Tcp);
        sess.inside_domain_strategy_rule = true;

        assert!(!rule.resolve(&mut sess).await);
        assert_eq!(sess.applied_domain_strategy, DomainStrategy::AsIs);
        assert!(sess.destination_addresses.is_empty());
    }

    #[tokio::test]
    async fn test_already_applied_strategy() {
        let rule = resolver(offline_router(), DomainStrategy::Ipv6Only);
        let mut sess = session(("example.com", 443), Network::Tcp);
        sess.applied_domain_strategy = DomainStrategy::Ipv6Only;

        assert!(rule.resolve(&mut sess).await);
        assert!(rule.resolve(&mut sess).await);
        assert_eq!(sess.applied_domain_strategy, DomainStrategy::Ipv6Only);
    }

    #[tokio::test]
    async fn test_ip_destination_needs_no_lookup() {
        let rule = resolver(offline_router(), DomainStrategy::PreferIpv4);
        let mut sess = session(("1.1.1.1", 53), Network::Udp);

        assert!(rule.resolve(&mut sess).await);
        assert_eq!(sess.applied_domain_strategy, DomainStrategy::AsIs);
    }

    #[tokio::test]
    async fn test_as_is_strategy() {
        let rule = resolver(offline_router(), DomainStrategy::AsIs);

        let mut sess = session(("example.com", 443), Network::Tcp);
        sess.applied_domain_strategy = DomainStrategy::PreferIpv6;
        sess.destination_addresses = vec!["2001:db8::1".parse().unwrap()];
        assert!(rule.resolve(&mut sess).await);
        assert_eq!(sess.applied_domain_strategy, DomainStrategy::AsIs);

        let mut sess = session(("example.com", 443), Network::Tcp);
        sess.applied_domain_strategy = DomainStrategy::PreferIpv6;
        assert!(!rule.resolve(&mut sess).await);
        assert_eq!(sess.applied_domain_strategy, DomainStrategy::AsIs);
    }

    #[tokio::test]
    async fn test_lookup_sees_derived_session() {
        let mut router = MockRouter::new();
        router
            .expect_lookup()
            .times(1)
            .returning(|sess: &Session, _, _| {
                assert!(sess.inside_domain_strategy_rule);
                assert!(!sess.rule_cache.destination_port_match);
                Ok(vec!["2001:db8::1".parse().unwrap()])
            });
        let rule = resolver(Arc::new(router), DomainStrategy::Ipv6Only);

        let mut sess = session(("example.com", 443), Network::Tcp);
        sess.rule_cache.destination_port_match = true;
        assert!(rule.resolve(&mut sess).await);
        assert!(!sess.inside_domain_strategy_rule);
        assert!(sess.rule_cache.destination_port_match);
        assert_eq!(
            sess.destination_addresses,
            vec!["2001:db8::1".parse::<IpAddr>().unwrap()]
        );
        assert_eq!(rule.to_string(), "domain_strategy=ipv6_only");
    }

    #[tokio::test]
    async fn test_empty_answer_is_a_failure() {
        let mut router = MockRouter::new();
        router
            .expect_lookup()
            .times(1)
            .returning(|_, _, _| Ok(vec![]));
        let rule = resolver(Arc::new(router), DomainStrategy::Ipv4Only);

        let mut sess = session(("example.com", 443), Network::Tcp);
        assert!(!rule.resolve(&mut sess).await);
        assert!(
            sess.failed_domain_strategies
                .contains(&DomainStrategy::Ipv4Only)
        );
        assert!(!rule.resolve(&mut sess).await);
    }

    #[tokio::test]
    async fn test_every_failed_strategy_is_remembered() {
        let lookups = Arc::new(Mutex::new(Vec::new()));
        let seen = lookups.clone();
        let mut router = MockRouter::new();
        router
            .expect_lookup()
            .times(2)
            .returning(move |_, _, strategy| {
                seen.lock().unwrap().push(strategy);
                Err(anyhow::anyhow!("SERVFAIL"))
            });
        let router: Arc<dyn Router> = Arc::new(router);
        let prefer_ipv4 = resolver(router.clone(), DomainStrategy::PreferIpv4);
        let ipv6_only = resolver(router, DomainStrategy::Ipv6Only);

        let mut sess = session(("example.com", 443), Network::Tcp);
        assert!(!prefer_ipv4.resolve(&mut sess).await);
        assert!(!ipv6_only.resolve(&mut sess).await);
        assert!(!prefer_ipv4.resolve(&mut sess).await);
        assert!(!ipv6_only.resolve(&mut sess).await);

        assert_eq!(
            *lookups.lock().unwrap(),
            vec![DomainStrategy::PreferIpv4, DomainStrategy::Ipv6Only]
        );
        assert_eq!(sess.applied_domain_strategy, DomainStrategy::AsIs);
    }

    struct SlowRouter;

    #[async_trait]
    impl Router for SlowRouter {
        async fn lookup(
            &self,
            _: &Session,
            _: &str,
            _: DomainStrategy,
        ) -> anyhow::Result<Vec<IpAddr>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec!["127.0.0.1".parse()?])
        }

        fn clash_server(&self) -> Option<Arc<dyn ClashServer>> {
            None
        }

        fn wifi_state(&self) -> WifiState {
            WifiState::default()
        }
    }

    #[tokio::test]
    async fn test_lookup_timeout() {
        let rule = resolver(Arc::new(SlowRouter), DomainStrategy::PreferIpv4)
            .with_timeout(Duration::from_millis(20));

        let mut sess = session(("slow.example.com", 443), Network::Tcp);
        assert!(!rule.resolve(&mut sess).await);
        assert_eq!(sess.applied_domain_strategy, DomainStrategy::AsIs);
        assert!(
            sess.failed_domain_strategies
                .contains(&DomainStrategy::PreferIpv4)
        );
    }
}
