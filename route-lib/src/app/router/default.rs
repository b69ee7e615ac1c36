use std::{fmt::Display, sync::Arc};

use async_trait::async_trait;
use tracing::Span;

use crate::{
    Error, Result,
    app::{
        dns::DomainStrategy,
        router::{
            HeadlessRule, RuleDomainStrategy, ThreadSafeRouter,
            rules::{
                RuleItem,
                adguard::{AdGuardDomainItem, RawAdGuardDomainItem},
                clash_mode::ClashModeItem,
                domain::{DomainItem, RawDomainItem},
                domain_keyword::DomainKeywordItem,
                domain_regex::DomainRegexItem,
                ipcidr::{IpCidrItem, RawIpCidrItem},
                network::NetworkItem,
                package::PackageNameItem,
                port::PortItem,
                port_range::PortRangeItem,
                process::{ProcessItem, ProcessPathItem, ProcessPathRegexItem},
                wifi::{WifiBssidItem, WifiSsidItem},
            },
        },
    },
    config::DefaultHeadlessRuleOptions,
    session::Session,
};

type Item = Arc<dyn RuleItem>;

/// A flat set of conditions. Items are grouped by what they look at; a
/// group holds when any of its items matches and the rule holds when every
/// configured group does. General items (network, process, Wi-Fi...) each
/// form their own group.
pub struct DefaultHeadlessRule {
    items: Vec<Item>,
    source_address_items: Vec<Item>,
    source_port_items: Vec<Item>,
    destination_address_items: Vec<Item>,
    destination_port_items: Vec<Item>,
    all_items: Vec<Item>,
    domain_strategy: Option<RuleDomainStrategy>,
    invert: bool,
}

impl DefaultHeadlessRule {
    pub fn new(
        router: ThreadSafeRouter,
        logger: &Span,
        options: DefaultHeadlessRuleOptions,
    ) -> Result<Self> {
        let mut rule = Self {
            items: vec![],
            source_address_items: vec![],
            source_port_items: vec![],
            destination_address_items: vec![],
            destination_port_items: vec![],
            all_items: vec![],
            domain_strategy: None,
            invert: options.invert,
        };

        if options.domain_strategy != DomainStrategy::AsIs {
            rule.domain_strategy = Some(RuleDomainStrategy::new(
                router.clone(),
                logger,
                options.domain_strategy,
            ));
        }

        if !options.network.is_empty() {
            rule.push_general(NetworkItem::new(options.network.0));
        }
        if !options.domain.is_empty() || !options.domain_suffix.is_empty() {
            rule.push_destination_address(DomainItem::new(
                options.domain.0,
                options.domain_suffix.0,
            ));
        } else if let Some(matcher) = options.domain_matcher {
            rule.push_destination_address(RawDomainItem::new(matcher));
        }
        if !options.domain_keyword.is_empty() {
            rule.push_destination_address(DomainKeywordItem::new(
                options.domain_keyword.0,
            ));
        }
        if !options.domain_regex.is_empty() {
            let item = DomainRegexItem::new(options.domain_regex.0)
                .map_err(|e| e.context("domain_regex"))?;
            rule.push_destination_address(item);
        }
        if !options.adguard_domain.is_empty() {
            let item = AdGuardDomainItem::new(options.adguard_domain.0)
                .map_err(|e| e.context("adguard_domain"))?;
            rule.push_destination_address(item);
        } else if let Some(matcher) = options.adguard_domain_matcher {
            rule.push_destination_address(RawAdGuardDomainItem::new(matcher));
        }
        if !options.source_ip_cidr.is_empty() {
            let item = IpCidrItem::new(true, options.source_ip_cidr.0)
                .map_err(|e| e.context("source_ip_cidr"))?;
            rule.push_source_address(item);
        } else if let Some(set) = options.source_ip_set {
            rule.push_source_address(RawIpCidrItem::new(true, set));
        }
        if !options.ip_cidr.is_empty() {
            let item = IpCidrItem::new(false, options.ip_cidr.0)
                .map_err(|e| e.context("ip_cidr"))?;
            rule.push_destination_address(item);
        } else if let Some(set) = options.ip_set {
            rule.push_destination_address(RawIpCidrItem::new(false, set));
        }
        if !options.source_port.is_empty() {
            rule.push_source_port(PortItem::new(true, options.source_port.0));
        }
        if !options.source_port_range.is_empty() {
            let item = PortRangeItem::new(true, options.source_port_range.0)
                .map_err(|e| e.context("source_port_range"))?;
            rule.push_source_port(item);
        }
        if !options.port.is_empty() {
            rule.push_destination_port(PortItem::new(false, options.port.0));
        }
        if !options.port_range.is_empty() {
            let item = PortRangeItem::new(false, options.port_range.0)
                .map_err(|e| e.context("port_range"))?;
            rule.push_destination_port(item);
        }
        if !options.process_name.is_empty() {
            rule.push_general(ProcessItem::new(options.process_name.0));
        }
        if !options.process_path.is_empty() {
            rule.push_general(ProcessPathItem::new(options.process_path.0));
        }
        if !options.process_path_regex.is_empty() {
            let item = ProcessPathRegexItem::new(options.process_path_regex.0)
                .map_err(|e| e.context("process_path_regex"))?;
            rule.push_general(item);
        }
        if !options.package_name.is_empty() {
            rule.push_general(PackageNameItem::new(options.package_name.0));
        }
        if !options.wifi_ssid.is_empty() {
            rule.push_general(WifiSsidItem::new(
                router.clone(),
                options.wifi_ssid.0,
            ));
        }
        if !options.wifi_bssid.is_empty() {
            rule.push_general(WifiBssidItem::new(
                router.clone(),
                options.wifi_bssid.0,
            ));
        }
        if !options.clash_mode.is_empty() {
            rule.push_general(ClashModeItem::new(router, options.clash_mode));
        }

        if rule.all_items.is_empty() {
            return Err(Error::InvalidConfig("missing conditions".to_owned()));
        }
        Ok(rule)
    }

    fn push_general(&mut self, item: impl RuleItem + 'static) {
        let item: Item = Arc::new(item);
        self.items.push(item.clone());
        self.all_items.push(item);
    }

    fn push_source_address(&mut self, item: impl RuleItem + 'static) {
        let item: Item = Arc::new(item);
        self.source_address_items.push(item.clone());
        self.all_items.push(item);
    }

    fn push_source_port(&mut self, item: impl RuleItem + 'static) {
        let item: Item = Arc::new(item);
        self.source_port_items.push(item.clone());
        self.all_items.push(item);
    }

    fn push_destination_address(&mut self, item: impl RuleItem + 'static) {
        let item: Item = Arc::new(item);
        self.destination_address_items.push(item.clone());
        self.all_items.push(item);
    }

    fn push_destination_port(&mut self, item: impl RuleItem + 'static) {
        let item: Item = Arc::new(item);
        self.destination_port_items.push(item.clone());
        self.all_items.push(item);
    }

    fn match_conditions(&self, sess: &mut Session) -> bool {
        sess.reset_rule_cache();

        if !self.items.iter().all(|item| item.matches(&*sess)) {
            return false;
        }

        if !self.source_address_items.is_empty() {
            let matched = any_match(&self.source_address_items, sess);
            sess.rule_cache.source_address_match = matched;
            if !matched {
                return false;
            }
        }
        if !self.source_port_items.is_empty() {
            let matched = any_match(&self.source_port_items, sess);
            sess.rule_cache.source_port_match = matched;
            if !matched {
                return false;
            }
        }
        if !self.destination_address_items.is_empty() {
            let matched = any_match(&self.destination_address_items, sess);
            sess.rule_cache.destination_address_match = matched;
            if !matched {
                return false;
            }
        }
        if !self.destination_port_items.is_empty() {
            let matched = any_match(&self.destination_port_items, sess);
            sess.rule_cache.destination_port_match = matched;
            if !matched {
                return false;
            }
        }
        true
    }
}

fn any_match(items: &[Item], sess: &Session) -> bool {
    items.iter().any(|item| item.matches(sess))
}

#[async_trait]
impl HeadlessRule for DefaultHeadlessRule {
    async fn matches(&self, sess: &mut Session) -> bool {
        // an unresolvable destination never matches, inverted or not
        if let Some(strategy) = &self.domain_strategy {
            if !strategy.resolve(sess).await {
                return false;
            }
        }
        self.match_conditions(sess) != self.invert
    }
}

impl Display for DefaultHeadlessRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::with_capacity(self.all_items.len() + 1);
        if let Some(strategy) = &self.domain_strategy {
            parts.push(strategy.to_string());
        }
        parts.extend(self.all_items.iter().map(ToString::to_string));
        let description = parts.join(" ");
        if self.invert {
            write!(f, "!({description})")
        } else {
            f.write_str(&description)
        }
    }
}
