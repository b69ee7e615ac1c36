use std::sync::Arc;

use serde::{Deserialize, Deserializer, de::Error as _};

use crate::{
    app::dns::DomainStrategy,
    common::{AdGuardMatcher, DomainMatcher, IpSet},
    config::Listable,
};

pub const RULE_TYPE_DEFAULT: &str = "default";
pub const RULE_TYPE_LOGICAL: &str = "logical";

pub const LOGICAL_TYPE_AND: &str = "and";
pub const LOGICAL_TYPE_OR: &str = "or";

/// A rule as written in the configuration, discriminated by `type`.
///
/// # Example
/// ```json
/// {
///   "type": "logical",
///   "mode": "or",
///   "rules": [
///     { "network": "udp", "port": 53 },
///     { "domain_suffix": ["example.com"], "domain_strategy": "prefer_ipv4" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct HeadlessRuleOptions {
    pub rule_type: String,
    pub default_options: DefaultHeadlessRuleOptions,
    pub logical_options: LogicalHeadlessRuleOptions,
}

impl HeadlessRuleOptions {
    pub fn is_valid(&self) -> bool {
        match self.rule_type.as_str() {
            "" | RULE_TYPE_DEFAULT => self.default_options.is_valid(),
            RULE_TYPE_LOGICAL => self.logical_options.is_valid(),
            _ => false,
        }
    }
}

impl From<DefaultHeadlessRuleOptions> for HeadlessRuleOptions {
    fn from(value: DefaultHeadlessRuleOptions) -> Self {
        Self {
            rule_type: RULE_TYPE_DEFAULT.to_owned(),
            default_options: value,
            ..Default::default()
        }
    }
}

impl From<LogicalHeadlessRuleOptions> for HeadlessRuleOptions {
    fn from(value: LogicalHeadlessRuleOptions) -> Self {
        Self {
            rule_type: RULE_TYPE_LOGICAL.to_owned(),
            logical_options: value,
            ..Default::default()
        }
    }
}

impl<'de> Deserialize<'de> for HeadlessRuleOptions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Tagged {
            #[serde(rename = "type", default)]
            rule_type: String,
            #[serde(flatten)]
            fields: serde_json::Map<String, serde_json::Value>,
        }

        let Tagged { rule_type, fields } = Tagged::deserialize(deserializer)?;
        let fields = serde_json::Value::Object(fields);
        let mut options = HeadlessRuleOptions {
            rule_type,
            ..Default::default()
        };
        // unknown types are kept as-is and rejected when the rule is built
        match options.rule_type.as_str() {
            "" | RULE_TYPE_DEFAULT => {
                options.default_options =
                    DefaultHeadlessRuleOptions::deserialize(fields)
                        .map_err(D::Error::custom)?;
            }
            RULE_TYPE_LOGICAL => {
                options.logical_options =
                    LogicalHeadlessRuleOptions::deserialize(fields)
                        .map_err(D::Error::custom)?;
            }
            _ => {}
        }
        Ok(options)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultHeadlessRuleOptions {
    pub network: Listable<String>,
    pub domain: Listable<String>,
    pub domain_suffix: Listable<String>,
    pub domain_keyword: Listable<String>,
    pub domain_regex: Listable<String>,
    pub source_ip_cidr: Listable<String>,
    pub ip_cidr: Listable<String>,
    pub source_port: Listable<u16>,
    pub source_port_range: Listable<String>,
    pub port: Listable<u16>,
    pub port_range: Listable<String>,
    pub process_name: Listable<String>,
    pub process_path: Listable<String>,
    pub process_path_regex: Listable<String>,
    pub package_name: Listable<String>,
    pub wifi_ssid: Listable<String>,
    pub wifi_bssid: Listable<String>,
    pub clash_mode: String,
    pub adguard_domain: Listable<String>,
    /// Resolve the destination with this strategy before matching.
    pub domain_strategy: DomainStrategy,
    pub invert: bool,

    /// Already built matchers, used instead of `domain`/`domain_suffix`,
    /// `source_ip_cidr`, `ip_cidr` and `adguard_domain` when those are
    /// empty.
    #[serde(skip)]
    pub domain_matcher: Option<Arc<DomainMatcher>>,
    #[serde(skip)]
    pub source_ip_set: Option<Arc<IpSet>>,
    #[serde(skip)]
    pub ip_set: Option<Arc<IpSet>>,
    #[serde(skip)]
    pub adguard_domain_matcher: Option<Arc<AdGuardMatcher>>,
}

impl DefaultHeadlessRuleOptions {
    /// Whether at least one match condition is set. `invert` and
    /// `domain_strategy` are modifiers, not conditions.
    pub fn is_valid(&self) -> bool {
        let lists = [
            &self.network,
            &self.domain,
            &self.domain_suffix,
            &self.domain_keyword,
            &self.domain_regex,
            &self.source_ip_cidr,
            &self.ip_cidr,
            &self.source_port_range,
            &self.port_range,
            &self.process_name,
            &self.process_path,
            &self.process_path_regex,
            &self.package_name,
            &self.wifi_ssid,
            &self.wifi_bssid,
            &self.adguard_domain,
        ];
        lists.iter().any(|l| !l.is_empty())
            || !self.source_port.is_empty()
            || !self.port.is_empty()
            || !self.clash_mode.is_empty()
            || self.domain_matcher.is_some()
            || self.source_ip_set.is_some()
            || self.ip_set.is_some()
            || self.adguard_domain_matcher.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogicalHeadlessRuleOptions {
    pub mode: String,
    pub rules: Vec<HeadlessRuleOptions>,
    pub invert: bool,
}

impl LogicalHeadlessRuleOptions {
    pub fn is_valid(&self) -> bool {
        !self.rules.is_empty()
            && self.rules.iter().all(HeadlessRuleOptions::is_valid)
    }
}
