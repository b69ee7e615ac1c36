use std::{
    collections::HashSet,
    fmt::{Debug, Display, Formatter},
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::Path,
};

use educe::Educe;
use serde::Serialize;

use crate::app::dns::DomainStrategy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SocksAddr {
    Ip(SocketAddr),
    Domain(String, u16),
}

impl Display for SocksAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SocksAddr::Ip(ip) => write!(f, "{ip}"),
            SocksAddr::Domain(host, port) => write!(f, "{host}:{port}"),
        }
    }
}

impl SocksAddr {
    pub fn any_ipv4() -> Self {
        Self::Ip(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0))
    }

    pub fn is_domain(&self) -> bool {
        match self {
            SocksAddr::Ip(_) => false,
            SocksAddr::Domain(_, _) => true,
        }
    }

    pub fn is_ip(&self) -> bool {
        !self.is_domain()
    }

    pub fn domain(&self) -> Option<&str> {
        match self {
            SocksAddr::Ip(_) => None,
            SocksAddr::Domain(domain, _) => Some(domain.as_str()),
        }
    }

    pub fn ip(&self) -> Option<IpAddr> {
        if let SocksAddr::Ip(addr) = self {
            Some(addr.ip())
        } else {
            None
        }
    }

    pub fn host(&self) -> String {
        match self {
            SocksAddr::Ip(ip) => ip.ip().to_string(),
            SocksAddr::Domain(domain, _) => domain.to_string(),
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            SocksAddr::Ip(ip) => ip.port(),
            SocksAddr::Domain(_, port) => *port,
        }
    }
}

impl From<SocketAddr> for SocksAddr {
    fn from(value: SocketAddr) -> Self {
        Self::Ip(value)
    }
}

impl From<(IpAddr, u16)> for SocksAddr {
    fn from(value: (IpAddr, u16)) -> Self {
        Self::Ip(value.into())
    }
}

impl From<(&str, u16)> for SocksAddr {
    /// IP literals become `SocksAddr::Ip`, everything else is kept as a
    /// domain name.
    fn from((host, port): (&str, u16)) -> Self {
        match host.parse::<IpAddr>() {
            Ok(ip) => Self::from((ip, port)),
            Err(_) => Self::Domain(host.to_owned(), port),
        }
    }
}

#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Tcp,
    Udp,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Tcp => "tcp",
            Network::Udp => "udp",
        }
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the local process that owns the connection, filled in by
/// the platform layer before routing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub process_path: String,
    pub package_name: String,
    pub user_id: Option<u32>,
}

impl ProcessInfo {
    /// The executable name, i.e. the last component of `process_path`.
    pub fn process_name(&self) -> Option<&str> {
        Path::new(&self.process_path)
            .file_name()
            .and_then(|name| name.to_str())
    }
}

/// Per-group outcomes of the default rule evaluated last against this
/// session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuleCache {
    pub source_address_match: bool,
    pub source_port_match: bool,
    pub destination_address_match: bool,
    pub destination_port_match: bool,
}

#[derive(Clone, Serialize, Educe)]
#[educe(Default)]
pub struct Session {
    /// The network type, representing either TCP or UDP.
    pub network: Network,
    /// The socket address of the remote peer of an inbound connection.
    #[educe(Default(expression = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))))]
    pub source: SocketAddr,
    /// The proxy target address of a proxy connection.
    #[educe(Default(expression = SocksAddr::any_ipv4()))]
    pub destination: SocksAddr,
    /// Addresses the destination domain resolved to. Once non-empty, IP
    /// matchers use these instead of the destination.
    pub destination_addresses: Vec<IpAddr>,
    /// Host name recovered by sniffing when the destination is an IP.
    pub sniff_host: Option<String>,
    pub process_info: Option<ProcessInfo>,
    /// Strategy the destination was last resolved with.
    pub applied_domain_strategy: DomainStrategy,
    /// Strategies whose lookup failed on this session, never retried.
    pub failed_domain_strategies: HashSet<DomainStrategy>,
    /// Only ever set on the copy handed to a rule-triggered lookup.
    pub inside_domain_strategy_rule: bool,
    pub rule_cache: RuleCache,
}

impl Session {
    /// The host name domain matchers look at: the destination domain, or
    /// the sniffed host for IP destinations.
    pub fn domain_host(&self) -> Option<&str> {
        self.destination
            .domain()
            .or(self.sniff_host.as_deref())
            .filter(|host| !host.is_empty())
    }

    pub fn reset_rule_cache(&mut self) {
        self.rule_cache = RuleCache::default();
    }
}

impl Display for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} -> {}",
            self.network, self.source, self.destination,
        )
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("network", &self.network)
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("destination_addresses", &self.destination_addresses)
            .field("applied_domain_strategy", &self.applied_domain_strategy)
            .field(
                "inside_domain_strategy_rule",
                &self.inside_domain_strategy_rule,
            )
            .finish()
    }
}
