use std::{net::IpAddr, sync::Arc};

use ipnet::IpNet;

use crate::{
    Result,
    app::router::rules::{RuleItem, describe},
    common::IpSet,
    session::Session,
};

/// `ip_cidr` against the destination, `source_ip_cidr` against the source.
pub struct IpCidrItem {
    is_source: bool,
    cidrs: Vec<String>,
    set: IpSet,
}

impl IpCidrItem {
    /// Each entry is a prefix like `10.0.0.0/8` or a bare address.
    pub fn new(is_source: bool, cidrs: Vec<String>) -> Result<Self> {
        let mut set = IpSet::new();
        for cidr in &cidrs {
            let net = match cidr.parse::<IpNet>() {
                Ok(net) => net,
                Err(e) => match cidr.parse::<IpAddr>() {
                    Ok(ip) => IpNet::from(ip),
                    Err(_) => return Err(e.into()),
                },
            };
            set.insert(net);
        }
        Ok(Self {
            is_source,
            cidrs,
            set,
        })
    }
}

impl std::fmt::Display for IpCidrItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = if self.is_source {
            "source_ip_cidr"
        } else {
            "ip_cidr"
        };
        describe(f, key, &self.cidrs)
    }
}

impl RuleItem for IpCidrItem {
    fn matches(&self, sess: &Session) -> bool {
        match_ip_set(&self.set, self.is_source, sess)
    }
}

/// A prebuilt set, e.g. compiled from a rule set.
pub struct RawIpCidrItem {
    is_source: bool,
    set: Arc<IpSet>,
}

impl RawIpCidrItem {
    pub fn new(is_source: bool, set: Arc<IpSet>) -> Self {
        Self { is_source, set }
    }
}

impl std::fmt::Display for RawIpCidrItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_source {
            write!(f, "source_ip_cidr=<binary>")
        } else {
            write!(f, "ip_cidr=<binary>")
        }
    }
}

impl RuleItem for RawIpCidrItem {
    fn matches(&self, sess: &Session) -> bool {
        match_ip_set(&self.set, self.is_source, sess)
    }
}

fn match_ip_set(set: &IpSet, is_source: bool, sess: &Session) -> bool {
    if is_source {
        return set.contains(sess.source.ip());
    }
    // an IP literal destination wins over anything resolved
    if let Some(ip) = sess.destination.ip() {
        return set.contains(ip);
    }
    sess.destination_addresses
        .iter()
        .any(|ip| set.contains(*ip))
}
