use std::{
    fmt::Debug,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

use ip_network_table_deps_treebitmap::IpLookupTable;
use ipnet::IpNet;

/// A set of IPv4 and IPv6 prefixes backed by two tree bitmaps.
pub struct IpSet {
    v4: IpLookupTable<Ipv4Addr, ()>,
    v6: IpLookupTable<Ipv6Addr, ()>,
    len: usize,
}

impl IpSet {
    pub fn new() -> Self {
        Self {
            v4: IpLookupTable::new(),
            v6: IpLookupTable::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, net: IpNet) {
        let replaced = match net.trunc() {
            IpNet::V4(v4) => self.v4.insert(v4.addr(), v4.prefix_len() as _, ()),
            IpNet::V6(v6) => self.v6.insert(v6.addr(), v6.prefix_len() as _, ()),
        };
        if replaced.is_none() {
            self.len += 1;
        }
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => self.v4.longest_match(v4).is_some(),
            IpAddr::V6(v6) => {
                self.v6.longest_match(v6).is_some()
                    || v6
                        .to_ipv4_mapped()
                        .is_some_and(|v4| self.v4.longest_match(v4).is_some())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for IpSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<IpNet> for IpSet {
    fn from_iter<T: IntoIterator<Item = IpNet>>(iter: T) -> Self {
        let mut set = Self::new();
        for net in iter {
            set.insert(net);
        }
        set
    }
}

impl Debug for IpSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpSet").field("len", &self.len).finish()
    }
}
