use std::collections::HashSet;

use crate::{
    app::router::rules::{RuleItem, describe},
    session::Session,
};

pub struct PortItem {
    is_source: bool,
    ports: Vec<u16>,
    port_set: HashSet<u16>,
}

impl PortItem {
    pub fn new(is_source: bool, ports: Vec<u16>) -> Self {
        let port_set = ports.iter().copied().collect();
        Self {
            is_source,
            ports,
            port_set,
        }
    }
}

impl std::fmt::Display for PortItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = if self.is_source { "source_port" } else { "port" };
        describe(f, key, &self.ports)
    }
}

impl RuleItem for PortItem {
    fn matches(&self, sess: &Session) -> bool {
        let port = if self.is_source {
            sess.source.port()
        } else {
            sess.destination.port()
        };
        self.port_set.contains(&port)
    }
}
