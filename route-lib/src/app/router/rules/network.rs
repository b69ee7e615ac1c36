use std::collections::HashSet;

use crate::{
    app::router::rules::{RuleItem, describe},
    session::Session,
};

pub struct NetworkItem {
    networks: Vec<String>,
    network_set: HashSet<String>,
}

impl NetworkItem {
    pub fn new(networks: Vec<String>) -> Self {
        let network_set = networks.iter().cloned().collect();
        Self {
            networks,
            network_set,
        }
    }
}

impl std::fmt::Display for NetworkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        describe(f, "network", &self.networks)
    }
}

impl RuleItem for NetworkItem {
    fn matches(&self, sess: &Session) -> bool {
        self.network_set.contains(sess.network.as_str())
    }
}
