use std::collections::HashSet;

use crate::{
    app::router::{
        ThreadSafeRouter,
        rules::{RuleItem, describe},
    },
    session::Session,
};

/// SSID of the Wi-Fi network the host is on, as reported by the router.
pub struct WifiSsidItem {
    router: ThreadSafeRouter,
    ssids: Vec<String>,
    ssid_set: HashSet<String>,
}

impl WifiSsidItem {
    pub fn new(router: ThreadSafeRouter, ssids: Vec<String>) -> Self {
        let ssid_set = ssids.iter().cloned().collect();
        Self {
            router,
            ssids,
            ssid_set,
        }
    }
}

impl std::fmt::Display for WifiSsidItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        describe(f, "wifi_ssid", &self.ssids)
    }
}

impl RuleItem for WifiSsidItem {
    fn matches(&self, _: &Session) -> bool {
        self.ssid_set.contains(&self.router.wifi_state().ssid)
    }
}

pub struct WifiBssidItem {
    router: ThreadSafeRouter,
    bssids: Vec<String>,
    bssid_set: HashSet<String>,
}

impl WifiBssidItem {
    pub fn new(router: ThreadSafeRouter, bssids: Vec<String>) -> Self {
        let bssid_set = bssids.iter().cloned().collect();
        Self {
            router,
            bssids,
            bssid_set,
        }
    }
}

impl std::fmt::Display for WifiBssidItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        describe(f, "wifi_bssid", &self.bssids)
    }
}

impl RuleItem for WifiBssidItem {
    fn matches(&self, _: &Session) -> bool {
        self.bssid_set.contains(&self.router.wifi_state().bssid)
    }
}
