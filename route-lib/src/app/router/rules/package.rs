use std::collections::HashSet;

use crate::{
    app::router::rules::{RuleItem, describe},
    session::Session,
};

/// Android package name of the owning app.
pub struct PackageNameItem {
    names: Vec<String>,
    name_set: HashSet<String>,
}

impl PackageNameItem {
    pub fn new(names: Vec<String>) -> Self {
        let name_set = names.iter().cloned().collect();
        Self { names, name_set }
    }
}

impl std::fmt::Display for PackageNameItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        describe(f, "package_name", &self.names)
    }
}

impl RuleItem for PackageNameItem {
    fn matches(&self, sess: &Session) -> bool {
        sess.process_info
            .as_ref()
            .is_some_and(|info| self.name_set.contains(&info.package_name))
    }
}
