use std::collections::HashSet;

use regex::RegexSet;

use crate::{
    Result,
    app::router::rules::{RuleItem, describe},
    session::Session,
};

/// Matches the executable name, the last component of the process path.
pub struct ProcessItem {
    names: Vec<String>,
    name_set: HashSet<String>,
}

impl ProcessItem {
    pub fn new(names: Vec<String>) -> Self {
        let name_set = names.iter().cloned().collect();
        Self { names, name_set }
    }
}

impl std::fmt::Display for ProcessItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        describe(f, "process_name", &self.names)
    }
}

impl RuleItem for ProcessItem {
    fn matches(&self, sess: &Session) -> bool {
        sess.process_info
            .as_ref()
            .and_then(|info| info.process_name())
            .is_some_and(|name| self.name_set.contains(name))
    }
}

pub struct ProcessPathItem {
    paths: Vec<String>,
    path_set: HashSet<String>,
}

impl ProcessPathItem {
    pub fn new(paths: Vec<String>) -> Self {
        let path_set = paths.iter().cloned().collect();
        Self { paths, path_set }
    }
}

impl std::fmt::Display for ProcessPathItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        describe(f, "process_path", &self.paths)
    }
}

impl RuleItem for ProcessPathItem {
    fn matches(&self, sess: &Session) -> bool {
        sess.process_info
            .as_ref()
            .is_some_and(|info| self.path_set.contains(&info.process_path))
    }
}

pub struct ProcessPathRegexItem {
    regexes: Vec<String>,
    set: RegexSet,
}

impl ProcessPathRegexItem {
    pub fn new(regexes: Vec<String>) -> Result<Self> {
        let set = RegexSet::new(&regexes)?;
        Ok(Self { regexes, set })
    }
}

impl std::fmt::Display for ProcessPathRegexItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        describe(f, "process_path_regex", &self.regexes)
    }
}

impl RuleItem for ProcessPathRegexItem {
    fn matches(&self, sess: &Session) -> bool {
        sess.process_info
            .as_ref()
            .filter(|info| !info.process_path.is_empty())
            .is_some_and(|info| self.set.is_match(&info.process_path))
    }
}
