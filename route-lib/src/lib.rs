use thiserror::Error;

pub mod app;
pub mod config;

mod common;
mod session;

pub use app::{
    dns::DomainStrategy,
    logging::setup_logging,
    router::{
        ClashServer, DefaultHeadlessRule, HeadlessRule, LogicalHeadlessRule, Router,
        RuleDomainStrategy, RuleItem, ThreadSafeRouter, WifiState, new_headless_rule,
    },
};
pub use common::{AdGuardMatcher, DomainMatcher, IpSet};
pub use config::{
    DefaultHeadlessRuleOptions, HeadlessRuleOptions, Listable, LogLevel,
    LogicalHeadlessRuleOptions,
};
pub use session::{Network, ProcessInfo, RuleCache, Session, SocksAddr};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    IpNet(#[from] ipnet::AddrParseError),
    #[error(transparent)]
    Regex(#[from] regex::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("dns error: {0}")]
    DNSError(String),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Prefix the error with the option or sub-rule that produced it.
    pub fn context<C: std::fmt::Display>(self, context: C) -> Self {
        Error::Context {
            context: context.to_string(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
