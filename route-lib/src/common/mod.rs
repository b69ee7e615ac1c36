mod adguard;
mod domain_matcher;
mod ip_set;

pub use adguard::AdGuardMatcher;
pub use domain_matcher::DomainMatcher;
pub use ip_set::IpSet;
