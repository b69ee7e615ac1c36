use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Which address families a rule-triggered lookup asks for, and in which
/// order.
#[derive(
    Serialize, Deserialize, Default, Copy, Clone, Debug, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum DomainStrategy {
    #[default]
    #[serde(alias = "")]
    AsIs,
    PreferIpv4,
    PreferIpv6,
    Ipv4Only,
    Ipv6Only,
}

impl Display for DomainStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainStrategy::AsIs => write!(f, "as_is"),
            DomainStrategy::PreferIpv4 => write!(f, "prefer_ipv4"),
            DomainStrategy::PreferIpv6 => write!(f, "prefer_ipv6"),
            DomainStrategy::Ipv4Only => write!(f, "ipv4_only"),
            DomainStrategy::Ipv6Only => write!(f, "ipv6_only"),
        }
    }
}

impl FromStr for DomainStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "as_is" => Ok(DomainStrategy::AsIs),
            "prefer_ipv4" => Ok(DomainStrategy::PreferIpv4),
            "prefer_ipv6" => Ok(DomainStrategy::PreferIpv6),
            "ipv4_only" => Ok(DomainStrategy::Ipv4Only),
            "ipv6_only" => Ok(DomainStrategy::Ipv6Only),
            _ => Err(Error::InvalidConfig(format!(
                "unknown domain strategy: {s}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DomainStrategy;

    #[test]
    fn test_domain_strategy_names() {
        for strategy in [
            DomainStrategy::AsIs,
            DomainStrategy::PreferIpv4,
            DomainStrategy::PreferIpv6,
            DomainStrategy::Ipv4Only,
            DomainStrategy::Ipv6Only,
        ] {
            let parsed = strategy.to_string().parse::<DomainStrategy>().unwrap();
            assert_eq!(parsed, strategy);
        }
        assert_eq!("".parse::<DomainStrategy>().unwrap(), DomainStrategy::AsIs);
        assert!("use_ipv4".parse::<DomainStrategy>().is_err());
    }

    #[test]
    fn test_domain_strategy_serde() {
        let strategy: DomainStrategy =
            serde_json::from_str(r#""prefer_ipv4""#).unwrap();
        assert_eq!(strategy, DomainStrategy::PreferIpv4);
        let strategy: DomainStrategy = serde_json::from_str(r#""""#).unwrap();
        assert_eq!(strategy, DomainStrategy::AsIs);
        assert_eq!(
            serde_json::to_string(&DomainStrategy::Ipv6Only).unwrap(),
            r#""ipv6_only""#
        );
    }
}
