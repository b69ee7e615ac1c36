use std::fmt::{Display, Formatter};

use crate::session::Session;

pub mod adguard;
pub mod clash_mode;
pub mod domain;
pub mod domain_keyword;
pub mod domain_regex;
pub mod ipcidr;
pub mod network;
pub mod package;
pub mod port;
pub mod port_range;
pub mod process;
pub mod wifi;

/// A single condition of a default rule, e.g. `network=tcp`. The `Display`
/// form is the human readable description of the condition.
pub trait RuleItem: Send + Sync + Display {
    /// check if the session satisfies the condition
    fn matches(&self, sess: &Session) -> bool;
}

/// `key=value` for one configured value, `key=[a b c]` for several.
pub(crate) fn describe<T: Display>(
    f: &mut Formatter<'_>,
    key: &str,
    values: &[T],
) -> std::fmt::Result {
    match values {
        [value] => write!(f, "{key}={value}"),
        _ => write!(
            f,
            "{key}=[{}]",
            values
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        ),
    }
}
