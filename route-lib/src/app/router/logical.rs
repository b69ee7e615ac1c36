use std::fmt::Display;

use async_trait::async_trait;
use tracing::Span;

use crate::{
    Error, Result,
    app::router::{HeadlessRule, ThreadSafeRouter, new_headless_rule},
    config::{LOGICAL_TYPE_AND, LOGICAL_TYPE_OR, LogicalHeadlessRuleOptions},
    session::Session,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogicalMode {
    /// every sub-rule must match
    And,
    /// at least one sub-rule must match
    Or,
}

impl LogicalMode {
    fn operator(&self) -> &'static str {
        match self {
            LogicalMode::And => " && ",
            LogicalMode::Or => " || ",
        }
    }
}

/// Combines sub-rules, themselves default or logical rules, in order.
/// `invert` applies to the combined result.
pub struct LogicalHeadlessRule {
    mode: LogicalMode,
    rules: Vec<Box<dyn HeadlessRule>>,
    invert: bool,
}

impl LogicalHeadlessRule {
    pub fn new(
        router: ThreadSafeRouter,
        logger: &Span,
        options: LogicalHeadlessRuleOptions,
    ) -> Result<Self> {
        let mode = match options.mode.as_str() {
            LOGICAL_TYPE_AND => LogicalMode::And,
            LOGICAL_TYPE_OR => LogicalMode::Or,
            other => {
                return Err(Error::InvalidConfig(format!(
                    "unknown logical mode: {other}"
                )));
            }
        };

        let rules = options
            .rules
            .into_iter()
            .enumerate()
            .map(|(i, sub_rule)| {
                new_headless_rule(router.clone(), logger, sub_rule)
                    .map_err(|e| e.context(format!("sub rule[{i}]")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            mode,
            rules,
            invert: options.invert,
        })
    }
}

#[async_trait]
impl HeadlessRule for LogicalHeadlessRule {
    async fn matches(&self, sess: &mut Session) -> bool {
        let matched = match self.mode {
            LogicalMode::And => {
                let mut all = true;
                for rule in &self.rules {
                    sess.reset_rule_cache();
                    if !rule.matches(sess).await {
                        all = false;
                        break;
                    }
                }
                all
            }
            LogicalMode::Or => {
                let mut any = false;
                for rule in &self.rules {
                    sess.reset_rule_cache();
                    if rule.matches(sess).await {
                        any = true;
                        break;
                    }
                }
                any
            }
        };
        matched != self.invert
    }
}

impl Display for LogicalHeadlessRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let description = self
            .rules
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(self.mode.operator());
        if self.invert {
            write!(f, "!({description})")
        } else {
            write!(f, "({description})")
        }
    }
}
