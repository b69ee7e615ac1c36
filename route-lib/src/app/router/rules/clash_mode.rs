use crate::{
    app::router::{ThreadSafeRouter, rules::RuleItem},
    session::Session,
};

pub struct ClashModeItem {
    router: ThreadSafeRouter,
    mode: String,
}

impl ClashModeItem {
    pub fn new(router: ThreadSafeRouter, mode: String) -> Self {
        Self { router, mode }
    }
}

impl std::fmt::Display for ClashModeItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "clash_mode={}", self.mode)
    }
}

impl RuleItem for ClashModeItem {
    fn matches(&self, _: &Session) -> bool {
        self.router.clash_server().is_some_and(|server| {
            server.mode().to_lowercase() == self.mode.to_lowercase()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::ClashModeItem;
    use crate::{
        app::router::{
            MockClashServer, MockRouter, ThreadSafeRouter, rules::RuleItem,
        },
        session::Session,
    };

    fn router_in_mode(mode: Option<&'static str>) -> ThreadSafeRouter {
        let mut router = MockRouter::new();
        router.expect_clash_server().returning(move || {
            mode.map(|mode| {
                let mut server = MockClashServer::new();
                server.expect_mode().returning(move || mode.to_owned());
                Arc::new(server) as _
            })
        });
        Arc::new(router)
    }

    #[test]
    fn test_clash_mode_case_insensitive() {
        let item =
            ClashModeItem::new(router_in_mode(Some("global")), "Global".to_owned());
        assert!(item.matches(&Session::default()));
        assert_eq!(item.to_string(), "clash_mode=Global");

        let item =
            ClashModeItem::new(router_in_mode(Some("Rule")), "Global".to_owned());
        assert!(!item.matches(&Session::default()));
    }

    #[test]
    fn test_clash_mode_without_server() {
        let item = ClashModeItem::new(router_in_mode(None), "Rule".to_owned());
        assert!(!item.matches(&Session::default()));
    }
}
