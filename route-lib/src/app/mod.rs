pub mod dns;
pub mod logging;
pub mod router;
