pub mod change_log;
pub mod health;
pub mod pricing;
pub mod rules;

pub use change_log::list_change_log;
pub use health::{health_check, metrics_handler, readiness_check};
pub use pricing::{explain_fee, resolve_fee};
