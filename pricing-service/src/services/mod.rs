//! Services module for pricing-service.

pub mod database;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod pricing;

pub use database::Database;
pub use error::PricingError;
pub use memory::InMemoryRuleStore;
pub use metrics::{
    get_metrics, init_metrics, record_cache_lookup, record_degraded_resolution, record_error,
    record_resolution, record_resolution_duration, record_rule_mutation,
};
pub use pricing::{CacheSettings, PricingService, PricingSettings};
