pub mod pricing;
pub mod rules;

pub use pricing::ResolveFeeRequest;
pub use rules::{
    ChangeLogParams, ClientDefaultRequest, CreateClientOverrideRequest, FeeBody,
    ListRulesParams, OptionalVersionParams, PackageFeeRequest, UpdateClientOverrideRequest,
    VersionParams, ZoneRuleRequest,
};
