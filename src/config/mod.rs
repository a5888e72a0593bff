mod builder;
mod groups;
mod proxy;
mod rules;

pub use builder::{BuilderOptions, ClashConfigBuilder};
pub use groups::{assemble_groups, HEALTH_CHECK_INTERVAL, HEALTH_CHECK_URL};
pub use proxy::map_proxy;
pub use rules::{assemble_rules, AssembledRules, ProviderSettings};
