mod config;
mod outbound;
mod rule;

pub use config::*;
pub use outbound::*;
pub use rule::*;
