// Library entry point
pub mod catalog;
pub mod config;
pub mod error;
pub mod i18n;
pub mod models;

pub use config::{BuilderOptions, ClashConfigBuilder};
pub use error::{BuildError, Result};
