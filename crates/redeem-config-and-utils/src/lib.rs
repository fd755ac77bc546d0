//! Configuration, paths, logging and shared error types for the redemption service.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DeliveryConfig, DerivationConfig, DerivationSchemeName, DEFAULT_BIND_ADDR,
    DEFAULT_LOG_LEVEL, DEFAULT_STORE_TIMEOUT_MS,
};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
