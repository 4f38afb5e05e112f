mod app;
mod core;
mod sweep;

pub use app::{
    AppConfig, AppConfigError, AuthConfig, LoggingConfig, RetentionConfig, ServerConfig,
    StorageConfig, SweepSettings,
};
pub use core::Config;
pub use sweep::SweepConfig;
