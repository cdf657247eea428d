pub mod app_config;
pub mod config;
pub mod products;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, WorkerSetting};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{DepartmentOption, ItemStub, ProductRecord, ProductStatus};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
