mod config_service;
pub use config_service::*;
