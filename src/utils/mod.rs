//! Utility modules for scenario configuration

pub mod config;

pub use config::{ConfigurationManager, EntityConfig, EntityLaunch, ScenarioConfig};
