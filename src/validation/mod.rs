//! Error types and parameter validation

pub mod error;

pub use error::{SimError, SimResult};
