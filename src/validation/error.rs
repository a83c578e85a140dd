//! Error classification for the track simulator

use crate::sink::error::SinkError;
use std::fmt::Display;

/// Result type for simulator operations
pub type SimResult<T> = Result<T, SimError>;

/// Top-level simulator error
#[derive(thiserror::Error, Debug)]
pub enum SimError {
    /// Invalid parameter, rejected before any playback starts
    #[error("Configuration error: invalid {parameter} = {value}: {reason}")]
    Configuration {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Report sink failure, fatal to the affected worker only
    #[error("Sink error for {callsign} ({uid}): {source}")]
    Sink {
        callsign: String,
        uid: String,
        #[source]
        source: SinkError,
    },

    /// Track file could not be read or held no usable points
    #[error("Track error in '{path}': {reason}")]
    Track { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Worker thread could not be started or panicked
    #[error("Worker for {callsign} failed: {reason}")]
    Worker { callsign: String, reason: String },
}

impl SimError {
    pub fn configuration(parameter: &str, value: impl Display, reason: &str) -> Self {
        SimError::Configuration {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn sink(callsign: &str, uid: &str, source: SinkError) -> Self {
        SimError::Sink {
            callsign: callsign.to_string(),
            uid: uid.to_string(),
            source,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, SimError::Configuration { .. })
    }

    pub fn is_sink(&self) -> bool {
        matches!(self, SimError::Sink { .. })
    }

    /// Name of the offending parameter for configuration errors
    pub fn parameter(&self) -> Option<&str> {
        match self {
            SimError::Configuration { parameter, .. } => Some(parameter),
            _ => None,
        }
    }
}
