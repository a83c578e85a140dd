//! Input processing for recorded tracks

pub mod track;

pub use track::{load_gpx_track, parse_gpx};
