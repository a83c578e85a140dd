//! Route generation and smoothing algorithms

pub mod geodesy;
pub mod smoothing;
pub mod motion;
pub mod offset;

pub use smoothing::smooth_route;
pub use motion::{circle, loiter, track_adapter, wander};
pub use offset::offset_route;
