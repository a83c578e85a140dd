//! Default parameters and fixed constants

/// Default TAK server streaming port
pub const DEFAULT_SERVER_PORT: u16 = 8087;

/// Walking pace used when no speed is configured (km/h)
pub const DEFAULT_SPEED_KPH: f64 = 5.0;

/// Default maximum gap between two reports (seconds)
pub const DEFAULT_MAX_TIME_STEP_SECS: f64 = 4.0;

/// Friendly ground unit, combat
pub const DEFAULT_REPORT_TYPE: &str = "a-f-G-U-C";

pub const DEFAULT_COT_IDENTITY: &str = "friend";
pub const DEFAULT_COT_DIMENSION: &str = "land-unit";
pub const DEFAULT_STALE_MINUTES: u32 = 1;

/// Angular increment between two circle samples (degrees)
pub const CIRCLE_STEP_DEG: f64 = 9.9;

/// Distance a loitering entity drifts from its centre (km)
pub const DEFAULT_LOITER_JITTER_KM: f64 = 0.005;

/// Decimal places kept on reported coordinates
pub const REPORT_COORDINATE_DECIMALS: i32 = 5;

pub const SECONDS_PER_HOUR: f64 = 3600.0;
