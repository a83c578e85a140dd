//! Cursor-on-Target event encoding
//!
//! Turns a [`PositionReport`] into the XML `<event>` document TAK servers
//! accept on their streaming port.

use crate::sink::{PositionReport, SinkError, SinkResult};
use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Height/error value CoT uses for "unknown"
const COT_UNKNOWN_VALUE: &str = "9999999.0";

/// Map an identity name to its CoT affiliation letter
pub fn identity_code(identity: &str) -> Option<char> {
    match identity.to_ascii_lowercase().as_str() {
        "pending" => Some('p'),
        "unknown" => Some('u'),
        "assumed-friend" | "assumed" => Some('a'),
        "friend" => Some('f'),
        "neutral" => Some('n'),
        "suspect" => Some('s'),
        "hostile" => Some('h'),
        "joker" => Some('j'),
        "faker" => Some('k'),
        "none" => Some('o'),
        _ => None,
    }
}

/// Map a battle dimension name to its CoT letter
pub fn dimension_code(dimension: &str) -> Option<char> {
    match dimension.to_ascii_lowercase().as_str() {
        "space" => Some('P'),
        "air" => Some('A'),
        "land-unit" | "land-equipment" | "land-installation" | "ground" => Some('G'),
        "sea-surface" => Some('S'),
        "sea-subsurface" | "subsurface" => Some('U'),
        "other" => Some('X'),
        _ => None,
    }
}

/// Full CoT type string for a report.
///
/// A report type starting with `a-` is already complete. Anything else is a
/// suffix appended to the atom prefix built from identity and dimension.
pub fn cot_type(report: &PositionReport) -> SinkResult<String> {
    if report.report_type.starts_with("a-") {
        return Ok(report.report_type.clone());
    }

    let identity = identity_code(&report.cot_identity).ok_or_else(|| SinkError::Encoding {
        reason: format!("unknown CoT identity '{}'", report.cot_identity),
    })?;
    let dimension = dimension_code(&report.cot_dimension).ok_or_else(|| SinkError::Encoding {
        reason: format!("unknown CoT dimension '{}'", report.cot_dimension),
    })?;

    let suffix = report.report_type.trim_start_matches('-');
    if suffix.is_empty() {
        Ok(format!("a-{}-{}", identity, dimension))
    } else {
        Ok(format!("a-{}-{}-{}", identity, dimension, suffix))
    }
}

/// Encode a report as a CoT event stamped at `now`
pub fn encode_event(report: &PositionReport, now: DateTime<Utc>) -> SinkResult<String> {
    let event_type = cot_type(report)?;
    let stale = now + Duration::minutes(i64::from(report.stale_minutes));
    let time = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let stale = stale.to_rfc3339_opts(SecondsFormat::Millis, true);

    Ok(format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
            "<event version=\"2.0\" uid=\"{uid}\" type=\"{event_type}\" how=\"m-g\" ",
            "time=\"{time}\" start=\"{time}\" stale=\"{stale}\">",
            "<point lat=\"{lat:.5}\" lon=\"{lon:.5}\" hae=\"{unknown}\" ce=\"{unknown}\" le=\"{unknown}\"/>",
            "<detail><contact callsign=\"{callsign}\"/></detail>",
            "</event>"
        ),
        uid = escape_attribute(&report.uid),
        event_type = escape_attribute(&event_type),
        time = time,
        stale = stale,
        lat = report.latitude,
        lon = report.longitude,
        unknown = COT_UNKNOWN_VALUE,
        callsign = escape_attribute(&report.callsign),
    ))
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
