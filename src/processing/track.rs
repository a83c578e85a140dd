//! GPX track ingestion
//!
//! Recorded tracks are flattened into a single waypoint list: every point of
//! every segment of every track, in file order. Timestamps and elevation in
//! the file are ignored; playback timing comes from the smoother.

use crate::core::{Route, Waypoint};
use crate::validation::error::{SimError, SimResult};
use log::debug;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Load every track point from a GPX file
pub fn load_gpx_track<P: AsRef<Path>>(path: P) -> SimResult<Route> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| track_error(path, e))?;
    let route = parse_gpx(BufReader::new(file)).map_err(|e| match e {
        SimError::Track { reason, .. } => SimError::Track {
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })?;

    debug!("Loaded {} track point(s) from {}", route.len(), path.display());
    Ok(route)
}

/// Parse GPX from any reader
pub fn parse_gpx<R: Read>(reader: R) -> SimResult<Route> {
    let document = gpx::read(reader).map_err(|e| SimError::Track {
        path: "<reader>".to_string(),
        reason: e.to_string(),
    })?;

    let route: Route = document
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
        .map(|point| {
            let p = point.point();
            Waypoint::new(p.y(), p.x())
        })
        .collect();

    if route.is_empty() {
        return Err(SimError::Track {
            path: "<reader>".to_string(),
            reason: "no track points found".to_string(),
        });
    }
    Ok(route)
}

fn track_error(path: &Path, error: impl std::fmt::Display) -> SimError {
    SimError::Track {
        path: path.display().to_string(),
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TWO_TRACKS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="track_sim tests" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>first</name>
    <trkseg>
      <trkpt lat="-27.4635" lon="153.0355"><ele>10.0</ele></trkpt>
      <trkpt lat="-27.4640" lon="153.0360"></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="-27.4645" lon="153.0365"></trkpt>
    </trkseg>
  </trk>
  <trk>
    <name>second</name>
    <trkseg>
      <trkpt lat="-27.4650" lon="153.0370"></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn test_parse_flattens_tracks_and_segments() {
        let route = parse_gpx(TWO_TRACKS.as_bytes()).unwrap();
        assert_eq!(
            route,
            vec![
                Waypoint::new(-27.4635, 153.0355),
                Waypoint::new(-27.4640, 153.0360),
                Waypoint::new(-27.4645, 153.0365),
                Waypoint::new(-27.4650, 153.0370),
            ]
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(TWO_TRACKS.as_bytes()).unwrap();

        let route = load_gpx_track(file.path()).unwrap();
        assert_eq!(route.len(), 4);
    }

    #[test]
    fn test_missing_file_is_track_error() {
        let err = load_gpx_track("/nonexistent/route.gpx").unwrap_err();
        match err {
            SimError::Track { path, .. } => assert_eq!(path, "/nonexistent/route.gpx"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_empty_or_malformed_track_is_rejected() {
        let empty = r#"<?xml version="1.0"?><gpx version="1.1" creator="t"></gpx>"#;
        assert!(matches!(parse_gpx(empty.as_bytes()), Err(SimError::Track { .. })));
        assert!(matches!(parse_gpx("not xml at all".as_bytes()), Err(SimError::Track { .. })));
    }
}
