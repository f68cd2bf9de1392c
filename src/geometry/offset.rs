//! Parallel offset of route shapes
//!
//! Every segment of the input is shifted sideways by a distance in metres
//! and adjacent shifted segments are joined at the intersection of their
//! supporting lines. Metres are converted to degrees with a spherical earth;
//! longitudes are scaled by the cosine of each segment's mean latitude.

use serde::{Deserialize, Serialize};

use crate::core::types::Location;

/// Mean earth radius used for the metre to degree conversion
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Below this a segment length or line determinant counts as zero
const DEGENERATE_EPSILON: f64 = 1e-10;

/// Cosine between two segments under which a turn counts as a reversal
const REVERSAL_COSINE: f64 = -0.99;

/// Side of the travel direction to offset towards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Right,
    Left,
}

impl Side {
    /// `+1.0` for right, `-1.0` for left
    pub fn sign(self) -> f64 {
        match self {
            Side::Right => 1.0,
            Side::Left => -1.0,
        }
    }
}

/// How adjacent offset segments are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinPolicy {
    /// Intersect unless the segments are parallel
    Always,
    /// Intersect unless parallel or the turn is a near reversal; hairpins keep
    /// both segment endpoints instead of a far-away join
    #[default]
    AngleGated,
}

/// Options for [`offset`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OffsetOptions {
    /// Offset distance in metres
    pub distance_m: f64,
    pub side: Side,
    #[serde(default)]
    pub join: JoinPolicy,
}

impl OffsetOptions {
    pub fn new(distance_m: f64, side: Side) -> Self {
        Self {
            distance_m,
            side,
            ..Default::default()
        }
    }

    pub fn with_join(mut self, join: JoinPolicy) -> Self {
        self.join = join;
        self
    }
}

/// Convert a distance in metres to degrees of arc on the earth's surface
pub fn meters_to_degrees(meters: f64) -> f64 {
    meters / (EARTH_RADIUS_M * std::f64::consts::PI / 180.0)
}

/// One shifted segment plus the scaled direction of the segment it came from
#[derive(Debug, Clone, Copy)]
struct OffsetSegment {
    start: Location,
    end: Location,
    /// `None` for degenerate segments, which are left in place
    direction: Option<(f64, f64)>,
}

impl OffsetSegment {
    fn new(from: Location, to: Location, offset_deg: f64) -> Self {
        let lon_factor = ((from.lat + to.lat) / 2.0)
            .to_radians()
            .cos()
            .max(DEGENERATE_EPSILON);
        let dx = (to.lon - from.lon) * lon_factor;
        let dy = to.lat - from.lat;
        let length = dx.hypot(dy);

        if length < DEGENERATE_EPSILON {
            return Self {
                start: from,
                end: to,
                direction: None,
            };
        }

        let shift_lon = offset_deg * dy / (length * lon_factor);
        let shift_lat = -offset_deg * dx / length;
        Self {
            start: Location::new(from.lon + shift_lon, from.lat + shift_lat),
            end: Location::new(to.lon + shift_lon, to.lat + shift_lat),
            direction: Some((dx, dy)),
        }
    }

    /// Whether turning from `self` into `next` nearly doubles back
    fn reverses_into(&self, next: &OffsetSegment) -> bool {
        match (self.direction, next.direction) {
            (Some((ax, ay)), Some((bx, by))) => {
                let cosine = (ax * bx + ay * by) / (ax.hypot(ay) * bx.hypot(by));
                cosine < REVERSAL_COSINE
            }
            _ => false,
        }
    }

    /// Intersection of the infinite lines through both segments
    fn intersect(&self, other: &OffsetSegment) -> Option<Location> {
        let a1 = self.end.lat - self.start.lat;
        let b1 = self.start.lon - self.end.lon;
        let c1 = a1 * self.start.lon + b1 * self.start.lat;

        let a2 = other.end.lat - other.start.lat;
        let b2 = other.start.lon - other.end.lon;
        let c2 = a2 * other.start.lon + b2 * other.start.lat;

        let det = a1 * b2 - a2 * b1;
        if det.abs() < DEGENERATE_EPSILON {
            return None;
        }
        Some(Location::new(
            (b2 * c1 - b1 * c2) / det,
            (a1 * c2 - a2 * c1) / det,
        ))
    }
}

/// Build a polyline parallel to `points`, offset by `options.distance_m`
/// metres towards `options.side`.
///
/// Returns an empty vector for fewer than two points. Each junction yields
/// the joined vertex, or both segment endpoints when the segments are
/// parallel or the join policy declines the join.
pub fn offset(points: &[Location], options: &OffsetOptions) -> Vec<Location> {
    if points.len() < 2 {
        return Vec::new();
    }

    let offset_deg = meters_to_degrees(options.distance_m) * options.side.sign();
    let segments: Vec<OffsetSegment> = points
        .windows(2)
        .map(|pair| OffsetSegment::new(pair[0], pair[1], offset_deg))
        .collect();

    let mut out = Vec::with_capacity(points.len() + 1);
    out.push(segments[0].start);
    for pair in segments.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        let join = match options.join {
            JoinPolicy::Always => true,
            JoinPolicy::AngleGated => !current.reverses_into(next),
        };
        match join.then(|| current.intersect(next)).flatten() {
            Some(vertex) => out.push(vertex),
            None => {
                out.push(current.end);
                out.push(next.start);
            }
        }
    }
    out.push(segments[segments.len() - 1].end);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE_M: f64 = 1e-6;

    fn metres_per_degree() -> f64 {
        EARTH_RADIUS_M * std::f64::consts::PI / 180.0
    }

    fn line(coords: &[[f64; 2]]) -> Vec<Location> {
        coords.iter().copied().map(Location::from).collect()
    }

    #[test]
    fn test_meters_to_degrees() {
        assert!((meters_to_degrees(metres_per_degree()) - 1.0).abs() < 1e-12);
        assert_eq!(meters_to_degrees(0.0), 0.0);
    }

    #[test]
    fn test_short_input_is_empty() {
        let options = OffsetOptions::new(10.0, Side::Left);
        assert!(offset(&[], &options).is_empty());
        assert!(offset(&line(&[[1.0, 1.0]]), &options).is_empty());
    }

    #[test]
    fn test_right_of_eastward_is_south() {
        let points = line(&[[0.0, 0.0], [0.01, 0.0]]);
        let right = offset(&points, &OffsetOptions::new(10.0, Side::Right));
        assert_eq!(right.len(), 2);
        assert!(right[0].lat < 0.0);
        assert!((right[0].lon - 0.0).abs() < 1e-15);
        assert!((right[1].lon - 0.01).abs() < 1e-15);
    }

    #[test]
    fn test_left_and_right_separation() {
        let points = line(&[[0.0, 0.0], [0.01, 0.0]]);
        let left = offset(&points, &OffsetOptions::new(10.0, Side::Left));
        let right = offset(&points, &OffsetOptions::new(10.0, Side::Right));

        for (l, r) in left.iter().zip(&right) {
            let separation_m = (l.lat - r.lat) * metres_per_degree();
            assert!((separation_m - 20.0).abs() < TOLERANCE_M, "separation {separation_m}");
        }
    }

    #[test]
    fn test_separation_scaled_by_latitude() {
        // Northbound segment at 60N: the shift is purely in longitude
        let points = line(&[[10.0, 60.0], [10.0, 60.01]]);
        let left = offset(&points, &OffsetOptions::new(25.0, Side::Left));
        let right = offset(&points, &OffsetOptions::new(25.0, Side::Right));

        let lon_factor = 60.005f64.to_radians().cos();
        let separation_m = (right[0].lon - left[0].lon) * lon_factor * metres_per_degree();
        assert!((separation_m - 50.0).abs() < TOLERANCE_M, "separation {separation_m}");
        assert!(right[0].lon > 10.0);
    }

    #[test]
    fn test_coincident_segment_unshifted() {
        let points = line(&[[4.35, 50.85], [4.35, 50.85]]);
        let shifted = offset(&points, &OffsetOptions::new(100.0, Side::Right));
        assert_eq!(shifted, points);
    }

    #[test]
    fn test_collinear_segments_keep_gap_endpoints() {
        // Parallel offset lines never intersect
        let points = line(&[[0.0, 0.0], [0.01, 0.0], [0.02, 0.0]]);
        let shifted = offset(&points, &OffsetOptions::new(10.0, Side::Left));
        assert_eq!(shifted.len(), 4);
        assert!((shifted[1].lon - shifted[2].lon).abs() < 1e-15);
    }

    #[test]
    fn test_right_angle_joins_at_single_vertex() {
        // East then north; the left offset corner sits north-west of the bend
        let points = line(&[[0.0, 0.0], [0.01, 0.0], [0.01, 0.01]]);
        let shifted = offset(&points, &OffsetOptions::new(10.0, Side::Left));
        assert_eq!(shifted.len(), 3);

        let corner = shifted[1];
        assert!(corner.lon < 0.01);
        assert!(corner.lat > 0.0);
        assert!((corner.lat - shifted[0].lat).abs() < 1e-12);
        assert!((corner.lon - shifted[2].lon).abs() < 1e-12);
    }

    #[test]
    fn test_join_policy_at_hairpin() {
        let points = line(&[[0.0, 0.0], [0.01, 0.0], [0.0, 0.001]]);

        let gated = offset(&points, &OffsetOptions::new(5.0, Side::Left));
        assert_eq!(gated.len(), 4);

        let always = offset(
            &points,
            &OffsetOptions::new(5.0, Side::Left).with_join(JoinPolicy::Always),
        );
        assert_eq!(always.len(), 3);
        assert_eq!(always[0], gated[0]);
        assert_eq!(always[2], gated[3]);
    }

    #[test]
    fn test_degenerate_segment_skips_angle_gate() {
        let points = line(&[[0.0, 0.0], [0.01, 0.0], [0.01, 0.0], [0.02, 0.0]]);
        let shifted = offset(&points, &OffsetOptions::new(10.0, Side::Right));
        // Zero determinant at both junctions: two endpoints each
        assert_eq!(shifted.len(), 6);
        assert_eq!(shifted[2], Location::new(0.01, 0.0));
        assert_eq!(shifted[3], Location::new(0.01, 0.0));
    }

    #[test]
    fn test_zero_distance_is_identity_on_straight_line() {
        let points = line(&[[0.0, 0.0], [0.01, 0.01]]);
        assert_eq!(offset(&points, &OffsetOptions::default()), points);
    }

    #[test]
    fn test_options_from_json() {
        let options: OffsetOptions =
            serde_json::from_str(r#"{ "distance_m": 3.5, "side": "left" }"#).unwrap();
        assert_eq!(options, OffsetOptions::new(3.5, Side::Left));

        let options: OffsetOptions = serde_json::from_str(
            r#"{ "distance_m": 1.0, "side": "right", "join": "always" }"#,
        )
        .unwrap();
        assert_eq!(options.join, JoinPolicy::Always);
    }
}
