//! Douglas-Peucker polyline simplification

use crate::core::types::Location;

/// Simplify a polyline so no removed point deviates more than `epsilon`
/// (in degrees) from the kept shape.
///
/// The first and last points are always kept. Inputs with two points or
/// fewer, and a tolerance that is not strictly positive, are returned
/// unchanged.
pub fn simplify(points: &[Location], epsilon: f64) -> Vec<Location> {
    if points.len() <= 2 || epsilon.is_nan() || epsilon <= 0.0 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    // Ranges still to examine, bounds inclusive
    let mut stack = vec![(0, last)];
    while let Some((first, last)) = stack.pop() {
        if last <= first + 1 {
            continue;
        }
        let (max_idx, max_dist) = farthest_point(points, first, last);
        if max_dist > epsilon {
            keep[max_idx] = true;
            stack.push((max_idx, last));
            stack.push((first, max_idx));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(point, kept)| kept.then_some(*point))
        .collect()
}

/// Interior point farthest from the chord `first..=last`; ties go to the lowest index
fn farthest_point(points: &[Location], first: usize, last: usize) -> (usize, f64) {
    let (start, end) = (points[first], points[last]);
    let mut max_dist = 0.0;
    let mut max_idx = first;

    for (i, &point) in points.iter().enumerate().take(last).skip(first + 1) {
        let dist = perpendicular_distance(point, start, end);
        if dist > max_dist {
            max_dist = dist;
            max_idx = i;
        }
    }
    (max_idx, max_dist)
}

/// Distance from `point` to the line through `line_start` and `line_end`.
///
/// Falls back to the distance to `line_start` when the line has zero length.
pub fn perpendicular_distance(point: Location, line_start: Location, line_end: Location) -> f64 {
    let dx = line_end.lon - line_start.lon;
    let dy = line_end.lat - line_start.lat;

    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return (point.lon - line_start.lon).hypot(point.lat - line_start.lat);
    }

    let cross = dy * point.lon - dx * point.lat + line_end.lon * line_start.lat
        - line_end.lat * line_start.lon;
    cross.abs() / len_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(coords: &[[f64; 2]]) -> Vec<Location> {
        coords.iter().copied().map(Location::from).collect()
    }

    #[test]
    fn test_short_input_unchanged() {
        let two = line(&[[0.0, 0.0], [1.0, 1.0]]);
        assert_eq!(simplify(&two, 10.0), two);
        assert!(simplify(&[], 1.0).is_empty());
    }

    #[test]
    fn test_non_positive_epsilon_unchanged() {
        let points = line(&[[0.0, 0.0], [0.5, 0.0], [1.0, 0.0], [2.0, 0.0]]);
        assert_eq!(simplify(&points, 0.0), points);
        assert_eq!(simplify(&points, -1.0), points);
        assert_eq!(simplify(&points, f64::NAN), points);
    }

    #[test]
    fn test_collinear_collapses_to_endpoints() {
        let points = line(&[[0.0, 0.0], [0.0, 1.0], [0.0, 2.0]]);
        assert_eq!(simplify(&points, 0.1), line(&[[0.0, 0.0], [0.0, 2.0]]));
        assert_eq!(simplify(&points, 0.5), line(&[[0.0, 0.0], [0.0, 2.0]]));
    }

    #[test]
    fn test_apex_is_kept() {
        let points = line(&[[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]]);
        assert_eq!(simplify(&points, 0.5), points);

        let peak = line(&[[0.0, 0.0], [5.0, 5.0], [0.0, 10.0]]);
        assert_eq!(simplify(&peak, 4.9), peak);
        assert_eq!(simplify(&peak, 5.1), line(&[[0.0, 0.0], [0.0, 10.0]]));
    }

    #[test]
    fn test_large_epsilon_keeps_endpoints() {
        let points = line(&[[0.0, 0.0], [1.0, 0.3], [2.0, -0.2], [3.0, 0.1], [4.0, 0.0]]);
        assert_eq!(simplify(&points, 1.0), line(&[[0.0, 0.0], [4.0, 0.0]]));
    }

    #[test]
    fn test_keeps_only_significant_points() {
        let points = line(&[
            [0.0, 0.0],
            [1.0, 0.9],
            [2.0, 2.0],
            [3.0, 1.1],
            [4.0, 0.0],
        ]);
        assert_eq!(
            simplify(&points, 0.5),
            line(&[[0.0, 0.0], [2.0, 2.0], [4.0, 0.0]])
        );
    }

    #[test]
    fn test_ties_prefer_lowest_index() {
        // Both interior points sit 1.0 off the chord
        let points = line(&[[0.0, 0.0], [1.0, 1.0], [2.0, -1.0], [3.0, 0.0]]);
        assert_eq!(farthest_point(&points, 0, 3), (1, 1.0));
    }

    #[test]
    fn test_closed_ring_uses_point_distance() {
        // First and last coincide, so distances are measured to that point
        let points = line(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]);
        let simplified = simplify(&points, 0.5);
        assert_eq!(simplified.first(), points.first());
        assert_eq!(simplified.last(), points.last());
        assert!(simplified.contains(&Location::new(1.0, 1.0)));
    }

    #[test]
    fn test_deterministic() {
        let points: Vec<Location> = (0..200)
            .map(|i| {
                let x = i as f64 * 0.01;
                Location::new(x, (x * 7.0).sin() * 0.05)
            })
            .collect();
        let first = simplify(&points, 0.005);
        let second = simplify(&points, 0.005);
        assert_eq!(first, second);
        assert!(first.len() < points.len());
        assert_eq!(first[0], points[0]);
        assert_eq!(first[first.len() - 1], points[points.len() - 1]);
    }

    #[test]
    fn test_long_zigzag_does_not_overflow() {
        let points: Vec<Location> = (0..10_000)
            .map(|i| Location::new(i as f64, if i % 2 == 0 { 0.0 } else { 1.0 }))
            .collect();
        let simplified = simplify(&points, 0.1);
        assert_eq!(simplified.len(), points.len());
    }

    #[test]
    fn test_perpendicular_distance() {
        let a = Location::new(0.0, 0.0);
        let b = Location::new(2.0, 0.0);
        assert!((perpendicular_distance(Location::new(1.0, 3.0), a, b) - 3.0).abs() < 1e-12);
        assert!((perpendicular_distance(Location::new(3.0, 4.0), a, a) - 5.0).abs() < 1e-12);
    }
}
