//! Path helpers over ordered waypoint sequences.

use crate::Coordinate;

/// Length in meters of each consecutive segment of `waypoints`.
///
/// Returns `waypoints.len() - 1` entries, or none for fewer than two points.
///
/// # Example
/// ```
/// use worldview_geo::{segment_lengths, Coordinate};
///
/// let path = [
///     Coordinate::new(0.0, 0.0).unwrap(),
///     Coordinate::new(0.0, 0.001).unwrap(),
///     Coordinate::new(0.0, 0.002).unwrap(),
/// ];
/// let segments = segment_lengths(&path);
/// assert_eq!(segments.len(), 2);
/// assert!((segments[0] - 111.2).abs() < 0.1);
/// ```
pub fn segment_lengths(waypoints: &[Coordinate]) -> Vec<f64> {
    waypoints
        .windows(2)
        .map(|pair| pair[0].distance_to(&pair[1]))
        .collect()
}

/// Total length in meters along `waypoints`.
pub fn path_length(waypoints: &[Coordinate]) -> f64 {
    waypoints
        .windows(2)
        .map(|pair| pair[0].distance_to(&pair[1]))
        .sum()
}
