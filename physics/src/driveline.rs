/*!
Track parametrization: distance along the track and lap counting.

The race rules only need two numbers from the track: how far along a lap a
position is, and how long a lap is. [`TrackParametrization`] is that seam;
[`Driveline`] implements it over a closed polyline on the ground plane (the
racing line authored with the track).

Projections are windowed around a segment hint so a kart on a track that
crosses itself (figure eight, bridges) does not jump to the other branch.
*/

use std::path::Path;

use serde::Deserialize;

use crate::{config::LapSettings, error::ConfigError, types::Vec3};

/// Result of mapping a world position onto the track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackProjection {
    /// Distance along the lap, in `[0, length)`.
    pub distance: f32,
    /// Driveline segment the position was projected onto.
    pub segment: usize,
}

pub trait TrackParametrization {
    /// Project `position` onto the track. With a hint only the segments within
    /// `window` of it are searched; without one the whole track is.
    fn project(&self, position: Vec3, hint: Option<usize>, window: usize) -> TrackProjection;

    /// Length of one lap (meters).
    fn length(&self) -> f32;

    fn segment_count(&self) -> usize;
}

/// Closed polyline in the XZ plane. Segment `i` runs from point `i` to point `i + 1`
/// (the last one back to the first).
#[derive(Clone, Debug)]
pub struct Driveline {
    points: Vec<[f32; 2]>,
    /// Distance from the start line to the beginning of each segment.
    starts: Vec<f32>,
    length: f32,
}

#[derive(Debug, Deserialize)]
struct DrivelineFile {
    points: Vec<[f32; 2]>,
}

impl Driveline {
    /// Build from XZ points. The first point is on the start line.
    pub fn new(points: Vec<[f32; 2]>) -> Result<Self, ConfigError> {
        if points.len() < 3 {
            return Err(ConfigError::Invalid(format!(
                "driveline needs at least 3 points, got {}",
                points.len()
            )));
        }
        if points.iter().flatten().any(|c| !c.is_finite()) {
            return Err(ConfigError::Invalid("driveline has non-finite points".into()));
        }

        let mut starts = Vec::with_capacity(points.len());
        let mut length = 0.0;
        for i in 0..points.len() {
            starts.push(length);
            let (a, b) = (points[i], points[(i + 1) % points.len()]);
            length += (b[0] - a[0]).hypot(b[1] - a[1]);
        }
        if length <= 0.0 {
            return Err(ConfigError::Invalid("driveline has zero length".into()));
        }

        Ok(Self {
            points,
            starts,
            length,
        })
    }

    /// ```toml
    /// points = [[0.0, 0.0], [50.0, 0.0], [50.0, 30.0], [0.0, 30.0]]
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: DrivelineFile = toml::from_str(text)?;
        Self::new(file.points)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Squared planar distance to segment `i` and the projected lap distance.
    fn project_on_segment(&self, i: usize, x: f32, z: f32) -> (f32, f32) {
        let a = self.points[i];
        let b = self.points[(i + 1) % self.points.len()];
        let (dx, dz) = (b[0] - a[0], b[1] - a[1]);
        let len_sq = dx * dx + dz * dz;
        let t = if len_sq > 0.0 {
            (((x - a[0]) * dx + (z - a[1]) * dz) / len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let (px, pz) = (a[0] + dx * t, a[1] + dz * t);
        let dist_sq = (x - px) * (x - px) + (z - pz) * (z - pz);
        (dist_sq, self.starts[i] + t * len_sq.sqrt())
    }
}

impl TrackParametrization for Driveline {
    fn project(&self, position: Vec3, hint: Option<usize>, window: usize) -> TrackProjection {
        let n = self.points.len();
        let candidates: Box<dyn Iterator<Item = usize>> = match hint {
            Some(hint) if window.saturating_mul(2) < n - 1 => {
                let w = window;
                Box::new((0..=2 * w).map(move |k| (hint % n + n + k - w) % n))
            }
            _ => Box::new(0..n),
        };

        let mut best = TrackProjection {
            distance: 0.0,
            segment: 0,
        };
        let mut best_sq = f32::INFINITY;
        for i in candidates {
            let (dist_sq, distance) = self.project_on_segment(i, position.x, position.z);
            if dist_sq < best_sq {
                best_sq = dist_sq;
                best = TrackProjection {
                    distance: distance.rem_euclid(self.length),
                    segment: i,
                };
            }
        }
        best
    }

    fn length(&self) -> f32 {
        self.length
    }

    fn segment_count(&self) -> usize {
        self.points.len()
    }
}

/// Whether a newly projected segment may replace the current hint: it must be
/// within `window` segments, counting across the start line.
pub fn accept_hint(current: usize, candidate: usize, segment_count: usize, window: usize) -> bool {
    if segment_count == 0 {
        return false;
    }
    let forward = (candidate + segment_count - current % segment_count) % segment_count;
    forward.min(segment_count - forward) <= window
}

/// Lap change implied by moving from `last` to `current` track distance.
///
/// Crossing the start line forwards (from the last `1 - wrap_high` of the lap into
/// the first `wrap_low`) counts +1; crossing it backwards counts -1.
pub fn lap_delta(last: f32, current: f32, length: f32, settings: &LapSettings) -> i32 {
    let high = settings.wrap_high * length;
    let low = settings.wrap_low * length;
    if last > high && current < low {
        1
    } else if current > high && last < low {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 100 x 50 rectangle, counter-clockwise seen from above, 300 m per lap.
    fn rectangle() -> Driveline {
        Driveline::new(vec![[0.0, 0.0], [100.0, 0.0], [100.0, 50.0], [0.0, 50.0]]).unwrap()
    }

    #[test]
    fn length_is_closed_perimeter() {
        let line = rectangle();
        assert_eq!(line.length(), 300.0);
        assert_eq!(line.segment_count(), 4);
    }

    #[test]
    fn projection_measures_distance_along_lap() {
        let line = rectangle();
        let p = line.project(Vec3::new(30.0, 0.0, 2.0), None, 0);
        assert_eq!(p.segment, 0);
        assert!((p.distance - 30.0).abs() < 1.0e-4);

        let p = line.project(Vec3::new(98.0, 1.0, 20.0), None, 0);
        assert_eq!(p.segment, 1);
        assert!((p.distance - 120.0).abs() < 1.0e-4);

        let p = line.project(Vec3::new(-1.0, 0.0, 10.0), None, 0);
        assert_eq!(p.segment, 3);
        assert!((p.distance - 290.0).abs() < 1.0e-4);
    }

    #[test]
    fn hinted_projection_only_searches_nearby() {
        // Eight segments so a window of 2 excludes part of the lap.
        let line = Driveline::new(vec![
            [0.0, 0.0],
            [50.0, 0.0],
            [100.0, 0.0],
            [100.0, 25.0],
            [100.0, 50.0],
            [50.0, 50.0],
            [0.0, 50.0],
            [0.0, 25.0],
        ])
        .unwrap();
        let pos = Vec3::new(60.0, 0.0, 49.0);
        assert_eq!(line.project(pos, None, 2).segment, 4);
        // Hinted at segment 0, the search covers segments 6, 7, 0, 1, 2.
        let hinted = line.project(pos, Some(0), 2);
        assert!([6, 7, 0, 1, 2].contains(&hinted.segment));

        // The window comes from the caller's lap settings.
        assert_eq!(line.project(pos, Some(0), 0).segment, 0);
        assert_eq!(line.project(pos, Some(3), 1).segment, 4);
        let wide = LapSettings {
            hint_window: 4,
            ..LapSettings::default()
        };
        assert_eq!(line.project(pos, Some(0), wide.hint_window).segment, 4);
    }

    #[test]
    fn hint_acceptance_wraps_at_start_line() {
        assert!(accept_hint(5, 6, 10, 2));
        assert!(accept_hint(5, 3, 10, 2));
        assert!(!accept_hint(5, 8, 10, 2));
        assert!(accept_hint(0, 9, 10, 2));
        assert!(accept_hint(9, 0, 10, 2));
        assert!(!accept_hint(0, 9, 10, 0));
    }

    #[test]
    fn lap_delta_counts_line_crossings() {
        let lap = LapSettings::default();
        assert_eq!(lap_delta(295.0, 3.0, 300.0, &lap), 1);
        assert_eq!(lap_delta(3.0, 295.0, 300.0, &lap), -1);
        assert_eq!(lap_delta(100.0, 120.0, 300.0, &lap), 0);
        assert_eq!(lap_delta(150.0, 10.0, 300.0, &lap), 0);
    }

    #[test]
    fn degenerate_drivelines_are_rejected() {
        assert!(Driveline::new(vec![[0.0, 0.0], [1.0, 0.0]]).is_err());
        assert!(Driveline::new(vec![[0.0, 0.0]; 4]).is_err());
        assert!(Driveline::new(vec![[0.0, 0.0], [f32::NAN, 0.0], [1.0, 1.0]]).is_err());
    }

    #[test]
    fn parses_points_from_toml() {
        let line = Driveline::from_toml_str("points = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]]")
            .unwrap();
        assert!((line.length() - (20.0 + 200.0_f32.sqrt())).abs() < 1.0e-4);
    }
}
