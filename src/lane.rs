use geo::{Coord, EuclideanDistance, LineString, Point};
use nalgebra::Vector2;

use crate::error::{FilterError, Result};

/// Polyline approximating the path a followed obstacle is expected to take
///
/// # Invariants
/// - At least 2 points, so a direction can always be formed
/// - No zero-length segments (consecutive duplicate points)
/// - All coordinates finite
///
/// A `Lane` is immutable after construction. Share it between filters with
/// `Arc<Lane>`.
///
/// # Usage
/// ```
/// use obstacle_kf::lane::Lane;
///
/// let lane = Lane::new(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]).unwrap();
/// let d = lane.nearest_direction((1.0, 1.0));
/// assert_eq!((d.x, d.y), (1.0, 0.0));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Lane {
    line: LineString<f64>,
}

impl Lane {
    /// Build a lane from an ordered sequence of (x, y) points
    pub fn new<I, C>(points: I) -> Result<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<Coord<f64>>,
    {
        let coords: Vec<Coord<f64>> = points.into_iter().map(Into::into).collect();

        if coords.len() < 2 {
            return Err(FilterError::InvalidLane {
                reason: format!("need at least 2 points, got {}", coords.len()),
            });
        }

        if let Some(i) = coords.iter().position(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(FilterError::InvalidLane {
                reason: format!("point {} is not finite", i),
            });
        }

        if let Some(i) = coords.windows(2).position(|w| w[0] == w[1]) {
            return Err(FilterError::InvalidLane {
                reason: format!("points {} and {} coincide", i, i + 1),
            });
        }

        Ok(Lane {
            line: LineString::new(coords),
        })
    }

    pub fn points(&self) -> &[Coord<f64>] {
        &self.line.0
    }

    pub fn len(&self) -> usize {
        self.line.0.len()
    }

    /// Always false for a constructed lane
    pub fn is_empty(&self) -> bool {
        self.line.0.is_empty()
    }

    pub fn geometry(&self) -> &LineString<f64> {
        &self.line
    }

    /// Index of the segment used to linearize motion at `position`
    ///
    /// The nearest lane point wins (lowest index on ties). The result is
    /// clamped to `len - 2` so that `i + 1` is always a valid point.
    pub fn nearest_segment_index(&self, position: (f64, f64)) -> usize {
        let query = Point::new(position.0, position.1);

        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, coord) in self.line.0.iter().enumerate() {
            let dist = Point::from(*coord).euclidean_distance(&query);
            if dist < best_dist {
                best = i;
                best_dist = dist;
            }
        }

        best.min(self.len() - 2)
    }

    /// Unit direction of the lane segment nearest to `position`
    pub fn nearest_direction(&self, position: (f64, f64)) -> Vector2<f64> {
        let i = self.nearest_segment_index(position);
        let a = self.line.0[i];
        let b = self.line.0[i + 1];

        Vector2::new(b.x - a.x, b.y - a.y).normalize()
    }
}
