//! Planar workspace coordinates.
//!
//! Patrol graphs come from floor plans, so positions are plain 2-D points in
//! an arbitrary metric unit rather than geographic coordinates.

/// A 2-D position in the patrolled workspace.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance.
    #[inline]
    pub fn distance(self, other: Point) -> f32 {
        self.distance_2(other).sqrt()
    }

    /// Squared Euclidean distance: cheaper when only ordering matters.
    #[inline]
    pub fn distance_2(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Arithmetic mean of a set of points, or `None` for an empty input.
    pub fn centroid<I: IntoIterator<Item = Point>>(points: I) -> Option<Point> {
        let (mut sx, mut sy, mut n) = (0.0f64, 0.0f64, 0usize);
        for p in points {
            sx += p.x as f64;
            sy += p.y as f64;
            n += 1;
        }
        (n > 0).then(|| Point::new((sx / n as f64) as f32, (sy / n as f64) as f32))
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}
