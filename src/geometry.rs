//! Fundamental planar geometric types for truss modelling.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Position in the plane of the truss, in the model's length unit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Distance along the global X axis.
    pub x: f64,
    /// Distance along the global Y axis.
    pub y: f64,
}

impl Point {
    /// Create a [`Point`] with explicit coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert the point into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl From<Vector2<f64>> for Point {
    fn from(value: Vector2<f64>) -> Self {
        Self::new(value.x, value.y)
    }
}

/// Planar force in the model's force unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Force {
    /// Force component acting along the global X axis.
    pub x: f64,
    /// Force component acting along the global Y axis.
    pub y: f64,
}

impl Force {
    /// Create a [`Force`] with explicit components.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Resolve a load given by magnitude and an angle in degrees measured
    /// counter-clockwise from the +x axis.
    ///
    /// Exact multiples of 90 degrees resolve to exact axis components so a
    /// load at 270 degrees carries no spurious horizontal part.
    ///
    /// # Examples
    /// ```
    /// use truss2d::Force;
    ///
    /// let down = Force::from_polar(10.0, 270.0);
    /// assert_eq!(down, Force::new(0.0, -10.0));
    /// ```
    #[must_use]
    pub fn from_polar(magnitude: f64, angle_degrees: f64) -> Self {
        let normalised = angle_degrees.rem_euclid(360.0);
        let (sin, cos) = if normalised == 0.0 {
            (0.0, 1.0)
        } else if normalised == 90.0 {
            (1.0, 0.0)
        } else if normalised == 180.0 {
            (0.0, -1.0)
        } else if normalised == 270.0 {
            (-1.0, 0.0)
        } else {
            normalised.to_radians().sin_cos()
        };
        Self::new(magnitude * cos, magnitude * sin)
    }
}

impl std::ops::Add for Force {
    type Output = Force;

    fn add(self, rhs: Force) -> Force {
        Force::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign for Force {
    fn add_assign(&mut self, rhs: Force) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

/// Translation of a joint in the model's length unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Displacement {
    /// Displacement component along the global X axis.
    pub x: f64,
    /// Displacement component along the global Y axis.
    pub y: f64,
}

impl Displacement {
    /// Create a [`Displacement`] with explicit components.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Convenience helper for creating [`Point`] instances.
///
/// # Examples
/// ```
/// use truss2d::point;
///
/// let apex = point(2.0, 3.0);
/// assert_eq!(apex.y, 3.0);
/// ```
#[must_use]
pub const fn point(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn point_from_vector() {
        let vector = Vector2::new(1.0, 2.0);
        assert_eq!(Point::from(vector), Point::new(1.0, 2.0));
        assert_eq!(Point::new(1.0, 2.0).to_vector(), vector);
    }

    #[test]
    fn quarter_turns_resolve_exactly() {
        assert_eq!(Force::from_polar(5.0, 0.0), Force::new(5.0, 0.0));
        assert_eq!(Force::from_polar(5.0, 90.0), Force::new(0.0, 5.0));
        assert_eq!(Force::from_polar(5.0, 180.0), Force::new(-5.0, 0.0));
        assert_eq!(Force::from_polar(5.0, -90.0), Force::new(0.0, -5.0));
        assert_eq!(Force::from_polar(5.0, 630.0), Force::new(0.0, -5.0));
    }

    #[test]
    fn oblique_angle_uses_trigonometry() {
        let load = Force::from_polar(2.0, 60.0);
        assert_relative_eq!(load.x, 1.0, epsilon = 1.0e-12);
        assert_relative_eq!(load.y, 3.0_f64.sqrt(), epsilon = 1.0e-12);
    }

    #[test]
    fn forces_accumulate() {
        let mut total = Force::default();
        total += Force::new(1.0, -2.0);
        total += Force::new(0.5, 0.5);
        assert_eq!(total, Force::new(1.5, -1.5));
    }
}
