use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// Plain 2-D vector used for positions, velocities and headings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    #[must_use]
    pub fn magnitude_squared(self) -> f32 {
        self.dot(self)
    }

    #[must_use]
    pub fn magnitude(self) -> f32 {
        self.magnitude_squared().sqrt()
    }

    /// Unit vector in the same direction; the zero vector stays zero.
    #[must_use]
    pub fn normalize(self) -> Self {
        let mag = self.magnitude();
        if mag == 0.0 || !mag.is_finite() {
            return Self::ZERO;
        }
        Self::new(self.x / mag, self.y / mag)
    }

    /// Scale the vector down so its length does not exceed `max`.
    #[must_use]
    pub fn clamp_magnitude(self, max: f32) -> Self {
        let max = max.max(0.0);
        if self.magnitude() > max {
            self.normalize() * max
        } else {
            self
        }
    }

    #[must_use]
    pub fn distance_to(self, other: Self) -> f32 {
        (self - other).magnitude()
    }

    #[must_use]
    pub fn distance_squared_to(self, other: Self) -> f32 {
        (self - other).magnitude_squared()
    }

    /// Linear interpolation towards `target` by factor `t`.
    #[must_use]
    pub fn lerp(self, target: Self, t: f32) -> Self {
        self + (target - self) * t
    }

    #[must_use]
    pub const fn as_tuple(self) -> (f32, f32) {
        (self.x, self.y)
    }
}

impl Add for Vector2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vector2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl Mul<f32> for Vector2 {
    type Output = Self;

    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl Div<f32> for Vector2 {
    type Output = Self;

    /// Division by zero yields the zero vector.
    fn div(self, scalar: f32) -> Self {
        if scalar == 0.0 {
            return Self::ZERO;
        }
        Self::new(self.x / scalar, self.y / scalar)
    }
}

impl From<(f32, f32)> for Vector2 {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}
