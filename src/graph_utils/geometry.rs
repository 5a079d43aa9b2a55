use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A 2D point or vector. World units inside the graph, screen units once projected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

pub const fn point(x: f32, y: f32) -> Point {
    Point { x, y }
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn length(self) -> f32 { (self.x * self.x + self.y * self.y).sqrt() }

    pub fn distance(self, other: Point) -> f32 { (other - self).length() }

    /// Angle of the vector in radians, as `atan2(y, x)`. Zero for the zero vector.
    pub fn angle(self) -> f32 { self.y.atan2(self.x) }

    pub fn from_angle(angle: f32, length: f32) -> Point {
        point(angle.cos() * length, angle.sin() * length)
    }

    pub fn is_finite(self) -> bool { self.x.is_finite() && self.y.is_finite() }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point { point(self.x + rhs.x, self.y + rhs.y) }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point { point(self.x - rhs.x, self.y - rhs.y) }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Point {
    type Output = Point;
    fn mul(self, rhs: f32) -> Point { point(self.x * rhs, self.y * rhs) }
}

impl Div<f32> for Point {
    type Output = Point;
    fn div(self, rhs: f32) -> Point { point(self.x / rhs, self.y / rhs) }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point { point(-self.x, -self.y) }
}

/// Axis-aligned box in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn around(center: Point, radius: f32) -> Self {
        Self {
            min: point(center.x - radius, center.y - radius),
            max: point(center.x + radius, center.y + radius),
        }
    }

    pub fn union(self, other: Bounds) -> Self {
        Self {
            min: point(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: point(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    pub fn width(&self) -> f32 { self.max.x - self.min.x }
    pub fn height(&self) -> f32 { self.max.y - self.min.y }

    pub fn center(&self) -> Point { (self.min + self.max) * 0.5 }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}
