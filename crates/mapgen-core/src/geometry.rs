use std::fmt;

use serde::{Deserialize, Serialize};

/// A 2D point in unscaled map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            min: Point::new(x, y),
            max: Point::new(x + width, y + height),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// Uniform scale followed by a translation: `screen = model * scale + offset`.
///
/// This is the only transform in the scene. It sits on the `viewbox` layer
/// and every child inherits it through the coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub offset: Point,
    pub scale: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            offset: Point::new(0.0, 0.0),
            scale: 1.0,
        }
    }
}

impl Transform {
    pub fn new(offset: Point, scale: f64) -> Self {
        Self { offset, scale }
    }

    pub fn apply(&self, point: &Point) -> Point {
        Point::new(
            point.x * self.scale + self.offset.x,
            point.y * self.scale + self.offset.y,
        )
    }

    pub fn invert(&self, point: &Point) -> Point {
        Point::new(
            (point.x - self.offset.x) / self.scale,
            (point.y - self.offset.y) / self.scale,
        )
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "translate({},{}) scale({})",
            self.offset.x, self.offset.y, self.scale
        )
    }
}

/// Round `value` to `decimals` fractional digits, halves away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let m = 10f64.powi(decimals);
    (value * m).round() / m
}
