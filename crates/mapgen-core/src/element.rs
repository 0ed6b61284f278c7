use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{BBox, Point};
use crate::layer::{Paint, Style};

/// Stable element identity.
pub type ElementId = Uuid;

/// Which zoom-adaptive rule a desired metric feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricCategory {
    /// Desired font size of a label group.
    Label,
    /// Desired marker size; the anchor is the marker's pin point.
    Marker,
    /// Desired icon size of a burg icon or anchor group.
    Icon,
    /// Desired legend font size; the anchor is its position in percent.
    Legend,
    /// Desired font size of the coordinate grid labels.
    Coordinates,
}

/// Scale-independent baseline a rendered value is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveMetric {
    pub category: MetricCategory,
    pub desired: f32,
    pub anchor: Option<Point>,
}

impl AdaptiveMetric {
    pub fn new(category: MetricCategory, desired: f32) -> Self {
        Self {
            category,
            desired,
            anchor: None,
        }
    }

    pub fn anchored(category: MetricCategory, desired: f32, anchor: Point) -> Self {
        Self {
            category,
            desired,
            anchor: Some(anchor),
        }
    }

    /// The desired value, or `None` when it is not a usable number.
    pub fn desired(&self) -> Option<f32> {
        self.desired.is_finite().then_some(self.desired)
    }

    /// The anchor, or `None` when missing or not finite.
    pub fn anchor(&self) -> Option<Point> {
        self.anchor.filter(|p| p.x.is_finite() && p.y.is_finite())
    }
}

/// Geometry of a drawable element. Path data is opaque and never parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Path { d: String },
    Polygon { points: Vec<Point> },
    Rect { x: f64, y: f64, width: f64, height: f64 },
    Circle { cx: f64, cy: f64, r: f64 },
    Line { x1: f64, y1: f64, x2: f64, y2: f64 },
    Text { x: f64, y: f64, content: String },
    /// Reference to a symbol definition.
    Use { href: String, x: f64, y: f64, width: f64, height: f64 },
    Image { href: String, x: f64, y: f64, width: f64, height: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Path,
    Polygon,
    Rect,
    Circle,
    Line,
    Text,
    Use,
    Image,
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Path { .. } => ShapeKind::Path,
            Shape::Polygon { .. } => ShapeKind::Polygon,
            Shape::Rect { .. } => ShapeKind::Rect,
            Shape::Circle { .. } => ShapeKind::Circle,
            Shape::Line { .. } => ShapeKind::Line,
            Shape::Text { .. } => ShapeKind::Text,
            Shape::Use { .. } => ShapeKind::Use,
            Shape::Image { .. } => ShapeKind::Image,
        }
    }

    pub fn path(d: impl Into<String>) -> Self {
        Shape::Path { d: d.into() }
    }

    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Shape::Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Bounding box for shapes with explicit extents. Path data is opaque,
    /// so paths and text have none.
    pub fn bbox(&self) -> Option<BBox> {
        match self {
            Shape::Rect {
                x,
                y,
                width,
                height,
            }
            | Shape::Use {
                x,
                y,
                width,
                height,
                ..
            }
            | Shape::Image {
                x,
                y,
                width,
                height,
                ..
            } => Some(BBox::from_origin_size(*x, *y, *width, *height)),
            Shape::Circle { cx, cy, r } => {
                Some(BBox::from_origin_size(cx - r, cy - r, 2.0 * r, 2.0 * r))
            }
            Shape::Line { x1, y1, x2, y2 } => Some(BBox::new(
                Point::new(x1.min(*x2), y1.min(*y2)),
                Point::new(x1.max(*x2), y1.max(*y2)),
            )),
            Shape::Polygon { points } if !points.is_empty() => {
                let mut bb = BBox::new(points[0], points[0]);
                for p in &points[1..] {
                    bb.min = Point::new(bb.min.x.min(p.x), bb.min.y.min(p.y));
                    bb.max = Point::new(bb.max.x.max(p.x), bb.max.y.max(p.y));
                }
                Some(bb)
            }
            _ => None,
        }
    }
}

/// A vector primitive owned by exactly one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    /// Document-level identifier, e.g. `oceanBase` or a coastline feature id.
    pub doc_id: Option<String>,
    pub shape: Shape,
    pub style: Style,
    pub visible: bool,
    /// Height value carried by heightmap contours.
    pub height: Option<u8>,
    pub metric: Option<AdaptiveMetric>,
}

impl Element {
    pub fn new(shape: Shape) -> Self {
        Self {
            id: Uuid::new_v4(),
            doc_id: None,
            shape,
            style: Style::default(),
            visible: true,
            height: None,
            metric: None,
        }
    }

    pub fn with_doc_id(mut self, doc_id: impl Into<String>) -> Self {
        self.doc_id = Some(doc_id.into());
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_height(mut self, height: u8) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_metric(mut self, metric: AdaptiveMetric) -> Self {
        self.metric = Some(metric);
        self
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    pub fn set_fill(&mut self, fill: Option<Paint>) {
        self.style.fill = fill;
    }

    pub fn set_opacity(&mut self, opacity: Option<f32>) {
        self.style.opacity = opacity;
    }

    pub fn set_stroke_width(&mut self, width: Option<f32>) {
        self.style.stroke_width = width;
    }

    pub fn set_font_size(&mut self, size: Option<f32>) {
        self.style.font_size = size;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Set the radius of a circle. Other shapes are left untouched.
    pub fn set_radius(&mut self, radius: f64) {
        if let Shape::Circle { r, .. } = &mut self.shape {
            *r = radius;
        }
    }

    /// Set position and size of a framed shape (rect, use, image) in one write.
    /// Returns `false` for shapes without a frame.
    pub fn set_frame(&mut self, new_x: f64, new_y: f64, new_width: f64, new_height: f64) -> bool {
        match &mut self.shape {
            Shape::Rect {
                x,
                y,
                width,
                height,
            }
            | Shape::Use {
                x,
                y,
                width,
                height,
                ..
            }
            | Shape::Image {
                x,
                y,
                width,
                height,
                ..
            } => {
                *x = new_x;
                *y = new_y;
                *width = new_width;
                *height = new_height;
                true
            }
            _ => false,
        }
    }

    /// Move a framed shape without resizing it.
    pub fn set_origin(&mut self, new_x: f64, new_y: f64) -> bool {
        match &mut self.shape {
            Shape::Rect { x, y, .. } | Shape::Use { x, y, .. } | Shape::Image { x, y, .. } => {
                *x = new_x;
                *y = new_y;
                true
            }
            _ => false,
        }
    }
}
