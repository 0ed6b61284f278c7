use std::fmt;

use serde::{Deserialize, Serialize};

use crate::element::{AdaptiveMetric, Element};
use crate::geometry::Transform;

/// Index of a layer inside its [`Scene`](crate::Scene).
///
/// Keys are handed out by the scene and stay valid for its whole lifetime;
/// layers are never removed, only emptied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerKey(pub(crate) usize);

impl LayerKey {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named container in the scene hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub key: LayerKey,
    pub name: String,
    pub parent: Option<LayerKey>,
    pub(crate) children: Vec<LayerKey>,
    pub(crate) elements: Vec<Element>,
    pub style: Style,
    /// `display`: a hidden layer hides its whole subtree.
    pub visible: bool,
    /// Set by label culling when the on-screen font size leaves the legible band.
    pub legibility_hidden: bool,
    /// Desired metric for groups whose attributes adapt to zoom (label and icon groups).
    pub metric: Option<AdaptiveMetric>,
}

impl Layer {
    pub(crate) fn new(key: LayerKey, name: &str, parent: Option<LayerKey>) -> Self {
        Self {
            key,
            name: name.to_string(),
            parent,
            children: Vec::new(),
            elements: Vec::new(),
            style: Style::default(),
            visible: true,
            legibility_hidden: false,
            metric: None,
        }
    }

    pub fn children(&self) -> &[LayerKey] {
        &self.children
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.elements.iter_mut()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn set_opacity(&mut self, opacity: Option<f32>) {
        self.style.opacity = opacity;
    }

    pub fn set_fill(&mut self, fill: Option<Paint>) {
        self.style.fill = fill;
    }

    pub fn set_stroke(&mut self, stroke: Option<Paint>) {
        self.style.stroke = stroke;
    }

    pub fn set_stroke_width(&mut self, width: Option<f32>) {
        self.style.stroke_width = width;
    }

    pub fn set_filter(&mut self, filter: Option<Filter>) {
        self.style.filter = filter;
    }

    pub fn set_font_size(&mut self, size: Option<f32>) {
        self.style.font_size = size;
    }

    pub fn set_transform(&mut self, transform: Option<Transform>) {
        self.style.transform = transform;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// RGB color, serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self {
            r: 128,
            g: 128,
            b: 128,
        }
    }
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(hex: String) -> Result<Self, Self::Error> {
        Color::from_hex(&hex).ok_or_else(|| format!("invalid color '{hex}', expected #rrggbb"))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Fill or stroke paint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Paint {
    None,
    Color(Color),
    /// Reference to a pattern definition by id.
    Pattern(String),
}

impl Paint {
    pub fn pattern(id: &str) -> Self {
        Paint::Pattern(id.to_string())
    }
}

impl From<Color> for Paint {
    fn from(color: Color) -> Self {
        Paint::Color(color)
    }
}

impl fmt::Display for Paint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Paint::None => f.write_str("none"),
            Paint::Color(c) => c.fmt(f),
            Paint::Pattern(id) => write!(f, "url(#{id})"),
        }
    }
}

/// Filter definitions the scene refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    DropShadow,
    DropShadow01,
    Blur,
    /// Any other filter definition, e.g. an ocean texture pattern filter.
    Named(String),
}

impl Filter {
    pub fn id(&self) -> &str {
        match self {
            Filter::DropShadow => "dropShadow",
            Filter::DropShadow01 => "dropShadow01",
            Filter::Blur => "blurFilter",
            Filter::Named(id) => id,
        }
    }
}

/// Mask definitions the scene refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mask {
    Fog,
    Land,
    Water,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeRendering {
    Auto,
    OptimizeSpeed,
    CrispEdges,
    GeometricPrecision,
}

/// Stroke dash lengths. An empty pattern is an explicit solid stroke.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashPattern(pub Vec<f32>);

impl DashPattern {
    pub fn new(lengths: &[f32]) -> Self {
        Self(lengths.to_vec())
    }

    pub fn solid() -> Self {
        Self(Vec::new())
    }

    pub fn is_solid(&self) -> bool {
        self.0.is_empty()
    }
}

/// Presentation attributes of a layer or element. `None` means unset, so
/// the value is inherited from the parent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Style {
    pub opacity: Option<f32>,
    pub fill: Option<Paint>,
    pub fill_opacity: Option<f32>,
    pub stroke: Option<Paint>,
    pub stroke_width: Option<f32>,
    pub stroke_dasharray: Option<DashPattern>,
    pub stroke_linecap: Option<LineCap>,
    pub filter: Option<Filter>,
    pub mask: Option<Mask>,
    pub fill_rule: Option<FillRule>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub shape_rendering: Option<ShapeRendering>,
    pub transform: Option<Transform>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_fill(mut self, fill: impl Into<Paint>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn with_fill_opacity(mut self, opacity: f32) -> Self {
        self.fill_opacity = Some(opacity);
        self
    }

    pub fn with_stroke(mut self, stroke: impl Into<Paint>) -> Self {
        self.stroke = Some(stroke.into());
        self
    }

    pub fn with_stroke_width(mut self, width: f32) -> Self {
        self.stroke_width = Some(width);
        self
    }

    pub fn with_dash(mut self, lengths: &[f32]) -> Self {
        self.stroke_dasharray = Some(DashPattern::new(lengths));
        self
    }

    pub fn with_linecap(mut self, cap: LineCap) -> Self {
        self.stroke_linecap = Some(cap);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_mask(mut self, mask: Mask) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_fill_rule(mut self, rule: FillRule) -> Self {
        self.fill_rule = Some(rule);
        self
    }

    pub fn with_font(mut self, family: &str, size: f32) -> Self {
        self.font_family = Some(family.to_string());
        self.font_size = Some(size);
        self
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn with_shape_rendering(mut self, rendering: ShapeRendering) -> Self {
        self.shape_rendering = Some(rendering);
        self
    }

    /// Overwrite every attribute that is set in `other`.
    pub fn merge(&mut self, other: &Style) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        take!(
            opacity,
            fill,
            fill_opacity,
            stroke,
            stroke_width,
            stroke_dasharray,
            stroke_linecap,
            filter,
            mask,
            fill_rule,
            font_family,
            font_size,
            shape_rendering,
            transform
        );
    }
}
