//! # Mapgen Core
//!
//! Layered scene graph for the fantasy-map viewer: the fixed layer hierarchy,
//! typed drawable elements with zoom-adaptive metadata, the default style
//! baseline, and the reversible style-override journal.
//!
//! Geometry is always stored in unscaled map coordinates. Zoom and pan are a
//! single transform on the `viewbox` layer, owned by `mapgen-render`.

pub mod baseline;
pub mod builder;
pub mod commands;
pub mod element;
pub mod error;
pub mod geometry;
pub mod ingest;
pub mod layer;
pub mod scene;
pub mod settings;

pub use baseline::{BaselineChanges, RedrawCategory, StyleBaseline};
pub use builder::{build_scene, init_backdrop, SceneLayers};
pub use commands::{StyleCommand, StyleHistory};
pub use element::{AdaptiveMetric, Element, ElementId, MetricCategory, Shape, ShapeKind};
pub use error::SceneError;
pub use geometry::{BBox, Point, Transform};
pub use ingest::{CoastlineBatch, HeightmapBatch};
pub use layer::{Color, Filter, Layer, LayerKey, Mask, Paint, Style};
pub use scene::Scene;
pub use settings::StyleSettings;
