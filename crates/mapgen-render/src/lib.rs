//! # Mapgen Render
//!
//! View side of the map canvas: the zoom/pan transform, the zoom-adaptive
//! rescaler that keeps labels, markers and strokes legible, the `MapView`
//! coordinator, and JSON-serializable frames for a canvas frontend.

pub mod render_data;
pub mod rescale;
pub mod view;
pub mod viewport;

pub use render_data::{RenderFrame, RenderLayer};
pub use rescale::{RescaleCategory, RescaleConfig, RescaleReport, Rescaler, SkipReason};
pub use view::{MapView, NoRedraw, RedrawHandler, ViewUpdate};
pub use viewport::{Gesture, GestureOutcome, TransformController, ViewState};
