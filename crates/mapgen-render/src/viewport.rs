use mapgen_core::{BBox, LayerKey, Point, Scene, Transform};
use serde::{Deserialize, Serialize};

/// Current zoom and pan of the map canvas.
///
/// A model point `p` is drawn at `p * scale + translation` in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub scale: f64,
    pub translation: Point,
    /// Canvas width in pixels.
    pub canvas_width: f64,
    /// Canvas height in pixels.
    pub canvas_height: f64,
}

impl ViewState {
    pub fn new(canvas_width: f64, canvas_height: f64) -> Self {
        Self {
            scale: 1.0,
            translation: Point::new(0.0, 0.0),
            canvas_width,
            canvas_height,
        }
    }

    /// The transform placed on the `viewbox` layer.
    pub fn transform(&self) -> Transform {
        Transform::new(self.translation, self.scale)
    }

    /// Convert a screen position to map coordinates.
    pub fn screen_to_model(&self, screen: Point) -> Point {
        self.transform().invert(&screen)
    }

    /// Convert map coordinates to a screen position.
    pub fn model_to_screen(&self, model: Point) -> Point {
        self.transform().apply(&model)
    }

    /// The part of the map currently on the canvas.
    pub fn visible_bounds(&self) -> BBox {
        BBox::new(
            self.screen_to_model(Point::new(0.0, 0.0)),
            self.screen_to_model(Point::new(self.canvas_width, self.canvas_height)),
        )
    }
}

/// Zoom/pan proposal from the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gesture {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

/// What a gesture actually changed after clamping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureOutcome {
    pub scale_changed: bool,
    pub translated: bool,
}

/// Applies gestures to the view, keeping the scale inside its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformController {
    pub min_scale: f64,
    pub max_scale: f64,
}

impl Default for TransformController {
    fn default() -> Self {
        Self {
            min_scale: 1.0,
            max_scale: 20.0,
        }
    }
}

impl TransformController {
    /// Bounds are stored normalized, see [`TransformController::bounds`].
    pub fn new(min_scale: f64, max_scale: f64) -> Self {
        let (min_scale, max_scale) = Self {
            min_scale,
            max_scale,
        }
        .bounds();
        Self {
            min_scale,
            max_scale,
        }
    }

    /// The usable `(min, max)` bounds. A non-finite bound falls back to its
    /// default and reversed bounds are swapped.
    pub fn bounds(&self) -> (f64, f64) {
        let defaults = Self::default();
        let pick = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };
        let lo = pick(self.min_scale, defaults.min_scale);
        let hi = pick(self.max_scale, defaults.max_scale);
        (lo.min(hi), lo.max(hi))
    }

    /// Clamp a proposed scale. A non-finite proposal keeps `current`.
    pub fn clamp(&self, proposed: f64, current: f64) -> f64 {
        if proposed.is_finite() {
            let (min, max) = self.bounds();
            proposed.clamp(min, max)
        } else {
            current
        }
    }

    /// Store the clamped gesture in `view` and move the `viewbox` layer.
    pub fn on_gesture(
        &self,
        view: &mut ViewState,
        scene: &mut Scene,
        viewbox: LayerKey,
        gesture: Gesture,
    ) -> GestureOutcome {
        let scale = self.clamp(gesture.scale, view.scale);
        let translation = if gesture.translate_x.is_finite() && gesture.translate_y.is_finite() {
            Point::new(gesture.translate_x, gesture.translate_y)
        } else {
            view.translation
        };

        let outcome = GestureOutcome {
            scale_changed: scale != view.scale,
            translated: translation != view.translation,
        };
        view.scale = scale;
        view.translation = translation;

        let transform = view.transform();
        scene.update_layer(viewbox, |l| l.set_transform(Some(transform)));
        log::trace!("View transform {transform}");
        outcome
    }

    /// Zoom by `factor` keeping the map point under `screen` fixed.
    pub fn zoom_at(
        &self,
        view: &mut ViewState,
        scene: &mut Scene,
        viewbox: LayerKey,
        factor: f64,
        screen: Point,
    ) -> GestureOutcome {
        let new_scale = self.clamp(view.scale * factor, view.scale);
        let ratio = new_scale / view.scale;
        let gesture = Gesture {
            scale: new_scale,
            translate_x: screen.x - (screen.x - view.translation.x) * ratio,
            translate_y: screen.y - (screen.y - view.translation.y) * ratio,
        };
        self.on_gesture(view, scene, viewbox, gesture)
    }

    /// Pan by a delta in screen pixels.
    pub fn pan(
        &self,
        view: &mut ViewState,
        scene: &mut Scene,
        viewbox: LayerKey,
        dx: f64,
        dy: f64,
    ) -> GestureOutcome {
        let gesture = Gesture {
            scale: view.scale,
            translate_x: view.translation.x + dx,
            translate_y: view.translation.y + dy,
        };
        self.on_gesture(view, scene, viewbox, gesture)
    }

    /// Back to scale 1 with no translation.
    pub fn reset(&self, view: &mut ViewState, scene: &mut Scene, viewbox: LayerKey) -> GestureOutcome {
        let gesture = Gesture {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        };
        self.on_gesture(view, scene, viewbox, gesture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapgen_core::build_scene;

    #[test]
    fn test_clamp_is_idempotent() {
        let c = TransformController::default();
        for s in [-3.0, 0.0, 0.5, 1.0, 7.3, 20.0, 55.0, f64::NAN, f64::INFINITY] {
            let once = c.clamp(s, 2.0);
            assert!((c.clamp(once, 2.0) - once).abs() < 1e-12);
            assert!((1.0..=20.0).contains(&once));
        }
        assert!((c.clamp(f64::NAN, 4.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_bad_bounds_are_normalized() {
        let reversed = TransformController::new(20.0, 1.0);
        assert_eq!(reversed, TransformController::default());
        assert!((reversed.clamp(50.0, 2.0) - 20.0).abs() < 1e-12);

        let c: TransformController =
            serde_json::from_str(r#"{ "min_scale": 8.0, "max_scale": 2.0 }"#).unwrap();
        assert_eq!(c.bounds(), (2.0, 8.0));
        assert!((c.clamp(0.5, 4.0) - 2.0).abs() < 1e-12);

        let nan = TransformController {
            min_scale: f64::NAN,
            max_scale: 40.0,
        };
        assert_eq!(nan.bounds(), (1.0, 40.0));
        assert!((nan.clamp(0.1, 4.0) - 1.0).abs() < 1e-12);
        assert_eq!(TransformController::new(f64::INFINITY, f64::NAN), TransformController::default());
    }

    #[test]
    fn test_gesture_sets_viewbox_transform() {
        let (mut scene, layers) = build_scene();
        let mut view = ViewState::new(800.0, 600.0);
        let c = TransformController::default();
        let outcome = c.on_gesture(
            &mut view,
            &mut scene,
            layers.viewbox,
            Gesture {
                scale: 40.0,
                translate_x: -10.0,
                translate_y: 5.0,
            },
        );
        assert!(outcome.scale_changed && outcome.translated);
        assert!((view.scale - 20.0).abs() < 1e-12);
        let t = scene.layer(layers.viewbox).unwrap().style.transform.unwrap();
        assert!((t.scale - 20.0).abs() < 1e-12);
        assert!((t.offset.x + 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_translation_only_gesture() {
        let (mut scene, layers) = build_scene();
        let mut view = ViewState::new(800.0, 600.0);
        let outcome = TransformController::default().pan(&mut view, &mut scene, layers.viewbox, 12.0, -4.0);
        assert!(!outcome.scale_changed);
        assert!(outcome.translated);
    }

    #[test]
    fn test_zoom_at_keeps_cursor_point() {
        let (mut scene, layers) = build_scene();
        let mut view = ViewState::new(800.0, 600.0);
        let c = TransformController::default();
        let cursor = Point::new(300.0, 200.0);
        let before = view.screen_to_model(cursor);
        c.zoom_at(&mut view, &mut scene, layers.viewbox, 4.0, cursor);
        let after = view.screen_to_model(cursor);
        assert!((view.scale - 4.0).abs() < 1e-12);
        assert!(before.distance_to(&after) < 1e-9);
    }

    #[test]
    fn test_visible_bounds_shrink_with_zoom() {
        let mut view = ViewState::new(800.0, 600.0);
        assert!((view.visible_bounds().width() - 800.0).abs() < 1e-9);
        view.scale = 2.0;
        view.translation = Point::new(-100.0, -50.0);
        let b = view.visible_bounds();
        assert!((b.width() - 400.0).abs() < 1e-9);
        assert!((b.min.x - 50.0).abs() < 1e-9);
        assert!((b.min.y - 25.0).abs() < 1e-9);
    }
}
