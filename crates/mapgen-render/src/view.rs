use mapgen_core::ingest::{self, CoastlineBatch, HeightmapBatch};
use mapgen_core::{
    build_scene, init_backdrop, AdaptiveMetric, Element, ElementId, MetricCategory, Point,
    RedrawCategory, Scene, SceneError, SceneLayers, Shape, StyleBaseline, StyleCommand,
    StyleHistory, StyleSettings,
};
use serde::{Deserialize, Serialize};

use crate::render_data::RenderFrame;
use crate::rescale::{RescaleReport, Rescaler};
use crate::viewport::{Gesture, GestureOutcome, TransformController, ViewState};

/// Redraws a style reset asks the host to perform. Drawing heightmaps and
/// legends belongs to the generator side, so the view only signals them.
pub trait RedrawHandler {
    fn redraw_heightmap(&mut self, scene: &mut Scene, layers: &SceneLayers);
    fn redraw_legend(&mut self, scene: &mut Scene, layers: &SceneLayers);
}

/// Handler for hosts with nothing to redraw.
#[derive(Debug, Default)]
pub struct NoRedraw;

impl RedrawHandler for NoRedraw {
    fn redraw_heightmap(&mut self, _scene: &mut Scene, _layers: &SceneLayers) {}
    fn redraw_legend(&mut self, _scene: &mut Scene, _layers: &SceneLayers) {}
}

/// Result of a zoom or pan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewUpdate {
    pub outcome: GestureOutcome,
    /// Present only when the scale changed.
    pub rescale: Option<RescaleReport>,
}

/// The map canvas: scene, view transform, style state and their coupling.
#[derive(Debug)]
pub struct MapView {
    scene: Scene,
    layers: SceneLayers,
    view: ViewState,
    controller: TransformController,
    rescaler: Rescaler,
    settings: StyleSettings,
    baseline: StyleBaseline,
    history: StyleHistory,
}

impl MapView {
    /// Build the layer tree, lay down the backdrop, apply default styles and
    /// run the first rescale at scale 1.
    pub fn new(settings: StyleSettings, width: f64, height: f64) -> Self {
        let (mut scene, layers) = build_scene();
        init_backdrop(&mut scene, &layers, width, height);
        let mut settings = settings;
        let baseline = StyleBaseline::new(&layers, &settings);
        baseline.apply(&mut scene, &mut settings);

        let mut map = Self {
            scene,
            layers,
            view: ViewState::new(width, height),
            controller: TransformController::default(),
            rescaler: Rescaler::default(),
            settings,
            baseline,
            history: StyleHistory::new(),
        };
        map.rescale();
        log::info!("Map view ready ({width}x{height})");
        map
    }

    pub fn with_controller(mut self, controller: TransformController) -> Self {
        self.controller = controller;
        self
    }

    pub fn with_rescaler(mut self, rescaler: Rescaler) -> Self {
        self.rescaler = rescaler;
        self.rescale();
        self
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn layers(&self) -> &SceneLayers {
        &self.layers
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn settings(&self) -> &StyleSettings {
        &self.settings
    }

    /// UI-owned parameters. Toggles changed here take effect on the next
    /// rescale; use the `set_*` helpers to rescale immediately.
    pub fn settings_mut(&mut self) -> &mut StyleSettings {
        &mut self.settings
    }

    pub fn history(&self) -> &StyleHistory {
        &self.history
    }

    // ── View transform ───────────────────────────────────────────────

    pub fn handle_gesture(&mut self, gesture: Gesture) -> ViewUpdate {
        let outcome =
            self.controller
                .on_gesture(&mut self.view, &mut self.scene, self.layers.viewbox, gesture);
        self.after_gesture(outcome)
    }

    pub fn zoom_at(&mut self, factor: f64, screen: Point) -> ViewUpdate {
        let outcome = self.controller.zoom_at(
            &mut self.view,
            &mut self.scene,
            self.layers.viewbox,
            factor,
            screen,
        );
        self.after_gesture(outcome)
    }

    pub fn pan(&mut self, dx: f64, dy: f64) -> ViewUpdate {
        let outcome = self
            .controller
            .pan(&mut self.view, &mut self.scene, self.layers.viewbox, dx, dy);
        self.after_gesture(outcome)
    }

    pub fn reset_view(&mut self) -> ViewUpdate {
        let outcome = self
            .controller
            .reset(&mut self.view, &mut self.scene, self.layers.viewbox);
        self.after_gesture(outcome)
    }

    fn after_gesture(&mut self, outcome: GestureOutcome) -> ViewUpdate {
        let rescale = outcome.scale_changed.then(|| self.rescale());
        ViewUpdate { outcome, rescale }
    }

    pub fn rescale(&mut self) -> RescaleReport {
        self.rescaler
            .rescale(&mut self.scene, &self.layers, &self.view, &self.settings)
    }

    // ── Style ────────────────────────────────────────────────────────

    /// Restore every default style, ask the host for the redraws the reset
    /// requires, then re-derive zoom-dependent values for the current scale.
    pub fn reset_style(&mut self, redraw: &mut dyn RedrawHandler) -> RescaleReport {
        self.history.clear();
        let changes = self.baseline.apply(&mut self.scene, &mut self.settings);
        for category in changes.iter() {
            match category {
                RedrawCategory::Heightmap => redraw.redraw_heightmap(&mut self.scene, &self.layers),
                RedrawCategory::Legend => redraw.redraw_legend(&mut self.scene, &self.layers),
            }
        }
        log::info!("Style reset to defaults");
        self.rescale()
    }

    /// Run a style command, then rescale: a layer shown again may still
    /// carry sizes from the scale it was hidden at.
    pub fn apply_style_command(&mut self, command: Box<dyn StyleCommand>) -> RescaleReport {
        self.history.execute(command, &mut self.scene);
        self.rescale()
    }

    pub fn undo_style(&mut self) -> bool {
        let undone = self.history.undo(&mut self.scene);
        if undone {
            self.rescale();
        }
        undone
    }

    pub fn redo_style(&mut self) -> bool {
        let redone = self.history.redo(&mut self.scene);
        if redone {
            self.rescale();
        }
        redone
    }

    pub fn set_hide_labels(&mut self, on: bool) -> RescaleReport {
        self.settings.hide_labels = on;
        self.rescale()
    }

    pub fn set_auto_coastline(&mut self, on: bool) -> RescaleReport {
        self.settings.auto_coastline = on;
        self.rescale()
    }

    pub fn set_rescale_markers(&mut self, on: bool) -> RescaleReport {
        self.settings.rescale_markers = on;
        self.rescale()
    }

    pub fn set_states_halo_width(&mut self, width: f32) -> RescaleReport {
        self.settings.states_halo_width = width;
        self.baseline = StyleBaseline::new(&self.layers, &self.settings);
        self.rescale()
    }

    /// Label sizes of the baseline depend on the region count. The new label
    /// metrics take effect at once; other styles wait for a style reset.
    pub fn set_regions(&mut self, regions: u32) -> RescaleReport {
        self.settings.regions = regions;
        self.baseline = StyleBaseline::new(&self.layers, &self.settings);
        self.baseline.apply_label_metrics(&mut self.scene);
        self.rescale()
    }

    // ── Content ──────────────────────────────────────────────────────

    /// Place a map marker pinned at `anchor`, sized for the current scale.
    pub fn add_marker(&mut self, symbol: &str, anchor: Point, size: f32) -> Result<ElementId, SceneError> {
        let px = self.rescaler.marker_size(size as f64, self.view.scale);
        let marker = Element::new(Shape::Use {
            href: format!("#{symbol}"),
            x: anchor.x - px / 2.0,
            y: anchor.y - px,
            width: px,
            height: px,
        })
        .with_metric(AdaptiveMetric::anchored(MetricCategory::Marker, size, anchor));
        self.scene.append(self.layers.markers, marker)
    }

    pub fn draw_cells(&mut self, path: &str) -> Result<ElementId, SceneError> {
        ingest::draw_cells(&mut self.scene, &self.layers, path)
    }

    pub fn clear_cells(&mut self) -> usize {
        ingest::clear_cells(&mut self.scene, &self.layers)
    }

    pub fn draw_heightmap(&mut self, batch: &HeightmapBatch) -> Result<usize, SceneError> {
        ingest::draw_heightmap(&mut self.scene, &self.layers, batch)
    }

    pub fn clear_heightmap(&mut self) -> usize {
        ingest::clear_heightmap(&mut self.scene, &self.layers)
    }

    pub fn draw_coastline(&mut self, batch: &CoastlineBatch) -> Result<(), SceneError> {
        ingest::draw_coastline(&mut self.scene, &self.layers, batch)
    }

    pub fn undraw_all(&mut self) -> usize {
        ingest::undraw_all(&mut self.scene, &self.layers)
    }

    pub fn unfog(&mut self) -> usize {
        ingest::unfog(&mut self.scene, &self.layers)
    }

    pub fn frame(&self) -> RenderFrame {
        RenderFrame::capture(&self.scene, &self.view, self.layers.viewbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapgen_core::commands::{SetLayerOpacity, SetLayerVisibility};
    use mapgen_core::Color;

    use crate::rescale::RescaleCategory;

    #[derive(Default)]
    struct Recorder {
        heightmap: usize,
        legend: usize,
    }

    impl RedrawHandler for Recorder {
        fn redraw_heightmap(&mut self, _scene: &mut Scene, _layers: &SceneLayers) {
            self.heightmap += 1;
        }
        fn redraw_legend(&mut self, _scene: &mut Scene, _layers: &SceneLayers) {
            self.legend += 1;
        }
    }

    fn gesture(scale: f64, x: f64, y: f64) -> Gesture {
        Gesture {
            scale,
            translate_x: x,
            translate_y: y,
        }
    }

    #[test]
    fn test_translation_only_skips_rescale() {
        let mut map = MapView::new(StyleSettings::default(), 960.0, 540.0);
        let update = map.handle_gesture(gesture(1.0, 30.0, -20.0));
        assert!(update.outcome.translated);
        assert!(update.rescale.is_none());
    }

    #[test]
    fn test_scale_change_runs_rescale() {
        let mut map = MapView::new(StyleSettings::default(), 960.0, 540.0);
        let update = map.handle_gesture(gesture(4.0, 0.0, 0.0));
        let report = update.rescale.unwrap();
        assert!((report.scale - 4.0).abs() < 1e-12);
        assert!(report.was_applied(RescaleCategory::Halo));
        // W = 10 at scale 4 rounds to 2.5, below the visibility threshold.
        assert!(!map.scene().is_displayed(map.layers().states_halo));
    }

    #[test]
    fn test_labels_follow_zoom_after_baseline() {
        let mut map = MapView::new(StyleSettings::default(), 960.0, 540.0);
        let towns = map.layers().burg_labels_towns;
        let size = |m: &MapView| m.scene().layer(towns).unwrap().style.font_size.unwrap();
        // desired 4: scale 1 keeps 4, scale 4 gives round(2.5) = 3
        assert!((size(&map) - 4.0).abs() < 1e-6);
        map.zoom_at(4.0, Point::new(0.0, 0.0));
        assert!((size(&map) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_reset_style_restores_and_clears_history() {
        let mut map = MapView::new(StyleSettings::default(), 960.0, 540.0);
        let coastline = map.layers().coastline;
        let original = map.scene().layer(coastline).unwrap().style.opacity;
        map.apply_style_command(Box::new(SetLayerOpacity::new(coastline, Some(0.1))));
        assert!(map.history().can_undo());
        assert!(map.undo_style());
        assert_eq!(map.scene().layer(coastline).unwrap().style.opacity, original);
        assert!(map.redo_style());

        let mut recorder = Recorder::default();
        map.reset_style(&mut recorder);
        assert!(!map.history().can_undo());
        assert_eq!(map.scene().layer(coastline).unwrap().style.opacity, original);
        assert_eq!(recorder.heightmap, 0);
        assert_eq!(recorder.legend, 0);
    }

    #[test]
    fn test_shown_labels_take_current_scale() {
        let mut map = MapView::new(StyleSettings::default(), 960.0, 540.0);
        let states = map.layers().state_labels;
        let labels = map.layers().labels;
        let size = |m: &MapView| m.scene().layer(states).unwrap().style.font_size.unwrap();
        map.apply_style_command(Box::new(SetLayerVisibility::new(labels, false)));
        map.handle_gesture(gesture(4.0, 0.0, 0.0));
        assert!((size(&map) - 22.0).abs() < 1e-6);

        // desired 22 at scale 4: round((22 + 5.5) / 2) = 14
        map.apply_style_command(Box::new(SetLayerVisibility::new(labels, true)));
        assert!((size(&map) - 14.0).abs() < 1e-6);

        map.undo_style();
        map.zoom_at(0.5, Point::new(0.0, 0.0));
        assert!(map.redo_style());
        // scale 2: round((22 + 11) / 2) = 17
        assert!((size(&map) - 17.0).abs() < 1e-6);
    }

    #[test]
    fn test_set_regions_resizes_state_labels() {
        let mut map = MapView::new(StyleSettings::default(), 960.0, 540.0);
        let states = map.layers().state_labels;
        let coastline = map.layers().coastline;
        map.apply_style_command(Box::new(SetLayerOpacity::new(coastline, Some(0.2))));
        let report = map.set_regions(60);
        assert!(report.was_applied(RescaleCategory::Labels));
        let layer = map.scene().layer(states).unwrap();
        assert_eq!(layer.style.font_size, Some(14.0));
        assert_eq!(map.scene().layer(coastline).unwrap().style.opacity, Some(0.2));
    }

    #[test]
    fn test_reset_style_requests_heightmap_redraw_when_changed() {
        let mut map = MapView::new(StyleSettings::default(), 960.0, 540.0);
        map.settings_mut().heightmap.skip = 2;
        let mut recorder = Recorder::default();
        map.reset_style(&mut recorder);
        assert_eq!(recorder.heightmap, 1);
        assert_eq!(map.settings().heightmap.skip, 5);

        map.reset_style(&mut recorder);
        assert_eq!(recorder.heightmap, 1);
    }

    #[test]
    fn test_add_marker_sized_for_scale() {
        let mut map = MapView::new(StyleSettings::default(), 960.0, 540.0);
        map.handle_gesture(gesture(5.0, 0.0, 0.0));
        let id = map.add_marker("marker_volcano", Point::new(100.0, 100.0), 2.0).unwrap();
        let (_, marker) = map.scene().element(id).unwrap();
        let bbox = marker.shape.bbox().unwrap();
        assert!((bbox.width() - 15.0).abs() < 1e-9);
        assert!((bbox.min.x - 92.5).abs() < 1e-9);
    }

    #[test]
    fn test_frame_includes_ingested_heightmap() {
        let mut map = MapView::new(StyleSettings::default(), 960.0, 540.0);
        map.draw_heightmap(&HeightmapBatch {
            paths: vec!["M0,0L5,5Z".to_string()],
            colors: vec![Color::rgb(200, 180, 90)],
            values: vec![35],
        })
        .unwrap();
        let frame = map.frame();
        assert_eq!(frame.layer("viewbox/terrs").unwrap().elements.len(), 1);
        map.undraw_all();
        assert_eq!(map.frame().layer("viewbox/terrs").unwrap().elements.len(), 0);
    }
}
