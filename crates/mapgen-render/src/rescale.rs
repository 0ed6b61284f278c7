use mapgen_core::geometry::round_to;
use mapgen_core::{
    Color, Filter, MetricCategory, Paint, Scene, SceneLayers, ShapeKind, StyleSettings,
};
use serde::{Deserialize, Serialize};

use crate::viewport::ViewState;

/// Zoom thresholds and factors of the adaptive rescaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RescaleConfig {
    /// Coastline keeps its drop shadow up to this scale.
    pub coastline_shadow_max: f64,
    /// Above this scale the coastline is blurred.
    pub coastline_blur_min: f64,
    /// Legible on-screen font size band.
    pub label_min_screen: f64,
    pub label_max_screen: f64,
    pub label_min_size: f64,
    /// Fractional digits kept on rescaled label sizes.
    pub label_decimals: i32,
    /// Above this scale the ocean texture is replaced by a flat fill.
    pub ocean_flat_min: f64,
    pub ocean_flat_fill: Color,
    pub ocean_flat_opacity: f32,
    /// The region halo is hidden at or below this stroke width.
    pub halo_min_width: f64,
    pub marker_factor: f64,
    pub marker_base: f64,
    pub marker_min_size: f64,
    pub ruler_base: f64,
    pub ruler_exponent: f64,
}

impl Default for RescaleConfig {
    fn default() -> Self {
        Self {
            coastline_shadow_max: 1.5,
            coastline_blur_min: 2.6,
            label_min_screen: 6.0,
            label_max_screen: 50.0,
            label_min_size: 1.0,
            label_decimals: 0,
            ocean_flat_min: 10.0,
            ocean_flat_fill: Color::WHITE,
            ocean_flat_opacity: 0.2,
            halo_min_width: 3.0,
            marker_factor: 5.0,
            marker_base: 25.0,
            marker_min_size: 1.0,
            ruler_base: 2.0,
            ruler_exponent: -0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RescaleCategory {
    Coastline,
    Labels,
    OceanPattern,
    Halo,
    Markers,
    Ruler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The category's layer is not displayed.
    LayerHidden,
    /// The user toggle for the category is off.
    Disabled,
}

/// What one rescale pass touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescaleReport {
    pub scale: f64,
    pub applied: Vec<RescaleCategory>,
    pub skipped: Vec<(RescaleCategory, SkipReason)>,
}

impl RescaleReport {
    pub fn was_applied(&self, category: RescaleCategory) -> bool {
        self.applied.contains(&category)
    }

    pub fn skip_reason(&self, category: RescaleCategory) -> Option<SkipReason> {
        self.skipped
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, r)| *r)
    }
}

/// Recomputes zoom-dependent attributes so labels, markers and strokes keep
/// a roughly constant on-screen size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rescaler {
    pub config: RescaleConfig,
}

impl Rescaler {
    pub fn new(config: RescaleConfig) -> Self {
        Self { config }
    }

    /// Rendered label font size for a desired size at `scale`.
    pub fn label_size(&self, desired: f64, scale: f64) -> f64 {
        round_to((desired + desired / scale) / 2.0, self.config.label_decimals)
            .max(self.config.label_min_size)
    }

    pub fn halo_width(&self, base: f64, scale: f64) -> f64 {
        round_to(base / scale, 1)
    }

    pub fn marker_size(&self, desired: f64, scale: f64) -> f64 {
        (desired * self.config.marker_factor + self.config.marker_base / scale)
            .max(self.config.marker_min_size)
    }

    pub fn ruler_factor(&self, scale: f64) -> f64 {
        round_to(self.config.ruler_base * scale.powf(self.config.ruler_exponent), 1)
    }

    /// Coastline filter for a scale; `None` between the two thresholds.
    pub fn coastline_filter(&self, scale: f64) -> Option<Filter> {
        if scale <= self.config.coastline_shadow_max {
            Some(Filter::DropShadow)
        } else if scale <= self.config.coastline_blur_min {
            None
        } else {
            Some(Filter::Blur)
        }
    }

    pub fn rescale(
        &self,
        scene: &mut Scene,
        layers: &SceneLayers,
        view: &ViewState,
        settings: &StyleSettings,
    ) -> RescaleReport {
        let scale = view.scale;
        let mut report = RescaleReport {
            scale,
            applied: Vec::new(),
            skipped: Vec::new(),
        };
        let mut record = |category: RescaleCategory, outcome: Result<(), SkipReason>| match outcome {
            Ok(()) => report.applied.push(category),
            Err(reason) => {
                log::trace!("Rescale {category:?} skipped: {reason:?}");
                report.skipped.push((category, reason));
            }
        };

        record(
            RescaleCategory::Coastline,
            self.rescale_coastline(scene, layers, scale, settings),
        );
        record(
            RescaleCategory::Labels,
            self.rescale_labels(scene, layers, scale, settings),
        );
        record(
            RescaleCategory::OceanPattern,
            self.rescale_ocean_pattern(scene, layers, scale),
        );
        record(
            RescaleCategory::Halo,
            self.rescale_halo(scene, layers, scale, settings),
        );
        record(
            RescaleCategory::Markers,
            self.rescale_markers(scene, layers, scale, settings),
        );
        record(RescaleCategory::Ruler, self.rescale_ruler(scene, layers, scale));

        log::debug!("Rescaled at scale {scale}: {:?}", report.applied);
        report
    }

    fn rescale_coastline(
        &self,
        scene: &mut Scene,
        layers: &SceneLayers,
        scale: f64,
        settings: &StyleSettings,
    ) -> Result<(), SkipReason> {
        if !settings.auto_coastline {
            return Err(SkipReason::Disabled);
        }
        let filter = self.coastline_filter(scale);
        scene.update_layer(layers.coastline, |l| l.set_filter(filter));
        Ok(())
    }

    fn rescale_labels(
        &self,
        scene: &mut Scene,
        layers: &SceneLayers,
        scale: f64,
        settings: &StyleSettings,
    ) -> Result<(), SkipReason> {
        if !scene.is_displayed(layers.labels) {
            return Err(SkipReason::LayerHidden);
        }
        let groups = scene.descendants(layers.labels);
        for key in groups
            .into_iter()
            .filter(|k| *k != layers.labels && *k != layers.burg_labels)
        {
            scene.update_layer(key, |group| {
                let Some(desired) = group
                    .metric
                    .filter(|m| m.category == MetricCategory::Label)
                    .and_then(|m| m.desired())
                else {
                    log::trace!("Label group '{}' has no desired size", group.name);
                    return;
                };
                let size = self.label_size(desired as f64, scale);
                let on_screen = size * scale;
                group.set_font_size(Some(size as f32));
                group.legibility_hidden = settings.hide_labels
                    && (on_screen < self.config.label_min_screen
                        || on_screen > self.config.label_max_screen);
            });
        }
        Ok(())
    }

    fn rescale_ocean_pattern(
        &self,
        scene: &mut Scene,
        layers: &SceneLayers,
        scale: f64,
    ) -> Result<(), SkipReason> {
        let flat = scale > self.config.ocean_flat_min;
        let (fill, opacity) = if flat {
            (
                Paint::Color(self.config.ocean_flat_fill),
                Some(self.config.ocean_flat_opacity),
            )
        } else {
            (Paint::pattern("oceanic"), None)
        };
        scene.update_layer(layers.ocean_pattern, |l| {
            for rect in l.elements_mut().filter(|e| e.kind() == ShapeKind::Rect) {
                rect.set_fill(Some(fill.clone()));
                rect.set_opacity(opacity);
            }
        });
        Ok(())
    }

    fn rescale_halo(
        &self,
        scene: &mut Scene,
        layers: &SceneLayers,
        scale: f64,
        settings: &StyleSettings,
    ) -> Result<(), SkipReason> {
        let width = self.halo_width(settings.states_halo_width as f64, scale);
        if !width.is_finite() {
            log::trace!("Halo width is not a number");
            return Ok(());
        }
        let visible = width > self.config.halo_min_width;
        scene.update_layer(layers.states_halo, |l| {
            l.set_stroke_width(Some(width as f32));
            l.set_visible(visible);
        });
        Ok(())
    }

    fn rescale_markers(
        &self,
        scene: &mut Scene,
        layers: &SceneLayers,
        scale: f64,
        settings: &StyleSettings,
    ) -> Result<(), SkipReason> {
        if !settings.rescale_markers {
            return Err(SkipReason::Disabled);
        }
        if !scene.is_displayed(layers.markers) {
            return Err(SkipReason::LayerHidden);
        }
        for key in scene.descendants(layers.markers) {
            scene.update_layer(key, |l| {
                for marker in l.elements_mut().filter(|e| e.kind() == ShapeKind::Use) {
                    let Some(metric) = marker
                        .metric
                        .filter(|m| m.category == MetricCategory::Marker)
                    else {
                        log::trace!("Marker {} has no metric", marker.id);
                        continue;
                    };
                    let (Some(desired), Some(anchor)) = (metric.desired(), metric.anchor()) else {
                        log::trace!("Marker {} has a malformed metric", marker.id);
                        continue;
                    };
                    let size = self.marker_size(desired as f64, scale);
                    marker.set_frame(anchor.x - size / 2.0, anchor.y - size, size, size);
                }
            });
        }
        Ok(())
    }

    fn rescale_ruler(
        &self,
        scene: &mut Scene,
        layers: &SceneLayers,
        scale: f64,
    ) -> Result<(), SkipReason> {
        if !scene.is_displayed(layers.ruler) {
            return Err(SkipReason::LayerHidden);
        }
        let k = self.ruler_factor(scale);
        for key in scene.descendants(layers.ruler) {
            scene.update_layer(key, |l| {
                for e in l.elements_mut() {
                    match e.kind() {
                        ShapeKind::Circle => {
                            e.set_radius(2.0 * k);
                            e.set_stroke_width(Some((0.5 * k) as f32));
                        }
                        ShapeKind::Rect => e.set_stroke_width(Some((0.5 * k) as f32)),
                        ShapeKind::Text => e.set_font_size(Some((10.0 * k) as f32)),
                        ShapeKind::Line | ShapeKind::Path => e.set_stroke_width(Some(k as f32)),
                        _ => {}
                    }
                }
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapgen_core::{build_scene, AdaptiveMetric, Element, Point, Shape};

    fn view_at(scale: f64) -> ViewState {
        ViewState {
            scale,
            ..ViewState::new(1000.0, 800.0)
        }
    }

    fn with_label(desired: f32) -> (Scene, SceneLayers) {
        let (mut scene, layers) = build_scene();
        scene.layer_mut(layers.state_labels).unwrap().metric =
            Some(AdaptiveMetric::new(MetricCategory::Label, desired));
        (scene, layers)
    }

    fn font_size(scene: &Scene, key: mapgen_core::LayerKey) -> f32 {
        scene.layer(key).unwrap().style.font_size.unwrap()
    }

    #[test]
    fn test_label_size_at_scale() {
        let r = Rescaler::default();
        let settings = StyleSettings::default();
        let (mut scene, layers) = with_label(12.0);
        r.rescale(&mut scene, &layers, &view_at(1.0), &settings);
        assert!((font_size(&scene, layers.state_labels) - 12.0).abs() < 1e-6);
        r.rescale(&mut scene, &layers, &view_at(4.0), &settings);
        assert!((font_size(&scene, layers.state_labels) - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_label_on_screen_size_grows_with_zoom() {
        let r = Rescaler::default();
        let mut last = 0.0;
        for step in 0..=38 {
            let scale = 1.0 + step as f64 * 0.5;
            let on_screen = r.label_size(12.0, scale) * scale;
            assert!(on_screen >= last);
            last = on_screen;
        }
    }

    #[test]
    fn test_label_hidden_outside_band() {
        let r = Rescaler::default();
        let mut settings = StyleSettings::default();
        let (mut scene, layers) = with_label(4.0);
        scene.layer_mut(layers.added_labels).unwrap().metric =
            Some(AdaptiveMetric::new(MetricCategory::Label, 60.0));
        scene.layer_mut(layers.burg_labels_cities).unwrap().metric =
            Some(AdaptiveMetric::new(MetricCategory::Label, 12.0));

        r.rescale(&mut scene, &layers, &view_at(1.0), &settings);
        assert!(scene.layer(layers.state_labels).unwrap().legibility_hidden);
        assert!(scene.layer(layers.added_labels).unwrap().legibility_hidden);
        assert!(!scene.layer(layers.burg_labels_cities).unwrap().legibility_hidden);

        settings.hide_labels = false;
        r.rescale(&mut scene, &layers, &view_at(1.0), &settings);
        assert!(!scene.layer(layers.state_labels).unwrap().legibility_hidden);
        assert!(!scene.layer(layers.added_labels).unwrap().legibility_hidden);
    }

    #[test]
    fn test_hidden_labels_layer_skips_walk() {
        let r = Rescaler::default();
        let (mut scene, layers) = with_label(12.0);
        scene.update_layer(layers.labels, |l| l.set_visible(false));
        let report = r.rescale(&mut scene, &layers, &view_at(4.0), &StyleSettings::default());
        assert_eq!(report.skip_reason(RescaleCategory::Labels), Some(SkipReason::LayerHidden));
        assert!(scene.layer(layers.state_labels).unwrap().style.font_size.is_none());
    }

    #[test]
    fn test_group_without_metric_is_skipped() {
        let r = Rescaler::default();
        let (mut scene, layers) = build_scene();
        let report = r.rescale(&mut scene, &layers, &view_at(2.0), &StyleSettings::default());
        assert!(report.was_applied(RescaleCategory::Labels));
        assert!(scene.layer(layers.state_labels).unwrap().style.font_size.is_none());
    }

    #[test]
    fn test_halo_width_and_visibility() {
        let r = Rescaler::default();
        let settings = StyleSettings::default();
        let (mut scene, layers) = build_scene();

        r.rescale(&mut scene, &layers, &view_at(2.0), &settings);
        let halo = scene.layer(layers.states_halo).unwrap();
        assert!((halo.style.stroke_width.unwrap() - 5.0).abs() < 1e-6);
        assert!(halo.visible);

        r.rescale(&mut scene, &layers, &view_at(4.0), &settings);
        let halo = scene.layer(layers.states_halo).unwrap();
        assert!((halo.style.stroke_width.unwrap() - 2.5).abs() < 1e-6);
        assert!(!halo.visible);
    }

    #[test]
    fn test_marker_frame_from_anchor() {
        let r = Rescaler::default();
        let (mut scene, layers) = build_scene();
        scene.update_layer(layers.markers, |l| l.set_visible(true));
        let marker = Element::new(Shape::Use {
            href: "#marker_tower".to_string(),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        })
        .with_metric(AdaptiveMetric::anchored(
            MetricCategory::Marker,
            2.0,
            Point::new(100.0, 100.0),
        ));
        let id = scene.append(layers.markers, marker).unwrap();

        r.rescale(&mut scene, &layers, &view_at(5.0), &StyleSettings::default());
        let (_, marker) = scene.element(id).unwrap();
        let bbox = marker.shape.bbox().unwrap();
        assert!((bbox.width() - 15.0).abs() < 1e-9);
        assert!((bbox.height() - 15.0).abs() < 1e-9);
        assert!((bbox.min.x - 92.5).abs() < 1e-9);
        assert!((bbox.min.y - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_markers_untouched_when_disabled() {
        let r = Rescaler::default();
        let (mut scene, layers) = build_scene();
        let settings = StyleSettings {
            rescale_markers: false,
            ..Default::default()
        };
        let report = r.rescale(&mut scene, &layers, &view_at(3.0), &settings);
        assert_eq!(report.skip_reason(RescaleCategory::Markers), Some(SkipReason::Disabled));

        let report = r.rescale(&mut scene, &layers, &view_at(3.0), &StyleSettings::default());
        assert_eq!(report.skip_reason(RescaleCategory::Markers), Some(SkipReason::LayerHidden));
    }

    #[test]
    fn test_ruler_factor() {
        let r = Rescaler::default();
        assert!((r.ruler_factor(1.0) - 2.0).abs() < 1e-10);
        assert!((r.ruler_factor(20.0) - 0.8).abs() < 1e-10);
    }

    #[test]
    fn test_ruler_elements_follow_factor() {
        let r = Rescaler::default();
        let (mut scene, layers) = build_scene();
        scene.update_layer(layers.ruler, |l| l.set_visible(true));
        let group = scene.ensure_child(layers.ruler, "ruler0").unwrap();
        let circle = scene
            .append(group, Element::new(Shape::Circle { cx: 5.0, cy: 5.0, r: 1.0 }))
            .unwrap();
        let line = scene
            .append(
                group,
                Element::new(Shape::Line {
                    x1: 0.0,
                    y1: 0.0,
                    x2: 10.0,
                    y2: 0.0,
                }),
            )
            .unwrap();

        r.rescale(&mut scene, &layers, &view_at(1.0), &StyleSettings::default());
        let (_, c) = scene.element(circle).unwrap();
        assert!(matches!(c.shape, Shape::Circle { r, .. } if (r - 4.0).abs() < 1e-9));
        assert!((c.style.stroke_width.unwrap() - 1.0).abs() < 1e-6);
        let (_, l) = scene.element(line).unwrap();
        assert!((l.style.stroke_width.unwrap() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_coastline_filter_thresholds() {
        let r = Rescaler::default();
        assert_eq!(r.coastline_filter(1.0), Some(Filter::DropShadow));
        assert_eq!(r.coastline_filter(1.5), Some(Filter::DropShadow));
        assert_eq!(r.coastline_filter(2.0), None);
        assert_eq!(r.coastline_filter(2.6), None);
        assert_eq!(r.coastline_filter(2.7), Some(Filter::Blur));
    }

    #[test]
    fn test_coastline_toggle_off_leaves_filter() {
        let r = Rescaler::default();
        let (mut scene, layers) = build_scene();
        scene.update_layer(layers.coastline, |l| l.set_filter(Some(Filter::DropShadow01)));
        let settings = StyleSettings {
            auto_coastline: false,
            ..Default::default()
        };
        r.rescale(&mut scene, &layers, &view_at(5.0), &settings);
        assert_eq!(
            scene.layer(layers.coastline).unwrap().style.filter,
            Some(Filter::DropShadow01)
        );
    }

    #[test]
    fn test_ocean_pattern_flattens_when_zoomed_in() {
        let r = Rescaler::default();
        let (mut scene, layers) = build_scene();
        mapgen_core::init_backdrop(&mut scene, &layers, 100.0, 100.0);
        r.rescale(&mut scene, &layers, &view_at(12.0), &StyleSettings::default());
        let rect = &scene.layer(layers.ocean_pattern).unwrap().elements()[0];
        assert_eq!(rect.style.fill, Some(Paint::Color(Color::WHITE)));
        assert_eq!(rect.style.opacity, Some(0.2));

        r.rescale(&mut scene, &layers, &view_at(2.0), &StyleSettings::default());
        let rect = &scene.layer(layers.ocean_pattern).unwrap().elements()[0];
        assert_eq!(rect.style.fill, Some(Paint::pattern("oceanic")));
        assert_eq!(rect.style.opacity, None);
    }
}
