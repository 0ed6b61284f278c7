use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::builder::SceneLayers;
use crate::element::{AdaptiveMetric, MetricCategory, ShapeKind};
use crate::geometry::{Point, Transform};
use crate::layer::{Color, FillRule, Filter, LayerKey, LineCap, Mask, Paint, ShapeRendering, Style};
use crate::scene::Scene;
use crate::settings::StyleSettings;

const LABEL_FONT: &str = "Almendra SC";

/// Derived content that must be redrawn because a reset changed its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedrawCategory {
    Heightmap,
    Legend,
}

/// What a baseline application changed beyond layer attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineChanges {
    redraw: Vec<RedrawCategory>,
}

impl BaselineChanges {
    pub fn contains(&self, category: RedrawCategory) -> bool {
        self.redraw.contains(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.redraw.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = RedrawCategory> + '_ {
        self.redraw.iter().copied()
    }
}

/// Full default attribute set of one layer. Applying it replaces the
/// layer's style and metric wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerDefaults {
    pub style: Style,
    pub metric: Option<AdaptiveMetric>,
}

impl From<Style> for LayerDefaults {
    fn from(style: Style) -> Self {
        Self {
            style,
            metric: None,
        }
    }
}

/// Default applied to the elements of a given kind inside one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDefault {
    pub layer: LayerKey,
    pub kind: ShapeKind,
    pub update: ElementUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementUpdate {
    /// Merged over the element's own style.
    Style(Style),
    /// Move framed shapes to this origin.
    Origin(Point),
    Show,
}

/// The default look of every layer.
///
/// Built once per reset from the current [`StyleSettings`] (label sizes
/// depend on the region count) and applied in a single pass. Every layer
/// except the transform root is covered: layers without an entry are reset
/// to an empty style.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleBaseline {
    transform_root: LayerKey,
    legend: LayerKey,
    layers: BTreeMap<LayerKey, LayerDefaults>,
    elements: Vec<ElementDefault>,
}

impl StyleBaseline {
    pub fn new(l: &SceneLayers, settings: &StyleSettings) -> Self {
        let resets = StyleSettings::default();
        let dark = Color::rgb(0x3e, 0x3e, 0x4b);
        let regions = settings.regions as f32;
        let cities_size = (8.0 - regions / 20.0).round().max(3.0);
        let state_label_size = (24.0 - regions / 6.0).round().max(6.0);

        let mut layers: BTreeMap<LayerKey, LayerDefaults> = BTreeMap::new();
        let mut set = |key: LayerKey, defaults: LayerDefaults| {
            layers.insert(key, defaults);
        };

        set(
            l.state_borders,
            Style::new()
                .with_opacity(0.8)
                .with_stroke(Color::rgb(0x56, 0x56, 0x6d))
                .with_stroke_width(1.0)
                .with_dash(&[2.0])
                .with_linecap(LineCap::Butt)
                .into(),
        );
        set(
            l.province_borders,
            Style::new()
                .with_opacity(0.8)
                .with_stroke(Color::rgb(0x56, 0x56, 0x6d))
                .with_stroke_width(0.2)
                .with_dash(&[1.0])
                .with_linecap(LineCap::Butt)
                .into(),
        );
        set(
            l.cells,
            Style::new()
                .with_stroke(Color::rgb(0x80, 0x80, 0x80))
                .with_stroke_width(0.1)
                .into(),
        );
        set(
            l.grid_overlay,
            Style::new()
                .with_opacity(0.8)
                .with_stroke(Color::rgb(0x80, 0x80, 0x80))
                .with_stroke_width(0.5)
                .into(),
        );
        set(
            l.coordinates,
            LayerDefaults {
                style: Style::new()
                    .with_opacity(1.0)
                    .with_font_size(12.0)
                    .with_stroke(Color::rgb(0xd4, 0xd4, 0xd4))
                    .with_stroke_width(1.0)
                    .with_dash(&[5.0]),
                metric: Some(AdaptiveMetric::new(MetricCategory::Coordinates, 12.0)),
            },
        );
        set(
            l.compass,
            Style::new()
                .with_opacity(0.8)
                .with_mask(Mask::Water)
                .with_shape_rendering(ShapeRendering::OptimizeSpeed)
                .into(),
        );
        set(
            l.coastline,
            Style::new()
                .with_opacity(0.5)
                .with_stroke(Color::rgb(0x1f, 0x38, 0x46))
                .with_stroke_width(0.7)
                .with_filter(Filter::DropShadow)
                .into(),
        );
        set(
            l.relig,
            Style::new()
                .with_opacity(0.6)
                .with_stroke(Color::rgb(0x77, 0x77, 0x77))
                .with_stroke_width(0.2)
                .with_fill_rule(FillRule::EvenOdd)
                .into(),
        );
        set(
            l.cults,
            Style::new()
                .with_opacity(0.6)
                .with_stroke(Color::rgb(0x77, 0x77, 0x77))
                .with_stroke_width(0.5)
                .with_fill_rule(FillRule::EvenOdd)
                .into(),
        );
        set(
            l.landmass,
            Style::new()
                .with_opacity(1.0)
                .with_fill(Color::rgb(0xee, 0xf6, 0xfb))
                .into(),
        );
        set(l.markers, Style::new().with_filter(Filter::DropShadow01).into());
        set(
            l.prec,
            Style::new()
                .with_stroke(Color::BLACK)
                .with_stroke_width(0.1)
                .with_fill(Color::rgb(0x00, 0x3d, 0xff))
                .into(),
        );
        set(
            l.population,
            Style::new()
                .with_stroke_width(1.6)
                .with_linecap(LineCap::Butt)
                .into(),
        );
        set(l.rural, Style::new().with_stroke(Color::rgb(0x00, 0x00, 0xff)).into());
        set(l.urban, Style::new().with_stroke(Color::rgb(0xff, 0x00, 0x00)).into());
        set(
            l.freshwater,
            Style::new()
                .with_opacity(0.5)
                .with_fill(Color::rgb(0xa6, 0xc1, 0xfd))
                .with_stroke(Color::rgb(0x5f, 0x79, 0x9d))
                .with_stroke_width(0.7)
                .into(),
        );
        set(
            l.salt,
            Style::new()
                .with_opacity(0.5)
                .with_fill(Color::rgb(0x40, 0x9b, 0x8a))
                .with_stroke(Color::rgb(0x38, 0x89, 0x85))
                .with_stroke_width(0.7)
                .into(),
        );
        set(l.rivers, Style::new().with_fill(Color::rgb(0x5d, 0x97, 0xbb)).into());
        set(
            l.roads,
            Style::new()
                .with_opacity(0.9)
                .with_stroke(Color::rgb(0xd0, 0x63, 0x24))
                .with_stroke_width(0.7)
                .with_dash(&[2.0])
                .with_linecap(LineCap::Butt)
                .into(),
        );
        set(
            l.trails,
            Style::new()
                .with_opacity(0.9)
                .with_stroke(Color::rgb(0xd0, 0x63, 0x24))
                .with_stroke_width(0.25)
                .with_dash(&[0.8, 1.6])
                .with_linecap(LineCap::Butt)
                .into(),
        );
        set(
            l.searoutes,
            Style::new()
                .with_opacity(0.8)
                .with_stroke(Color::WHITE)
                .with_stroke_width(0.45)
                .with_dash(&[1.0, 2.0])
                .with_linecap(LineCap::Round)
                .into(),
        );
        set(l.regions, Style::new().with_opacity(0.4).into());
        set(
            l.states_halo,
            Style::new()
                .with_stroke_width(settings.states_halo_width)
                .with_opacity(1.0)
                .into(),
        );
        set(l.provs, Style::new().with_opacity(0.6).into());
        set(
            l.temperature,
            Style::new()
                .with_fill(Color::BLACK)
                .with_stroke_width(1.8)
                .with_fill_opacity(0.3)
                .with_font_size(8.0)
                .into(),
        );
        set(l.texture, Style::new().with_mask(Mask::Land).into());
        set(
            l.zones,
            Style::new()
                .with_opacity(0.6)
                .with_stroke(Color::rgb(0x33, 0x33, 0x33))
                .with_stroke_width(0.0)
                .with_linecap(LineCap::Butt)
                .into(),
        );
        set(
            l.terrs,
            Style::new().with_mask(Mask::Land).with_stroke(Paint::None).into(),
        );
        set(
            l.legend,
            LayerDefaults {
                style: Style::new()
                    .with_font(LABEL_FONT, 13.0)
                    .with_stroke_width(2.5)
                    .with_stroke(Color::rgb(0x81, 0x29, 0x29))
                    .with_dash(&[0.0, 4.0, 10.0, 4.0])
                    .with_linecap(LineCap::Round),
                metric: Some(AdaptiveMetric::anchored(
                    MetricCategory::Legend,
                    13.0,
                    Point::new(99.0, 93.0),
                )),
            },
        );

        let icon_base = Style::new().with_fill(Color::WHITE).with_stroke(dark);
        for key in [l.burg_icons, l.anchors] {
            set(key, icon_base.clone().into());
        }
        let burg_icon = |size: f32, width: f32| LayerDefaults {
            style: icon_base
                .clone()
                .with_opacity(1.0)
                .with_stroke_width(width)
                .with_fill_opacity(0.7)
                .with_dash(&[])
                .with_linecap(LineCap::Butt),
            metric: Some(AdaptiveMetric::new(MetricCategory::Icon, size)),
        };
        set(l.burg_icons_cities, burg_icon(1.0, 0.24));
        set(l.burg_icons_towns, burg_icon(0.5, 0.12));
        let anchor = |size: f32| LayerDefaults {
            style: icon_base.clone().with_opacity(1.0).with_stroke_width(1.2),
            metric: Some(AdaptiveMetric::new(MetricCategory::Icon, size)),
        };
        set(l.anchors_cities, anchor(2.0));
        set(l.anchors_towns, anchor(1.0));

        let label = |rendered: f32, desired: f32| LayerDefaults {
            style: Style::new()
                .with_fill(dark)
                .with_opacity(1.0)
                .with_font(LABEL_FONT, rendered),
            metric: Some(AdaptiveMetric::new(MetricCategory::Label, desired)),
        };
        set(l.burg_labels_cities, label(cities_size, cities_size));
        set(l.burg_labels_towns, label(3.0, 4.0));
        let outlined = |size: f32| {
            let mut d = label(size, size);
            d.style.stroke = Some(Color::rgb(0x3a, 0x3a, 0x3a).into());
            d.style.stroke_width = Some(0.0);
            d
        };
        set(l.state_labels, outlined(state_label_size));
        set(l.added_labels, outlined(18.0));

        set(
            l.fogging,
            Style::new()
                .with_opacity(0.8)
                .with_fill(Color::BLACK)
                .with_stroke_width(5.0)
                .into(),
        );
        set(l.fogging_cont, Style::new().with_mask(Mask::Fog).into());

        let elements = vec![
            ElementDefault {
                layer: l.ocean_layers,
                kind: ShapeKind::Rect,
                update: ElementUpdate::Style(Style::new().with_fill(Color::rgb(0x53, 0x67, 0x9f))),
            },
            ElementDefault {
                layer: l.ocean_layers,
                kind: ShapeKind::Path,
                update: ElementUpdate::Show,
            },
            ElementDefault {
                layer: l.oceanic,
                kind: ShapeKind::Rect,
                update: ElementUpdate::Style(
                    Style::new().with_filter(Filter::Named(resets.ocean_pattern.clone())),
                ),
            },
            ElementDefault {
                layer: l.compass,
                kind: ShapeKind::Use,
                update: ElementUpdate::Style(Style {
                    transform: Some(Transform::new(Point::new(80.0, 80.0), 0.25)),
                    ..Style::default()
                }),
            },
            ElementDefault {
                layer: l.texture,
                kind: ShapeKind::Image,
                update: ElementUpdate::Origin(Point::new(0.0, 0.0)),
            },
        ];

        Self {
            transform_root: l.viewbox,
            legend: l.legend,
            layers,
            elements,
        }
    }

    pub fn defaults(&self, key: LayerKey) -> Option<&LayerDefaults> {
        self.layers.get(&key)
    }

    /// Apply the baseline to every layer and reset the UI parameters it owns.
    ///
    /// Never draws: the returned [`BaselineChanges`] names the derived content
    /// whose inputs changed so the caller can schedule redraws.
    pub fn apply(&self, scene: &mut Scene, settings: &mut StyleSettings) -> BaselineChanges {
        let empty = LayerDefaults::default();
        let keys: Vec<LayerKey> = scene.keys().collect();
        for key in keys {
            if key == self.transform_root {
                continue;
            }
            let defaults = self.layers.get(&key).unwrap_or(&empty);
            scene.update_layer(key, |layer| {
                layer.style = defaults.style.clone();
                layer.metric = defaults.metric;
            });
        }

        for rule in &self.elements {
            scene.update_layer(rule.layer, |layer| {
                for element in layer.elements_mut().filter(|e| e.kind() == rule.kind) {
                    match &rule.update {
                        ElementUpdate::Style(style) => element.style.merge(style),
                        ElementUpdate::Origin(p) => {
                            element.set_origin(p.x, p.y);
                        }
                        ElementUpdate::Show => element.set_visible(true),
                    }
                }
            });
        }

        let resets = StyleSettings::default();
        let mut changes = BaselineChanges::default();
        if settings.heightmap != resets.heightmap {
            changes.redraw.push(RedrawCategory::Heightmap);
        }
        settings.heightmap = resets.heightmap;
        settings.legend = resets.legend;
        settings.auto_coastline = resets.auto_coastline;
        settings.rescale_markers = resets.rescale_markers;
        settings.ocean_pattern = resets.ocean_pattern;

        if self.has_legend_content(scene) {
            changes.redraw.push(RedrawCategory::Legend);
        }

        log::debug!(
            "Style baseline applied to {} layers, redraw: {:?}",
            scene.layer_count() - 1,
            changes.redraw
        );
        changes
    }

    /// Write only the label metrics of the baseline, leaving styles alone.
    ///
    /// Label sizes follow the region count, so a changed count takes effect
    /// without discarding user styling. Returns the number of layers updated.
    pub fn apply_label_metrics(&self, scene: &mut Scene) -> usize {
        let mut updated = 0;
        for (key, defaults) in &self.layers {
            let Some(metric) = defaults.metric else {
                continue;
            };
            if metric.category != MetricCategory::Label || *key == self.transform_root {
                continue;
            }
            scene.update_layer(*key, |layer| layer.metric = Some(metric));
            updated += 1;
        }
        log::debug!("Label metrics applied to {updated} layers");
        updated
    }

    fn has_legend_content(&self, scene: &Scene) -> bool {
        scene
            .descendants(self.legend)
            .into_iter()
            .any(|k| scene.layer(k).is_some_and(|l| l.element_count() > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_scene, init_backdrop};
    use crate::element::{Element, Shape};

    fn setup() -> (Scene, SceneLayers, StyleSettings) {
        let (mut scene, layers) = build_scene();
        init_backdrop(&mut scene, &layers, 1000.0, 1000.0);
        (scene, layers, StyleSettings::default())
    }

    #[test]
    fn test_apply_is_idempotent() {
        let (mut scene, layers, mut settings) = setup();
        let baseline = StyleBaseline::new(&layers, &settings);
        baseline.apply(&mut scene, &mut settings);
        let first = scene.clone();
        let first_settings = settings.clone();
        baseline.apply(&mut scene, &mut settings);
        assert_eq!(scene, first);
        assert_eq!(settings, first_settings);
    }

    #[test]
    fn test_apply_restores_overrides() {
        let (mut scene, layers, mut settings) = setup();
        let baseline = StyleBaseline::new(&layers, &settings);
        baseline.apply(&mut scene, &mut settings);
        let expected = scene.clone();

        scene.update_layer(layers.coastline, |l| {
            l.set_opacity(Some(0.1));
            l.set_filter(None);
        });
        scene.update_layer(layers.debug, |l| l.set_stroke_width(Some(4.0)));
        baseline.apply(&mut scene, &mut settings);
        assert_eq!(scene, expected);
    }

    #[test]
    fn test_border_defaults() {
        let (mut scene, layers, mut settings) = setup();
        StyleBaseline::new(&layers, &settings).apply(&mut scene, &mut settings);
        let borders = &scene.layer(layers.state_borders).unwrap().style;
        assert_eq!(borders.opacity, Some(0.8));
        assert_eq!(borders.stroke, Some(Paint::Color(Color::rgb(0x56, 0x56, 0x6d))));
        assert_eq!(borders.stroke_linecap, Some(LineCap::Butt));
        assert_eq!(borders.filter, None);
    }

    #[test]
    fn test_label_sizes_follow_region_count() {
        let (_, layers, _) = setup();
        let settings = StyleSettings {
            regions: 60,
            ..Default::default()
        };
        let baseline = StyleBaseline::new(&layers, &settings);
        let states = baseline.defaults(layers.state_labels).unwrap();
        assert_eq!(states.metric.and_then(|m| m.desired()), Some(14.0));
        let cities = baseline.defaults(layers.burg_labels_cities).unwrap();
        assert_eq!(cities.style.font_size, Some(5.0));
        let towns = baseline.defaults(layers.burg_labels_towns).unwrap();
        assert_eq!(towns.style.font_size, Some(3.0));
        assert_eq!(towns.metric.and_then(|m| m.desired()), Some(4.0));
    }

    #[test]
    fn test_label_metrics_keep_user_styles() {
        let (mut scene, layers, _) = setup();
        let settings = StyleSettings {
            regions: 60,
            ..Default::default()
        };
        scene.update_layer(layers.state_labels, |l| l.set_opacity(Some(0.3)));
        let updated = StyleBaseline::new(&layers, &settings).apply_label_metrics(&mut scene);
        assert_eq!(updated, 3);
        let states = scene.layer(layers.state_labels).unwrap();
        assert_eq!(states.metric.and_then(|m| m.desired()), Some(14.0));
        assert_eq!(states.style.opacity, Some(0.3));
    }

    #[test]
    fn test_minimum_label_sizes() {
        let (_, layers, _) = setup();
        let settings = StyleSettings {
            regions: 500,
            ..Default::default()
        };
        let baseline = StyleBaseline::new(&layers, &settings);
        assert_eq!(baseline.defaults(layers.state_labels).unwrap().style.font_size, Some(6.0));
        assert_eq!(
            baseline.defaults(layers.burg_labels_cities).unwrap().style.font_size,
            Some(3.0)
        );
    }

    #[test]
    fn test_viewbox_transform_untouched() {
        let (mut scene, layers, mut settings) = setup();
        let t = crate::geometry::Transform::new(Point::new(5.0, 5.0), 2.0);
        scene.update_layer(layers.viewbox, |l| l.set_transform(Some(t)));
        StyleBaseline::new(&layers, &settings).apply(&mut scene, &mut settings);
        assert_eq!(scene.layer(layers.viewbox).unwrap().style.transform, Some(t));
    }

    #[test]
    fn test_element_defaults() {
        let (mut scene, layers, mut settings) = setup();
        let hidden = scene
            .append(layers.ocean_layers, Element::new(Shape::path("M0,0")))
            .unwrap();
        scene.element_mut(hidden).unwrap().set_visible(false);
        StyleBaseline::new(&layers, &settings).apply(&mut scene, &mut settings);

        let ocean = scene.layer(layers.ocean_layers).unwrap();
        let base = ocean.elements().iter().find(|e| e.kind() == ShapeKind::Rect).unwrap();
        assert_eq!(base.style.fill, Some(Paint::Color(Color::rgb(0x53, 0x67, 0x9f))));
        assert!(scene.element(hidden).unwrap().1.visible);
        let tile = &scene.layer(layers.oceanic).unwrap().elements()[0];
        assert_eq!(tile.style.filter, Some(Filter::Named("pattern1".to_string())));
        let rose = &scene.layer(layers.compass).unwrap().elements()[0];
        assert_eq!(rose.doc_id.as_deref(), Some("rose"));
        let placed = rose.style.transform.unwrap();
        assert!((placed.scale - 0.25).abs() < 1e-10);
        assert!((placed.offset.x - 80.0).abs() < 1e-10);
        assert!((placed.offset.y - 80.0).abs() < 1e-10);
    }

    #[test]
    fn test_heightmap_redraw_only_when_changed() {
        let (mut scene, layers, mut settings) = setup();
        let baseline = StyleBaseline::new(&layers, &settings);
        assert!(!baseline.apply(&mut scene, &mut settings).contains(RedrawCategory::Heightmap));

        settings.heightmap.skip = 2;
        settings.auto_coastline = false;
        let changes = baseline.apply(&mut scene, &mut settings);
        assert!(changes.contains(RedrawCategory::Heightmap));
        assert_eq!(settings.heightmap.skip, 5);
        assert!(settings.auto_coastline);
    }

    #[test]
    fn test_legend_redraw_only_with_content() {
        let (mut scene, layers, mut settings) = setup();
        let baseline = StyleBaseline::new(&layers, &settings);
        assert!(!baseline.apply(&mut scene, &mut settings).contains(RedrawCategory::Legend));
        scene
            .append(layers.legend, Element::new(Shape::rect(0.0, 0.0, 10.0, 10.0)))
            .unwrap();
        assert!(baseline.apply(&mut scene, &mut settings).contains(RedrawCategory::Legend));
    }
}
