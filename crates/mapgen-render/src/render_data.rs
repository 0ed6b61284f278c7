use mapgen_core::{Element, LayerKey, Scene, Style, Transform};
use serde::{Deserialize, Serialize};

use crate::viewport::ViewState;

/// One drawable layer of a frame, ready for a canvas frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderLayer {
    pub layer_id: u32,
    /// Slash-separated path, e.g. `viewbox/labels/states`.
    pub path: String,
    /// Opacity after multiplying in every ancestor.
    pub opacity: f32,
    /// The layer's own attributes; unset values inherit from `path`'s parents.
    pub style: Style,
    /// Whether the layer sits below `viewbox` and takes the view transform.
    pub transformed: bool,
    pub elements: Vec<Element>,
}

/// Complete render frame data sent from Rust to the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderFrame {
    /// Displayed layers in paint order.
    pub layers: Vec<RenderLayer>,
    pub view: ViewState,
    pub transform: Transform,
}

impl RenderFrame {
    pub fn empty(view: ViewState) -> Self {
        Self {
            layers: Vec::new(),
            view,
            transform: view.transform(),
        }
    }

    /// Flatten the displayed part of the scene.
    ///
    /// A layer hidden by `display` or by label culling drops its whole
    /// subtree. Empty layers are kept so the frontend can show group styles.
    pub fn capture(scene: &Scene, view: &ViewState, viewbox: LayerKey) -> Self {
        let mut frame = Self::empty(*view);
        frame.collect(scene, scene.root(), 1.0, false, viewbox);
        log::trace!("Captured frame with {} layers", frame.layers.len());
        frame
    }

    fn collect(
        &mut self,
        scene: &Scene,
        key: LayerKey,
        parent_opacity: f32,
        transformed: bool,
        viewbox: LayerKey,
    ) {
        let Some(layer) = scene.layer(key) else {
            return;
        };
        if !layer.visible || layer.legibility_hidden {
            return;
        }
        let opacity = parent_opacity * layer.style.opacity.unwrap_or(1.0);
        let transformed = transformed || key == viewbox;
        self.layers.push(RenderLayer {
            layer_id: key.index() as u32,
            path: scene.path_of(key),
            opacity,
            style: layer.style.clone(),
            transformed,
            elements: layer.elements().iter().filter(|e| e.visible).cloned().collect(),
        });
        for child in layer.children() {
            self.collect(scene, *child, opacity, transformed, viewbox);
        }
    }

    pub fn layer(&self, path: &str) -> Option<&RenderLayer> {
        self.layers.iter().find(|l| l.path == path)
    }

    pub fn element_count(&self) -> usize {
        self.layers.iter().map(|l| l.elements.len()).sum()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapgen_core::{build_scene, init_backdrop};

    #[test]
    fn test_hidden_subtrees_are_dropped() {
        let (mut scene, layers) = build_scene();
        init_backdrop(&mut scene, &layers, 200.0, 100.0);
        let frame = RenderFrame::capture(&scene, &ViewState::new(200.0, 100.0), layers.viewbox);
        assert!(frame.layer("viewbox/ruler").is_none());
        assert!(frame.layer("viewbox/fogging-cont/fogging").is_none());
        assert!(frame.layer("viewbox/fogging-cont").is_some());
        // six backdrop elements, the fogging rect hidden with its layer
        assert_eq!(frame.element_count(), 5);
    }

    #[test]
    fn test_effective_opacity_and_transform_flag() {
        let (mut scene, layers) = build_scene();
        scene.update_layer(layers.labels, |l| l.set_opacity(Some(0.5)));
        scene.update_layer(layers.state_labels, |l| l.set_opacity(Some(0.5)));
        let frame = RenderFrame::capture(&scene, &ViewState::new(10.0, 10.0), layers.viewbox);
        let states = frame.layer("viewbox/labels/states").unwrap();
        assert!((states.opacity - 0.25).abs() < 1e-6);
        assert!(states.transformed);
        assert!(!frame.layer("legend").unwrap().transformed);
    }

    #[test]
    fn test_culled_labels_are_skipped() {
        let (mut scene, layers) = build_scene();
        scene.layer_mut(layers.burg_labels).unwrap().legibility_hidden = true;
        let frame = RenderFrame::capture(&scene, &ViewState::new(10.0, 10.0), layers.viewbox);
        assert!(frame.layer("viewbox/labels/burgLabels/towns").is_none());
        assert!(frame.to_json().unwrap().contains("\"viewbox/labels/states\""));
    }
}
