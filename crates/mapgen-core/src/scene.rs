use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementId};
use crate::error::SceneError;
use crate::layer::{Layer, LayerKey};

/// The layer tree plus every drawable element it owns.
///
/// Layers live in an arena indexed by [`LayerKey`]; creation order is paint
/// order among siblings. Elements are owned by their layer and are only ever
/// removed by clearing (a layer, or a filtered subset of it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    layers: Vec<Layer>,
    root: LayerKey,
}

impl Scene {
    pub fn new(root_name: &str) -> Self {
        let root = LayerKey(0);
        Self {
            layers: vec![Layer::new(root, root_name, None)],
            root,
        }
    }

    pub fn root(&self) -> LayerKey {
        self.root
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = LayerKey> + '_ {
        self.layers.iter().map(|l| l.key)
    }

    // ── Layer access ─────────────────────────────────────────────────

    pub fn layer(&self, key: LayerKey) -> Option<&Layer> {
        self.layers.get(key.0)
    }

    pub fn layer_mut(&mut self, key: LayerKey) -> Option<&mut Layer> {
        self.layers.get_mut(key.0)
    }

    pub fn try_layer(&self, key: LayerKey) -> Result<&Layer, SceneError> {
        self.layer(key)
            .ok_or_else(|| SceneError::MissingLayer(format!("#{}", key.0)))
    }

    pub fn try_layer_mut(&mut self, key: LayerKey) -> Result<&mut Layer, SceneError> {
        self.layers
            .get_mut(key.0)
            .ok_or_else(|| SceneError::MissingLayer(format!("#{}", key.0)))
    }

    /// Mutate a layer that is expected to exist.
    ///
    /// A missing layer is a programming error: debug builds panic, release
    /// builds log and skip the update so the view keeps running.
    pub fn update_layer<R>(&mut self, key: LayerKey, f: impl FnOnce(&mut Layer) -> R) -> Option<R> {
        match self.layers.get_mut(key.0) {
            Some(layer) => Some(f(layer)),
            None => {
                report_missing(key);
                None
            }
        }
    }

    /// Whether the layer's own `display` flag is on.
    pub fn is_displayed(&self, key: LayerKey) -> bool {
        self.layer(key).is_some_and(|l| l.visible)
    }

    // ── Hierarchy ────────────────────────────────────────────────────

    pub fn children(&self, key: LayerKey) -> &[LayerKey] {
        self.layer(key).map(|l| l.children()).unwrap_or(&[])
    }

    pub fn child(&self, parent: LayerKey, name: &str) -> Option<LayerKey> {
        self.children(parent)
            .iter()
            .copied()
            .find(|k| self.layers[k.0].name == name)
    }

    /// Create a child layer, failing if `parent` already has one with that name.
    pub fn add_child(&mut self, parent: LayerKey, name: &str) -> Result<LayerKey, SceneError> {
        let parent_layer = self.try_layer(parent)?;
        if self.child(parent, name).is_some() {
            return Err(SceneError::DuplicateLayer {
                parent: parent_layer.name.clone(),
                name: name.to_string(),
            });
        }
        Ok(self.push_child(parent, name))
    }

    /// Return the named child of `parent`, creating it if absent.
    pub fn ensure_child(&mut self, parent: LayerKey, name: &str) -> Result<LayerKey, SceneError> {
        self.try_layer(parent)?;
        Ok(self
            .child(parent, name)
            .unwrap_or_else(|| self.push_child(parent, name)))
    }

    /// Caller guarantees `parent` is a key of this scene.
    pub(crate) fn push_child(&mut self, parent: LayerKey, name: &str) -> LayerKey {
        let key = LayerKey(self.layers.len());
        self.layers.push(Layer::new(key, name, Some(parent)));
        self.layers[parent.0].children.push(key);
        key
    }

    /// Slash-separated names from below the root, e.g. `viewbox/labels/states`.
    pub fn path_of(&self, key: LayerKey) -> String {
        let mut names = Vec::new();
        let mut current = self.layer(key);
        while let Some(layer) = current {
            if layer.parent.is_none() {
                break;
            }
            names.push(layer.name.as_str());
            current = layer.parent.and_then(|p| self.layer(p));
        }
        names.reverse();
        names.join("/")
    }

    /// Resolve a path produced by [`Scene::path_of`].
    pub fn resolve(&self, path: &str) -> Result<LayerKey, SceneError> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self.root, |key, name| {
                self.child(key, name)
                    .ok_or_else(|| SceneError::MissingLayer(path.to_string()))
            })
    }

    /// `key` and all layers below it, in paint order.
    pub fn descendants(&self, key: LayerKey) -> Vec<LayerKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            let Some(layer) = self.layer(k) else { continue };
            out.push(k);
            stack.extend(layer.children.iter().rev().copied());
        }
        out
    }

    /// Every layer in paint order: later entries paint over earlier ones.
    pub fn paint_order(&self) -> Vec<LayerKey> {
        self.descendants(self.root)
    }

    // ── Elements ─────────────────────────────────────────────────────

    pub fn append(&mut self, key: LayerKey, element: Element) -> Result<ElementId, SceneError> {
        let layer = self.try_layer_mut(key)?;
        let id = element.id;
        layer.elements.push(element);
        Ok(id)
    }

    /// Remove every element of one layer. Children and siblings are untouched.
    pub fn clear_layer(&mut self, key: LayerKey) -> usize {
        self.update_layer(key, |layer| {
            let removed = layer.elements.len();
            layer.elements.clear();
            removed
        })
        .unwrap_or(0)
    }

    /// Remove the elements of one layer for which `remove` returns true.
    pub fn remove_elements_where(
        &mut self,
        key: LayerKey,
        mut remove: impl FnMut(&Element) -> bool,
    ) -> usize {
        self.update_layer(key, |layer| {
            let before = layer.elements.len();
            layer.elements.retain(|e| !remove(e));
            before - layer.elements.len()
        })
        .unwrap_or(0)
    }

    pub fn element(&self, id: ElementId) -> Option<(LayerKey, &Element)> {
        self.layers.iter().find_map(|layer| {
            layer
                .elements
                .iter()
                .find(|e| e.id == id)
                .map(|e| (layer.key, e))
        })
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.layers
            .iter_mut()
            .flat_map(|layer| layer.elements.iter_mut())
            .find(|e| e.id == id)
    }

    pub fn remove_element(&mut self, id: ElementId) -> Result<Element, SceneError> {
        for layer in &mut self.layers {
            if let Some(pos) = layer.elements.iter().position(|e| e.id == id) {
                return Ok(layer.elements.remove(pos));
            }
        }
        Err(SceneError::MissingElement(id))
    }

    pub fn element_count(&self) -> usize {
        self.layers.iter().map(|l| l.elements.len()).sum()
    }
}

fn report_missing(key: LayerKey) {
    debug_assert!(false, "layer #{} is not part of this scene", key.0);
    log::warn!("Skipping update of unknown layer #{}", key.0);
}
