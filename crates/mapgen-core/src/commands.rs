use crate::layer::{Filter, LayerKey, Paint};
use crate::scene::Scene;

/// A reversible user styling action on one layer.
pub trait StyleCommand: std::fmt::Debug + Send {
    /// Apply the override to the scene.
    fn execute(&mut self, scene: &mut Scene);
    /// Restore the value captured by `execute`.
    fn undo(&mut self, scene: &mut Scene);
    /// Human-readable description for the undo/redo history.
    fn description(&self) -> &str;
}

// ══════════════════════════════════════════════════════════════════════
// Concrete Commands
// ══════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct SetLayerOpacity {
    pub layer: LayerKey,
    pub opacity: Option<f32>,
    previous: Option<Option<f32>>,
}

impl SetLayerOpacity {
    pub fn new(layer: LayerKey, opacity: Option<f32>) -> Self {
        Self {
            layer,
            opacity,
            previous: None,
        }
    }
}

impl StyleCommand for SetLayerOpacity {
    fn execute(&mut self, scene: &mut Scene) {
        let opacity = self.opacity;
        self.previous = scene.update_layer(self.layer, |l| {
            let old = l.style.opacity;
            l.set_opacity(opacity);
            old
        });
    }

    fn undo(&mut self, scene: &mut Scene) {
        if let Some(old) = self.previous.take() {
            scene.update_layer(self.layer, |l| l.set_opacity(old));
        }
    }

    fn description(&self) -> &str {
        "Set layer opacity"
    }
}

/// Change stroke paint and width together.
#[derive(Debug)]
pub struct SetLayerStroke {
    pub layer: LayerKey,
    pub stroke: Option<Paint>,
    pub width: Option<f32>,
    previous: Option<(Option<Paint>, Option<f32>)>,
}

impl SetLayerStroke {
    pub fn new(layer: LayerKey, stroke: Option<Paint>, width: Option<f32>) -> Self {
        Self {
            layer,
            stroke,
            width,
            previous: None,
        }
    }
}

impl StyleCommand for SetLayerStroke {
    fn execute(&mut self, scene: &mut Scene) {
        let (stroke, width) = (self.stroke.clone(), self.width);
        self.previous = scene.update_layer(self.layer, |l| {
            let old = (l.style.stroke.take(), l.style.stroke_width);
            l.set_stroke(stroke);
            l.set_stroke_width(width);
            old
        });
    }

    fn undo(&mut self, scene: &mut Scene) {
        if let Some((stroke, width)) = self.previous.take() {
            scene.update_layer(self.layer, |l| {
                l.set_stroke(stroke);
                l.set_stroke_width(width);
            });
        }
    }

    fn description(&self) -> &str {
        "Set layer stroke"
    }
}

#[derive(Debug)]
pub struct SetLayerFill {
    pub layer: LayerKey,
    pub fill: Option<Paint>,
    previous: Option<Option<Paint>>,
}

impl SetLayerFill {
    pub fn new(layer: LayerKey, fill: Option<Paint>) -> Self {
        Self {
            layer,
            fill,
            previous: None,
        }
    }
}

impl StyleCommand for SetLayerFill {
    fn execute(&mut self, scene: &mut Scene) {
        let fill = self.fill.clone();
        self.previous = scene.update_layer(self.layer, |l| {
            let old = l.style.fill.take();
            l.set_fill(fill);
            old
        });
    }

    fn undo(&mut self, scene: &mut Scene) {
        if let Some(old) = self.previous.take() {
            scene.update_layer(self.layer, |l| l.set_fill(old));
        }
    }

    fn description(&self) -> &str {
        "Set layer fill"
    }
}

#[derive(Debug)]
pub struct SetLayerFilter {
    pub layer: LayerKey,
    pub filter: Option<Filter>,
    previous: Option<Option<Filter>>,
}

impl SetLayerFilter {
    pub fn new(layer: LayerKey, filter: Option<Filter>) -> Self {
        Self {
            layer,
            filter,
            previous: None,
        }
    }
}

impl StyleCommand for SetLayerFilter {
    fn execute(&mut self, scene: &mut Scene) {
        let filter = self.filter.clone();
        self.previous = scene.update_layer(self.layer, |l| {
            let old = l.style.filter.take();
            l.set_filter(filter);
            old
        });
    }

    fn undo(&mut self, scene: &mut Scene) {
        if let Some(old) = self.previous.take() {
            scene.update_layer(self.layer, |l| l.set_filter(old));
        }
    }

    fn description(&self) -> &str {
        "Set layer filter"
    }
}

/// Show or hide a layer (the layer toggles of the map menu).
#[derive(Debug)]
pub struct SetLayerVisibility {
    pub layer: LayerKey,
    pub visible: bool,
    previous: Option<bool>,
}

impl SetLayerVisibility {
    pub fn new(layer: LayerKey, visible: bool) -> Self {
        Self {
            layer,
            visible,
            previous: None,
        }
    }
}

impl StyleCommand for SetLayerVisibility {
    fn execute(&mut self, scene: &mut Scene) {
        let visible = self.visible;
        self.previous = scene.update_layer(self.layer, |l| {
            let old = l.visible;
            l.set_visible(visible);
            old
        });
    }

    fn undo(&mut self, scene: &mut Scene) {
        if let Some(old) = self.previous.take() {
            scene.update_layer(self.layer, |l| l.set_visible(old));
        }
    }

    fn description(&self) -> &str {
        if self.visible {
            "Show layer"
        } else {
            "Hide layer"
        }
    }
}

/// Manages the undo/redo stacks of style overrides.
#[derive(Debug, Default)]
pub struct StyleHistory {
    undo_stack: Vec<Box<dyn StyleCommand>>,
    redo_stack: Vec<Box<dyn StyleCommand>>,
}

impl StyleHistory {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    pub fn execute(&mut self, mut command: Box<dyn StyleCommand>, scene: &mut Scene) {
        command.execute(scene);
        log::debug!("Style command: {}", command.description());
        self.undo_stack.push(command);
        // Executing a new command clears the redo stack.
        self.redo_stack.clear();
    }

    pub fn undo(&mut self, scene: &mut Scene) -> bool {
        if let Some(mut command) = self.undo_stack.pop() {
            command.undo(scene);
            self.redo_stack.push(command);
            true
        } else {
            false
        }
    }

    pub fn redo(&mut self, scene: &mut Scene) -> bool {
        if let Some(mut command) = self.redo_stack.pop() {
            command.execute(scene);
            self.undo_stack.push(command);
            true
        } else {
            false
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|c| c.description())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|c| c.description())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
