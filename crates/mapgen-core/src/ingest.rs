//! Entry points for the external generation engine.
//!
//! Every call clears the layers it targets before appending, and checks
//! parallel arrays up front so a rejected batch leaves the scene unchanged.

use serde::{Deserialize, Serialize};

use crate::builder::SceneLayers;
use crate::element::{Element, ElementId, Shape, ShapeKind};
use crate::error::SceneError;
use crate::layer::{Color, LayerKey, Style};
use crate::scene::Scene;

/// Height contour polygons, one fill and one height value per path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeightmapBatch {
    pub paths: Vec<String>,
    pub colors: Vec<Color>,
    pub values: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoastlineBatch {
    pub land_mask_paths: Vec<String>,
    pub water_mask_paths: Vec<String>,
    pub coastline_paths: Vec<String>,
    pub coastline_ids: Vec<String>,
    /// Lake group per lake path: `freshwater` or `salt`.
    pub lake_groups: Vec<String>,
    pub lake_paths: Vec<String>,
    pub lake_ids: Vec<String>,
}

fn check_len(batch: &'static str, expected: usize, found: usize) -> Result<(), SceneError> {
    if expected == found {
        Ok(())
    } else {
        Err(SceneError::BatchLength {
            batch,
            expected,
            found,
        })
    }
}

/// Replace the cell mesh overlay with a single path.
pub fn draw_cells(scene: &mut Scene, layers: &SceneLayers, path: &str) -> Result<ElementId, SceneError> {
    scene.clear_layer(layers.cells);
    scene.append(layers.cells, Element::new(Shape::path(path)))
}

pub fn clear_cells(scene: &mut Scene, layers: &SceneLayers) -> usize {
    scene.clear_layer(layers.cells)
}

pub fn draw_heightmap(
    scene: &mut Scene,
    layers: &SceneLayers,
    batch: &HeightmapBatch,
) -> Result<usize, SceneError> {
    let count = batch.paths.len();
    check_len("heightmap colors", count, batch.colors.len())?;
    check_len("heightmap values", count, batch.values.len())?;

    scene.clear_layer(layers.terrs);
    for ((path, color), value) in batch.paths.iter().zip(&batch.colors).zip(&batch.values) {
        let element = Element::new(Shape::path(path.as_str()))
            .with_style(Style::new().with_fill(*color))
            .with_height(*value);
        scene.append(layers.terrs, element)?;
    }
    log::debug!("Heightmap drawn: {count} layers");
    Ok(count)
}

pub fn clear_heightmap(scene: &mut Scene, layers: &SceneLayers) -> usize {
    scene.clear_layer(layers.terrs)
}

pub fn draw_coastline(
    scene: &mut Scene,
    layers: &SceneLayers,
    batch: &CoastlineBatch,
) -> Result<(), SceneError> {
    check_len("coastline ids", batch.coastline_paths.len(), batch.coastline_ids.len())?;
    check_len("lake groups", batch.lake_paths.len(), batch.lake_groups.len())?;
    check_len("lake ids", batch.lake_paths.len(), batch.lake_ids.len())?;

    for key in [
        layers.land_mask,
        layers.water_mask,
        layers.coastline,
        layers.freshwater,
        layers.salt,
    ] {
        scene.clear_layer(key);
    }

    for d in &batch.land_mask_paths {
        scene.append(layers.land_mask, Element::new(Shape::path(d.as_str())))?;
    }
    for d in &batch.water_mask_paths {
        scene.append(layers.water_mask, Element::new(Shape::path(d.as_str())))?;
    }
    for (d, id) in batch.coastline_paths.iter().zip(&batch.coastline_ids) {
        let element = Element::new(Shape::path(d.as_str())).with_doc_id(id.as_str());
        scene.append(layers.coastline, element)?;
    }
    for ((d, group), id) in batch
        .lake_paths
        .iter()
        .zip(&batch.lake_groups)
        .zip(&batch.lake_ids)
    {
        let target = lake_group(layers, group);
        let element = Element::new(Shape::path(d.as_str())).with_doc_id(id.as_str());
        scene.append(target, element)?;
    }

    log::debug!(
        "Coastline drawn: {} features, {} lakes",
        batch.coastline_paths.len(),
        batch.lake_paths.len()
    );
    Ok(())
}

fn lake_group(layers: &SceneLayers, group: &str) -> LayerKey {
    match group {
        "salt" => layers.salt,
        "freshwater" => layers.freshwater,
        other => {
            log::warn!("Unknown lake group '{other}', using freshwater");
            layers.freshwater
        }
    }
}

/// Remove every generated primitive before a new map is drawn.
///
/// Backdrop rects and texture images stay; the ruler loses everything.
pub fn undraw_all(scene: &mut Scene, layers: &SceneLayers) -> usize {
    let mut removed = 0;
    let ruler = scene.descendants(layers.ruler);
    for key in scene.descendants(layers.viewbox) {
        if ruler.contains(&key) {
            removed += scene.clear_layer(key);
        } else {
            removed += scene.remove_elements_where(key, |e| {
                matches!(
                    e.kind(),
                    ShapeKind::Path
                        | ShapeKind::Polygon
                        | ShapeKind::Circle
                        | ShapeKind::Line
                        | ShapeKind::Text
                        | ShapeKind::Use
                )
            });
        }
    }
    for key in scene.descendants(layers.deftemp) {
        removed += scene.remove_elements_where(key, |e| e.kind() == ShapeKind::Path);
    }
    removed += unfog(scene, layers);
    log::info!("Map undrawn, {removed} elements removed");
    removed
}

/// Lift the fog of war.
pub fn unfog(scene: &mut Scene, layers: &SceneLayers) -> usize {
    let is_path = |e: &Element| e.kind() == ShapeKind::Path;
    let removed = scene.remove_elements_where(layers.fog_mask, is_path)
        + scene.remove_elements_where(layers.fogging, is_path);
    scene.update_layer(layers.fogging, |l| l.set_visible(false));
    removed
}
