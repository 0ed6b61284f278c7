use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layer::Color;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Heightmap rendering parameters exposed in the style editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightmapStyle {
    pub scheme: String,
    pub terracing: u8,
    /// Height step between drawn contour layers.
    pub skip: u8,
    pub simplification: u8,
    pub curve: u8,
}

impl Default for HeightmapStyle {
    fn default() -> Self {
        Self {
            scheme: "bright".to_string(),
            terracing: 0,
            skip: 5,
            simplification: 0,
            curve: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendStyle {
    pub background: Color,
    pub opacity: f32,
    pub column_items: u32,
}

impl Default for LegendStyle {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            opacity: 0.8,
            column_items: 8,
        }
    }
}

/// Style parameters owned by the UI. The baseline reads them and resets the
/// resettable ones; the rescaler reads the toggles and the halo width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSettings {
    pub heightmap: HeightmapStyle,
    pub legend: LegendStyle,
    /// Base stroke width of the state halo at scale 1.
    pub states_halo_width: f32,
    /// Switch the coastline filter with zoom.
    pub auto_coastline: bool,
    pub rescale_markers: bool,
    /// Hide labels whose on-screen size leaves the legible band.
    pub hide_labels: bool,
    /// Filter id applied to the ocean texture tile.
    pub ocean_pattern: String,
    /// Number of regions requested from the generator. Read only here; label
    /// sizes shrink as it grows.
    pub regions: u32,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            heightmap: HeightmapStyle::default(),
            legend: LegendStyle::default(),
            states_halo_width: 10.0,
            auto_coastline: true,
            rescale_markers: true,
            hide_labels: true,
            ocean_pattern: "pattern1".to_string(),
            regions: 15,
        }
    }
}

impl StyleSettings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
