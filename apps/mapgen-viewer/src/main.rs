//! Headless map viewer.
//!
//! Reads one command per line from stdin, applies it to a `MapView` and
//! prints the result as one JSON line:
//!
//! ```text
//! gesture <scale> <tx> <ty>
//! zoom <factor> <screen-x> <screen-y>
//! pan <dx> <dy>
//! reset-view | reset-style | undo | redo | unfog | undraw | frame
//! hide-labels on|off     auto-coastline on|off     rescale-markers on|off
//! opacity <layer-path> <value>
//! show <layer-path>      hide <layer-path>
//! cells <path-data>
//! marker <symbol> <x> <y> <size>
//! ```
//!
//! Usage: `mapgen-viewer [settings.json]`. Set `RUST_LOG=debug` for scene logs.

use std::io::{self, BufRead, Write};

use mapgen_core::commands::{SetLayerOpacity, SetLayerVisibility};
use mapgen_core::settings::SettingsError;
use mapgen_core::{Point, Scene, SceneError, SceneLayers, StyleSettings};
use mapgen_render::{Gesture, MapView, RedrawHandler};
use serde_json::{json, Value};
use thiserror::Error;

const CANVAS_WIDTH: f64 = 960.0;
const CANVAS_HEIGHT: f64 = 540.0;

#[derive(Error, Debug)]
enum ViewerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },
}

#[derive(Debug, Clone, PartialEq)]
enum ScriptCommand {
    Gesture(Gesture),
    Zoom { factor: f64, at: Point },
    Pan { dx: f64, dy: f64 },
    ResetView,
    ResetStyle,
    Undo,
    Redo,
    Unfog,
    Undraw,
    Frame,
    HideLabels(bool),
    AutoCoastline(bool),
    RescaleMarkers(bool),
    Opacity { layer: String, value: f32 },
    Visibility { layer: String, visible: bool },
    Cells(String),
    Marker { symbol: String, at: Point, size: f32 },
}

fn parse_line(line_no: usize, line: &str) -> Result<Option<ScriptCommand>, ViewerError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let err = |message: String| ViewerError::Parse {
        line: line_no,
        message,
    };
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let args: Vec<&str> = rest.split_whitespace().collect();

    let num = |i: usize| -> Result<f64, ViewerError> {
        let raw = args
            .get(i)
            .ok_or_else(|| err(format!("'{word}' expects argument {}", i + 1)))?;
        raw.parse::<f64>()
            .map_err(|_| err(format!("'{raw}' is not a number")))
    };
    let text = |i: usize| -> Result<String, ViewerError> {
        args.get(i)
            .map(|s| s.to_string())
            .ok_or_else(|| err(format!("'{word}' expects argument {}", i + 1)))
    };
    let toggle = || -> Result<bool, ViewerError> {
        match args.first().copied() {
            Some("on") => Ok(true),
            Some("off") => Ok(false),
            _ => Err(err(format!("'{word}' expects on or off"))),
        }
    };

    let command = match word {
        "gesture" => ScriptCommand::Gesture(Gesture {
            scale: num(0)?,
            translate_x: num(1)?,
            translate_y: num(2)?,
        }),
        "zoom" => ScriptCommand::Zoom {
            factor: num(0)?,
            at: Point::new(num(1)?, num(2)?),
        },
        "pan" => ScriptCommand::Pan {
            dx: num(0)?,
            dy: num(1)?,
        },
        "reset-view" => ScriptCommand::ResetView,
        "reset-style" => ScriptCommand::ResetStyle,
        "undo" => ScriptCommand::Undo,
        "redo" => ScriptCommand::Redo,
        "unfog" => ScriptCommand::Unfog,
        "undraw" => ScriptCommand::Undraw,
        "frame" => ScriptCommand::Frame,
        "hide-labels" => ScriptCommand::HideLabels(toggle()?),
        "auto-coastline" => ScriptCommand::AutoCoastline(toggle()?),
        "rescale-markers" => ScriptCommand::RescaleMarkers(toggle()?),
        "opacity" => ScriptCommand::Opacity {
            layer: text(0)?,
            value: num(1)? as f32,
        },
        "show" | "hide" => ScriptCommand::Visibility {
            layer: text(0)?,
            visible: word == "show",
        },
        "cells" if !rest.trim().is_empty() => ScriptCommand::Cells(rest.trim().to_string()),
        "marker" => ScriptCommand::Marker {
            symbol: text(0)?,
            at: Point::new(num(1)?, num(2)?),
            size: num(3)? as f32,
        },
        other => return Err(err(format!("unknown command '{other}'"))),
    };
    Ok(Some(command))
}

/// Logs the redraws a style reset requests; this viewer has no generator.
struct LogRedraw;

impl RedrawHandler for LogRedraw {
    fn redraw_heightmap(&mut self, _scene: &mut Scene, _layers: &SceneLayers) {
        log::info!("Heightmap redraw requested");
    }

    fn redraw_legend(&mut self, _scene: &mut Scene, _layers: &SceneLayers) {
        log::info!("Legend redraw requested");
    }
}

fn run_command(map: &mut MapView, command: ScriptCommand) -> Result<Value, ViewerError> {
    let value = match command {
        ScriptCommand::Gesture(g) => serde_json::to_value(map.handle_gesture(g))?,
        ScriptCommand::Zoom { factor, at } => serde_json::to_value(map.zoom_at(factor, at))?,
        ScriptCommand::Pan { dx, dy } => serde_json::to_value(map.pan(dx, dy))?,
        ScriptCommand::ResetView => serde_json::to_value(map.reset_view())?,
        ScriptCommand::ResetStyle => serde_json::to_value(map.reset_style(&mut LogRedraw))?,
        ScriptCommand::Undo => json!({ "undone": map.undo_style() }),
        ScriptCommand::Redo => json!({ "redone": map.redo_style() }),
        ScriptCommand::Unfog => json!({ "removed": map.unfog() }),
        ScriptCommand::Undraw => json!({ "removed": map.undraw_all() }),
        ScriptCommand::Frame => serde_json::to_value(map.frame())?,
        ScriptCommand::HideLabels(on) => serde_json::to_value(map.set_hide_labels(on))?,
        ScriptCommand::AutoCoastline(on) => serde_json::to_value(map.set_auto_coastline(on))?,
        ScriptCommand::RescaleMarkers(on) => serde_json::to_value(map.set_rescale_markers(on))?,
        ScriptCommand::Opacity { layer, value } => {
            let key = map.scene().resolve(&layer)?;
            let rescale = map.apply_style_command(Box::new(SetLayerOpacity::new(key, Some(value))));
            json!({ "layer": layer, "opacity": value, "rescale": rescale })
        }
        ScriptCommand::Visibility { layer, visible } => {
            let key = map.scene().resolve(&layer)?;
            let rescale = map.apply_style_command(Box::new(SetLayerVisibility::new(key, visible)));
            json!({ "layer": layer, "visible": visible, "rescale": rescale })
        }
        ScriptCommand::Cells(path) => json!({ "element": map.draw_cells(&path)? }),
        ScriptCommand::Marker { symbol, at, size } => {
            json!({ "element": map.add_marker(&symbol, at, size)? })
        }
    };
    Ok(value)
}

fn run() -> Result<(), ViewerError> {
    let settings = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading style settings from {path}");
            StyleSettings::load(&path)?
        }
        None => StyleSettings::default(),
    };
    let mut map = MapView::new(settings, CANVAS_WIDTH, CANVAS_HEIGHT);

    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    for (i, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let Some(command) = parse_line(i + 1, &line)? else {
            continue;
        };
        log::debug!("{command:?}");
        let value = match run_command(&mut map, command) {
            Ok(value) => value,
            // A bad layer path should not end the session.
            Err(ViewerError::Scene(e)) => {
                log::warn!("Line {}: {e}", i + 1);
                json!({ "error": e.to_string() })
            }
            Err(e) => return Err(e),
        };
        writeln!(out, "{value}")?;
    }
    Ok(())
}

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    log::info!("mapgen-viewer v{}", env!("CARGO_PKG_VERSION"));
    if let Err(e) = run() {
        log::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
