use serde::{Deserialize, Serialize};

use crate::element::{Element, Shape};
use crate::layer::{LayerKey, Mask, Paint, Style};
use crate::scene::Scene;

/// Keys of every layer the builder creates, named after the layer they address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneLayers {
    pub map: LayerKey,
    pub deftemp: LayerKey,
    pub fog_mask: LayerKey,
    pub land_mask: LayerKey,
    pub water_mask: LayerKey,
    pub oceanic: LayerKey,
    pub viewbox: LayerKey,
    pub ocean: LayerKey,
    pub ocean_layers: LayerKey,
    pub ocean_pattern: LayerKey,
    pub lakes: LayerKey,
    pub freshwater: LayerKey,
    pub salt: LayerKey,
    pub landmass: LayerKey,
    pub texture: LayerKey,
    pub terrs: LayerKey,
    pub biomes: LayerKey,
    pub cells: LayerKey,
    pub grid_overlay: LayerKey,
    pub coordinates: LayerKey,
    pub compass: LayerKey,
    pub rivers: LayerKey,
    pub terrain: LayerKey,
    pub relig: LayerKey,
    pub cults: LayerKey,
    pub regions: LayerKey,
    pub states_body: LayerKey,
    pub states_halo: LayerKey,
    pub provs: LayerKey,
    pub zones: LayerKey,
    pub borders: LayerKey,
    pub state_borders: LayerKey,
    pub province_borders: LayerKey,
    pub routes: LayerKey,
    pub roads: LayerKey,
    pub trails: LayerKey,
    pub searoutes: LayerKey,
    pub temperature: LayerKey,
    pub coastline: LayerKey,
    pub prec: LayerKey,
    pub population: LayerKey,
    pub rural: LayerKey,
    pub urban: LayerKey,
    pub labels: LayerKey,
    pub state_labels: LayerKey,
    pub added_labels: LayerKey,
    pub burg_labels: LayerKey,
    pub burg_labels_cities: LayerKey,
    pub burg_labels_towns: LayerKey,
    pub icons: LayerKey,
    pub burg_icons: LayerKey,
    pub burg_icons_cities: LayerKey,
    pub burg_icons_towns: LayerKey,
    pub anchors: LayerKey,
    pub anchors_cities: LayerKey,
    pub anchors_towns: LayerKey,
    pub markers: LayerKey,
    pub fogging_cont: LayerKey,
    pub fogging: LayerKey,
    pub ruler: LayerKey,
    pub debug: LayerKey,
    pub scale_bar: LayerKey,
    pub legend: LayerKey,
}

/// Build the full layer hierarchy. Creation order is paint order.
///
/// Only empty containers are created; no map data is drawn. Layers that start
/// hidden (`zones`, `prec`, `markers`, `fogging`, `ruler`) get `display: none`.
pub fn build_scene() -> (Scene, SceneLayers) {
    let mut scene = Scene::new("map");
    let map = scene.root();

    let deftemp = scene.push_child(map, "deftemp");
    let fog_mask = scene.push_child(deftemp, "fog");
    let land_mask = scene.push_child(deftemp, "land");
    let water_mask = scene.push_child(deftemp, "water");
    let oceanic = scene.push_child(deftemp, "oceanic");

    let viewbox = scene.push_child(map, "viewbox");
    let ocean = scene.push_child(viewbox, "ocean");
    let ocean_layers = scene.push_child(ocean, "oceanLayers");
    let ocean_pattern = scene.push_child(ocean, "oceanPattern");
    let lakes = scene.push_child(viewbox, "lakes");
    let landmass = scene.push_child(viewbox, "landmass");
    let texture = scene.push_child(viewbox, "texture");
    let terrs = scene.push_child(viewbox, "terrs");
    let biomes = scene.push_child(viewbox, "biomes");
    let cells = scene.push_child(viewbox, "cells");
    let grid_overlay = scene.push_child(viewbox, "gridOverlay");
    let coordinates = scene.push_child(viewbox, "coordinates");
    let compass = scene.push_child(viewbox, "compass");
    let rivers = scene.push_child(viewbox, "rivers");
    let terrain = scene.push_child(viewbox, "terrain");
    let relig = scene.push_child(viewbox, "relig");
    let cults = scene.push_child(viewbox, "cults");
    let regions = scene.push_child(viewbox, "regions");
    let states_body = scene.push_child(regions, "statesBody");
    let states_halo = scene.push_child(regions, "statesHalo");
    let provs = scene.push_child(viewbox, "provs");
    let zones = scene.push_child(viewbox, "zones");
    let borders = scene.push_child(viewbox, "borders");
    let state_borders = scene.push_child(borders, "stateBorders");
    let province_borders = scene.push_child(borders, "provinceBorders");
    let routes = scene.push_child(viewbox, "routes");
    let roads = scene.push_child(routes, "roads");
    let trails = scene.push_child(routes, "trails");
    let searoutes = scene.push_child(routes, "searoutes");
    let temperature = scene.push_child(viewbox, "temperature");
    let coastline = scene.push_child(viewbox, "coastline");
    let prec = scene.push_child(viewbox, "prec");
    let population = scene.push_child(viewbox, "population");
    let labels = scene.push_child(viewbox, "labels");
    let icons = scene.push_child(viewbox, "icons");
    let burg_icons = scene.push_child(icons, "burgIcons");
    let anchors = scene.push_child(icons, "anchors");
    let markers = scene.push_child(viewbox, "markers");
    let fogging_cont = scene.push_child(viewbox, "fogging-cont");
    let fogging = scene.push_child(fogging_cont, "fogging");
    let ruler = scene.push_child(viewbox, "ruler");
    let debug = scene.push_child(viewbox, "debug");

    let scale_bar = scene.push_child(map, "scaleBar");
    let legend = scene.push_child(map, "legend");

    let freshwater = scene.push_child(lakes, "freshwater");
    let salt = scene.push_child(lakes, "salt");

    let state_labels = scene.push_child(labels, "states");
    let added_labels = scene.push_child(labels, "addedLabels");
    let burg_labels = scene.push_child(labels, "burgLabels");

    let burg_icons_cities = scene.push_child(burg_icons, "cities");
    let burg_labels_cities = scene.push_child(burg_labels, "cities");
    let anchors_cities = scene.push_child(anchors, "cities");
    let burg_icons_towns = scene.push_child(burg_icons, "towns");
    let burg_labels_towns = scene.push_child(burg_labels, "towns");
    let anchors_towns = scene.push_child(anchors, "towns");

    let rural = scene.push_child(population, "rural");
    let urban = scene.push_child(population, "urban");

    for hidden in [zones, prec, markers, fogging, ruler] {
        scene.update_layer(hidden, |l| l.set_visible(false));
    }
    scene.update_layer(fogging_cont, |l| l.style.mask = Some(Mask::Fog));

    let layers = SceneLayers {
        map,
        deftemp,
        fog_mask,
        land_mask,
        water_mask,
        oceanic,
        viewbox,
        ocean,
        ocean_layers,
        ocean_pattern,
        lakes,
        freshwater,
        salt,
        landmass,
        texture,
        terrs,
        biomes,
        cells,
        grid_overlay,
        coordinates,
        compass,
        rivers,
        terrain,
        relig,
        cults,
        regions,
        states_body,
        states_halo,
        provs,
        zones,
        borders,
        state_borders,
        province_borders,
        routes,
        roads,
        trails,
        searoutes,
        temperature,
        coastline,
        prec,
        population,
        rural,
        urban,
        labels,
        state_labels,
        added_labels,
        burg_labels,
        burg_labels_cities,
        burg_labels_towns,
        icons,
        burg_icons,
        burg_icons_cities,
        burg_icons_towns,
        anchors,
        anchors_cities,
        anchors_towns,
        markers,
        fogging_cont,
        fogging,
        ruler,
        debug,
        scale_bar,
        legend,
    };

    log::info!("Scene built with {} layers", scene.layer_count());
    (scene, layers)
}

/// Insert the full-map backdrop that every map needs regardless of generated
/// data: landmass and ocean base rects, the ocean texture, the fog cover, the
/// texture pattern tile and the compass rose.
pub fn init_backdrop(scene: &mut Scene, layers: &SceneLayers, width: f64, height: f64) {
    let full = || Shape::rect(0.0, 0.0, width, height);
    for (key, element) in [
        (layers.landmass, Element::new(full())),
        (
            layers.ocean_pattern,
            Element::new(full()).with_style(
                Style::new().with_fill(Paint::pattern("oceanic")),
            ),
        ),
        (layers.ocean_layers, Element::new(full()).with_doc_id("oceanBase")),
        (layers.fogging, Element::new(full())),
        (layers.oceanic, Element::new(full())),
        (
            layers.compass,
            Element::new(Shape::Use {
                href: "#defs-compass-rose".to_string(),
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
            })
            .with_doc_id("rose"),
        ),
    ] {
        scene.clear_layer(key);
        if let Err(e) = scene.append(key, element) {
            log::warn!("Backdrop not placed: {e}");
        }
    }
    log::debug!("Backdrop initialised for {width}x{height} map");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ShapeKind;

    #[test]
    fn test_viewbox_children_in_paint_order() {
        let (scene, layers) = build_scene();
        let names: Vec<&str> = scene
            .children(layers.viewbox)
            .iter()
            .map(|k| scene.layer(*k).unwrap().name.as_str())
            .collect();
        assert_eq!(names.first(), Some(&"ocean"));
        assert_eq!(names.last(), Some(&"debug"));
        let labels_pos = names.iter().position(|n| *n == "labels").unwrap();
        let coast_pos = names.iter().position(|n| *n == "coastline").unwrap();
        assert!(coast_pos < labels_pos);
    }

    #[test]
    fn test_cities_resolved_per_parent() {
        let (scene, layers) = build_scene();
        assert_eq!(
            scene.resolve("viewbox/labels/burgLabels/cities").unwrap(),
            layers.burg_labels_cities
        );
        assert_eq!(
            scene.resolve("viewbox/icons/anchors/cities").unwrap(),
            layers.anchors_cities
        );
        assert_ne!(layers.burg_labels_cities, layers.anchors_cities);
    }

    #[test]
    fn test_initially_hidden_layers() {
        let (scene, layers) = build_scene();
        for key in [layers.zones, layers.prec, layers.markers, layers.fogging, layers.ruler] {
            assert!(!scene.is_displayed(key));
        }
        assert!(scene.is_displayed(layers.labels));
        assert_eq!(scene.layer(layers.fogging_cont).unwrap().style.mask, Some(Mask::Fog));
    }

    #[test]
    fn test_build_draws_nothing() {
        let (scene, _) = build_scene();
        assert_eq!(scene.element_count(), 0);
    }

    #[test]
    fn test_backdrop_is_idempotent() {
        let (mut scene, layers) = build_scene();
        init_backdrop(&mut scene, &layers, 1000.0, 800.0);
        init_backdrop(&mut scene, &layers, 1000.0, 800.0);
        let ocean_base = &scene.layer(layers.ocean_layers).unwrap().elements()[0];
        assert_eq!(ocean_base.doc_id.as_deref(), Some("oceanBase"));
        assert_eq!(ocean_base.kind(), ShapeKind::Rect);
        assert_eq!(scene.element_count(), 6);
        assert_eq!(scene.layer(layers.compass).unwrap().elements()[0].kind(), ShapeKind::Use);
    }
}
