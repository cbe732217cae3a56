// tests/geojson_styles.rs
// Features and styles loaded from JSON documents, compiled with a JSON config.

use serde_json::json;
use std::sync::Arc;
use vtforge::style::Unit;
use vtforge::{
    AcceptAll, CompileConfig, CompileError, CompileTask, Feature, FeatureId, Geometry,
    PrimitiveKind, RenderSession, StepOutcome, StyleGroup, Tile,
};

fn roads_style() -> StyleGroup {
    StyleGroup::from_json(&json!([
        { "type": "Line", "stroke": "#ff0000", "strokeWidth": { "10": "2px", "16": "8px" } },
        { "type": "Line", "stroke": "#ffffff", "strokeWidth": "12m", "zIndex": 2 }
    ]))
    .unwrap()
}

#[test]
fn geojson_features_compile_with_json_styles() {
    let road = Feature::from_geojson(&json!({
        "type": "Feature",
        "id": "r-1",
        "properties": { "class": "primary" },
        "geometry": {
            "type": "LineString",
            "coordinates": [[0.001, 0.001], [0.004, 0.004]]
        }
    }))
    .unwrap();
    assert_eq!(road.id, FeatureId::Str("r-1".to_string()));
    assert_eq!(road.property("class"), Some(&json!("primary")));

    let config = CompileConfig::from_json_str(r#"{ "bundle_size": 8 }"#).unwrap();
    let mut session = RenderSession::new(&config);
    let style = Arc::new(roads_style());
    let tile = Tile::new(32768, 32767, 16, 256);
    let mut task = CompileTask::new(
        tile.clone(),
        vec![road],
        move |_: &Feature, _: u8| Some(Arc::clone(&style)),
        config,
    )
    .unwrap();
    let StepOutcome::Done(compiled) = task.run(&mut session, &mut AcceptAll::default()).unwrap()
    else {
        panic!("expected the tile to compile");
    };

    let lines: Vec<_> = compiled.groups_of(PrimitiveKind::Line).collect();
    assert_eq!(lines.len(), 2);
    // Grid zoom 16 sits on the last stop; zIndex 2 draws last.
    assert_eq!(lines[0].uniforms.stroke_width, 8.0);
    assert_eq!(lines[0].uniforms.unit, Unit::Pixel);
    assert_eq!(lines[1].uniforms.stroke_width, 12.0);
    assert_eq!(lines[1].uniforms.unit, Unit::Meter);
    assert!((lines[1].unit_scale - tile.pixels_per_meter() as f32).abs() < 1e-6);
}

#[test]
fn geojson_polygon_drops_closing_vertex() {
    let park = Feature::from_geojson(&json!({
        "type": "Feature",
        "id": 12,
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]
        }
    }))
    .unwrap();
    let Geometry::Polygon(polygon) = &park.geometry else {
        panic!("expected a polygon");
    };
    assert_eq!(polygon.exterior().len(), 4);
    assert_eq!(park.id, FeatureId::Int(12));
}

#[test]
fn malformed_documents_are_errors() {
    let err = Feature::from_geojson(&json!({
        "type": "Feature",
        "id": 1,
        "geometry": { "type": "Circle", "coordinates": [0, 0] }
    }))
    .unwrap_err();
    assert!(matches!(err, CompileError::Geometry(_)));

    let err = StyleGroup::from_json(&json!("Line")).unwrap_err();
    assert!(matches!(err, CompileError::Style(_)));

    let err = CompileConfig::from_json_str(r#"{ "tile_size": 300 }"#).unwrap_err();
    assert!(matches!(err, CompileError::Config(_)));

    let err = CompileConfig::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, CompileError::Json(_)));
}
