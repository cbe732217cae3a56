use super::*;

#[test]
fn default_config_serializes_and_validates() {
    let cfg = CompileConfig::default();
    let json = serde_json::to_string(&cfg).expect("serialize default config");
    let de: CompileConfig = serde_json::from_str(&json).expect("deserialize default config");
    de.validate().expect("default config should validate");
    assert_eq!(de, cfg);
}

#[test]
fn partial_json_fills_defaults() {
    let cfg = CompileConfig::from_json_str(r#"{ "bundle_size": 4, "tile_size": 512 }"#)
        .expect("partial config");
    assert_eq!(cfg.bundle_size, 4);
    assert_eq!(cfg.tile_size, 512);
    assert_eq!(cfg.default_repeat_distance, 256.0);
    assert_eq!(cfg.time_budget(), Duration::from_millis(8));
}

#[test]
fn rejects_zero_bundle_size() {
    let cfg = CompileConfig {
        bundle_size: 0,
        ..Default::default()
    };
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("bundle_size"));
}

#[test]
fn rejects_zero_retries() {
    let err = CompileConfig::from_json_str(r#"{ "max_resource_retries": 0 }"#).unwrap_err();
    assert!(matches!(err, CompileError::Config(_)));
}

#[test]
fn rejects_non_power_of_two_tiles() {
    let cfg = CompileConfig {
        tile_size: 300,
        ..Default::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn malformed_json_is_a_json_error() {
    let err = CompileConfig::from_json_str("{ bundle_size: }").unwrap_err();
    assert_eq!(err.category(), "JSON");
}
