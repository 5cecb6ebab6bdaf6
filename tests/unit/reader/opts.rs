use super::*;

#[test]
fn defaults_are_valid() {
    let opts = ReaderOpts::default();
    opts.validate().unwrap();
    assert_eq!(opts.preview_max_width, 64);
    assert_eq!(opts.render_threads, None);
    assert_eq!(opts.pixel_cache_mb, 256);
    assert_eq!(opts.pixel_cache_bytes(), DEFAULT_PIXEL_CACHE_BYTES);
}

#[test]
fn pixel_budget_converts_to_bytes() {
    let opts = ReaderOpts::from_json_str(r#"{ "pixel_cache_mb": 3 }"#).unwrap();
    assert_eq!(opts.pixel_cache_bytes(), 3 * 1024 * 1024);
    let huge = ReaderOpts {
        pixel_cache_mb: usize::MAX,
        ..ReaderOpts::default()
    };
    assert_eq!(huge.pixel_cache_bytes(), usize::MAX);
}

#[test]
fn partial_json_keeps_defaults() {
    let opts = ReaderOpts::from_json_str(r#"{ "preview_max_width": 200 }"#).unwrap();
    assert_eq!(opts.preview_max_width, 200);
    assert_eq!(opts.preview_max_height, 64);
}

#[test]
fn rejects_invalid_values() {
    assert!(ReaderOpts::from_json_str(r#"{ "preview_max_height": 0 }"#).is_err());
    assert!(ReaderOpts::from_json_str(r#"{ "render_threads": 0 }"#).is_err());
    assert!(ReaderOpts::from_json_str(r#"{ "preview_size": 3 }"#).is_err());
    assert!(ReaderOpts::from_json_str("not json").is_err());
}

#[test]
fn missing_file_is_validation_error() {
    let err = ReaderOpts::from_path("/definitely/not/here/opts.json").unwrap_err();
    assert!(matches!(err, SeqError::Validation(_)));
}
