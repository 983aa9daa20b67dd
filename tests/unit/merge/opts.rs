use super::*;

#[test]
fn defaults_are_parallel_with_grain_64() {
    let opts = MergeOpts::default();
    assert!(opts.parallel);
    assert_eq!(opts.threads, None);
    assert_eq!(opts.tile_grain, 64);
    assert!(!MergeOpts::sequential().parallel);
}

#[test]
fn json_fills_missing_fields() {
    let opts = MergeOpts::from_json_str(r#"{ "threads": 2 }"#).unwrap();
    assert_eq!(opts.threads, Some(2));
    assert!(opts.parallel);
    assert_eq!(opts.tile_grain, 64);

    let opts = MergeOpts::from_json_str("{}").unwrap();
    assert_eq!(opts, MergeOpts::default());
}

#[test]
fn zero_threads_is_rejected() {
    let err = MergeOpts::from_json_str(r#"{ "threads": 0 }"#).unwrap_err();
    assert!(matches!(err, MergeError::Validation(_)));
    assert!(build_thread_pool(Some(0)).is_err());
}

#[test]
fn malformed_json_is_a_validation_error() {
    let err = MergeOpts::from_json_str("{ parallel: yes }").unwrap_err();
    assert!(err.to_string().starts_with("validation error:"));
}

#[test]
fn pool_honors_thread_count() {
    let pool = build_thread_pool(Some(3)).unwrap();
    assert_eq!(pool.current_num_threads(), 3);
}

#[test]
fn zero_grain_is_clamped() {
    let opts = MergeOpts {
        tile_grain: 0,
        ..MergeOpts::default()
    };
    assert_eq!(opts.grain(), 1);
}
