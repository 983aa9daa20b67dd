use super::*;

#[test]
fn setup_allocates_with_default_value() {
    let mut aov = FbAov::new("normal");
    assert!(!aov.is_active());
    aov.setup(ElementKind::Float3, 12, 9, [0.5, 0.5, 1.0, 0.0], true);
    assert!(aov.is_active());
    assert!(aov.closest_filter());

    let buf = aov.buffer().unwrap();
    assert_eq!(buf.kind(), ElementKind::Float3);
    assert_eq!(buf.geometry().tile_total(), 4);
    assert_eq!(buf.pixel(11, 8), Some(([0.5, 0.5, 1.0, 0.0], 0)));
    assert_eq!(buf.active().active_pixel_total(), 0);
}

#[test]
fn setup_keeps_pixels_while_active_and_clears_on_reactivation() {
    let mut aov = FbAov::new("depth");
    aov.setup(ElementKind::Float, 8, 8, [0.0; 4], false);
    aov.buffer_mut().unwrap().set_pixel(2, 3, [4.0; 4], 7);

    aov.setup(ElementKind::Float, 8, 8, [0.0; 4], false);
    assert_eq!(aov.buffer().unwrap().pixel(2, 3), Some(([4.0, 0.0, 0.0, 0.0], 7)));

    aov.reset();
    assert!(!aov.is_active());
    assert!(aov.buffer().is_some());
    aov.setup(ElementKind::Float, 8, 8, [1.0; 4], false);
    assert_eq!(aov.buffer().unwrap().pixel(2, 3), Some(([1.0, 0.0, 0.0, 0.0], 0)));
}

#[test]
fn format_change_reallocates() {
    let mut aov = FbAov::new("uv");
    aov.setup(ElementKind::Float2, 8, 8, [0.0; 4], false);
    aov.setup(ElementKind::Float4, 16, 8, [0.0; 4], false);
    let buf = aov.buffer().unwrap();
    assert_eq!(buf.kind(), ElementKind::Float4);
    assert_eq!(buf.values().len(), 128);
}

#[test]
fn reference_holds_no_pixels() {
    let mut aov = FbAov::new("alpha");
    aov.setup(ElementKind::Float, 64, 64, [0.0; 4], false);
    aov.setup_reference(ReferenceKind::Alpha);
    assert!(aov.is_active());
    assert!(aov.buffer().is_none());
    assert_eq!(aov.reference(), Some(ReferenceKind::Alpha));
}

#[test]
fn garbage_collect_frees_only_inactive() {
    let mut aov = FbAov::new("albedo");
    aov.setup(ElementKind::Float3, 32, 32, [0.0; 4], false);
    aov.garbage_collect_unused();
    assert_eq!(aov.buffer().unwrap().values().len(), 16 * 64);

    aov.reset();
    aov.garbage_collect_unused();
    assert!(aov.buffer().unwrap().values().is_empty());
}

#[test]
fn set_pixel_outside_image_is_rejected() {
    let mut buf = AovBuffer::new(ElementKind::Float, 5, 5, [0.0; 4]);
    assert!(!buf.set_pixel(5, 0, [1.0; 4], 1));
    assert!(buf.set_pixel(4, 4, [1.0; 4], 1));
    assert_eq!(buf.active().active_pixel_total(), 1);
}
