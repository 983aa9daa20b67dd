use super::*;
use crate::merge::rule::ElementKind;

#[test]
fn new_frame_buffer_has_only_beauty() {
    let fb = FrameBuffer::new(17, 5);
    assert_eq!((fb.width(), fb.height()), (17, 5));
    assert_eq!(fb.beauty().values().len(), 3 * 64);
    assert!(fb.beauty().is_counted());
    assert!(fb.pixel_info().is_none());
    assert!(fb.heat_map().is_none());
    assert!(fb.weight().is_none());
    assert!(fb.render_buffer_odd().is_none());
    assert!(!fb.render_output_status());
}

#[test]
fn setup_clears_only_on_reenable() {
    let mut fb = FrameBuffer::new(8, 8);
    fb.setup_heat_map();
    fb.heat_map_mut().unwrap().set_pixel(1, 1, 0.5, 2);

    fb.setup_heat_map();
    assert_eq!(fb.heat_map().unwrap().pixel(1, 1), Some((0.5, 2)));

    fb.reset_heat_map();
    assert!(fb.heat_map().is_none());
    fb.setup_heat_map();
    assert_eq!(fb.heat_map().unwrap().pixel(1, 1), Some((0.0, 0)));
    assert_eq!(fb.heat_map().unwrap().active().active_pixel_total(), 0);
}

#[test]
fn uncounted_kinds_report_zero_counts() {
    let mut fb = FrameBuffer::new(8, 8);
    fb.setup_pixel_info();
    fb.setup_weight_buffer();
    let info = fb.pixel_info_mut().unwrap();
    assert!(!info.is_counted());
    assert!(info.set_pixel(0, 0, 12.5, 99));
    assert_eq!(info.pixel(0, 0), Some((12.5, 0)));
    assert!(fb.weight().unwrap().counts().is_none());
}

#[test]
fn init_deactivates_everything() {
    let mut fb = FrameBuffer::new(8, 8);
    fb.setup_render_buffer_odd();
    fb.beauty_mut().set_pixel(3, 3, [1.0; 4], 1);
    fb.get_aov("normal")
        .lock()
        .setup(ElementKind::Float3, 8, 8, [0.0; 4], false);
    assert!(fb.update_render_output_status());

    fb.init(8, 8);
    assert!(fb.render_buffer_odd().is_none());
    assert_eq!(fb.beauty().active().active_pixel_total(), 0);
    assert!(fb.active_aov_names().is_empty());
    assert!(!fb.update_render_output_status());
}

#[test]
fn get_aov_returns_the_same_entry() {
    let fb = FrameBuffer::new(4, 4);
    let a = fb.get_aov("z");
    let b = fb.get_aov("z");
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert!(!a.lock().is_active());
    assert!(fb.find_aov("missing").is_none());
}

#[test]
fn validate_catches_misfit_aov() {
    let fb = FrameBuffer::new(16, 16);
    assert!(fb.validate().is_ok());
    fb.get_aov("bad")
        .lock()
        .setup(ElementKind::Float, 8, 8, [0.0; 4], false);
    let err = fb.validate().unwrap_err();
    assert!(err.to_string().contains("aov 'bad'"));

    fb.get_aov("bad").lock().reset();
    assert!(fb.validate().is_ok());
}

#[test]
fn garbage_collect_frees_inactive_aovs() {
    let fb = FrameBuffer::new(8, 8);
    let aov = fb.get_aov("spare");
    aov.lock().setup(ElementKind::Float4, 8, 8, [0.0; 4], false);
    aov.lock().reset();
    fb.garbage_collect_unused_aovs();
    assert!(aov.lock().buffer().unwrap().values().is_empty());
}
