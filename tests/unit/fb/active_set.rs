use std::sync::{Arc, Barrier};

use super::*;

#[test]
fn concurrent_first_access_allocates_once() {
    let set = FbActivePixels::new();
    let barrier = Barrier::new(8);
    let (set_ref, barrier) = (&set, &barrier);
    let handles: Vec<_> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(move || {
                    let set = set_ref;
                    barrier.wait();
                    set.get_aov("beauty_aux")
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(set.aov_names(), vec!["beauty_aux".to_owned()]);
    for h in &handles[1..] {
        assert!(Arc::ptr_eq(&handles[0], h));
    }
    assert!(handles[0].lock().is_active());
}

#[test]
fn init_disables_kinds_and_soft_resets_aovs() {
    let mut set = FbActivePixels::new();
    set.init(16, 16);
    set.init_heat_map();
    set.get_aov("depth").lock().init(16, 16);
    assert!(set.is_heat_map_enabled());
    assert!(set.render_output_status());

    set.init(16, 16);
    assert!(set.heat_map().is_none());
    assert!(!set.render_output_status());
    // storage survives the soft reset
    let depth = set.find_aov("depth").unwrap();
    assert_eq!(depth.lock().active_pixels().unwrap().num_tiles(), 4);
}

#[test]
fn init_kind_clears_previous_mask() {
    let mut set = FbActivePixels::new();
    set.init(8, 8);
    set.init_weight_buffer();
    set.weight.pixels_mut().set_tile_mask(0, 0xff);
    set.init_weight_buffer();
    assert_eq!(set.weight().unwrap().active_pixel_total(), 0);
}

#[test]
fn update_status_resets_failing_entries() {
    let set = FbActivePixels::new();
    set.get_aov("a");
    set.get_aov("b");
    set.get_aov("c");
    set.update_render_output_status(|name, _| name != "b");

    let mut seen = Vec::new();
    let visited = set.active_render_output_crawler(|aov| seen.push(aov.name().to_owned()));
    assert_eq!(visited, 2);
    assert_eq!(seen, vec!["a", "c"]);
}

#[test]
fn reference_entries_hold_no_mask() {
    let set = FbActivePixels::new();
    let aov = set.get_aov("alpha");
    aov.lock().init(32, 32);
    aov.lock().init_reference(ReferenceKind::Alpha);
    assert!(aov.lock().active_pixels().is_none());
    assert_eq!(aov.lock().reference(), Some(ReferenceKind::Alpha));
    assert!(set.show_all_aov().contains("reference Alpha"));
}

#[test]
fn garbage_collect_drops_inactive_masks() {
    let set = FbActivePixels::new();
    let keep = set.get_aov("keep");
    keep.lock().init(8, 8);
    let drop = set.get_aov("drop");
    drop.lock().init(8, 8);
    drop.lock().reset();

    set.garbage_collect_unused_aovs();
    assert_eq!(keep.lock().active_pixels().unwrap().num_tiles(), 1);
    assert_eq!(drop.lock().active_pixels().unwrap().num_tiles(), 0);
}
