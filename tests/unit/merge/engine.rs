use super::*;
use crate::merge::rule::ElementKind;

struct Counted {
    values: Vec<f32>,
    counts: Vec<u32>,
    mask: ActivePixels,
}

impl Counted {
    fn new(w: u32, h: u32) -> Self {
        let mask = ActivePixels::new(w, h);
        let n = mask.num_tiles() * TILE_PIXELS;
        Self {
            values: vec![0.0; n],
            counts: vec![0; n],
            mask,
        }
    }

    fn put(&mut self, x: u32, y: u32, v: f32, count: u32) {
        let off = self.mask.geometry().tiled_offset(x, y).unwrap();
        self.values[off] = v;
        self.counts[off] = count;
        self.mask.set_active_pixel(x, y);
    }

    fn src(&self) -> SrcLayer<'_, [f32]> {
        SrcLayer {
            values: &self.values,
            counts: Some(&self.counts),
            mask: &self.mask,
        }
    }

    fn dst(&mut self) -> DstLayer<'_, [f32]> {
        DstLayer {
            values: &mut self.values,
            counts: Some(&mut self.counts),
            mask: &mut self.mask,
        }
    }
}

fn both_modes() -> [MergeOpts; 2] {
    [
        MergeOpts {
            tile_grain: 1,
            ..MergeOpts::default()
        },
        MergeOpts::sequential(),
    ]
}

#[test]
fn second_merge_of_same_source_reports_nothing() {
    for opts in both_modes() {
        let mut src = Counted::new(20, 13);
        src.put(0, 0, 1.0, 1);
        src.put(19, 12, 2.0, 3);
        src.put(9, 4, 0.25, 2);
        let mut dst = Counted::new(20, 13);
        let mut out = ActivePixels::default();

        let first = snapshot_delta(dst.dst(), src.src(), &mut out, &opts).unwrap();
        assert_eq!(first, 3);
        assert_eq!(out.active_pixel_total(), 3);
        assert!(out.is_active_pixel(19, 12));
        assert_eq!(dst.mask, src.mask);

        let second = snapshot_delta(dst.dst(), src.src(), &mut out, &opts).unwrap();
        assert_eq!(second, 0);
        assert_eq!(out.active_pixel_total(), 0);
    }
}

#[test]
fn out_tiles_are_overwritten_not_accumulated() {
    let mut src = Counted::new(16, 8);
    src.put(1, 1, 1.0, 1);
    let mut dst = Counted::new(16, 8);
    let mut out = ActivePixels::new(16, 8);
    out.set_tile_mask(1, u64::MAX);
    snapshot_delta(dst.dst(), src.src(), &mut out, &MergeOpts::sequential()).unwrap();
    assert_eq!(out.tile_mask(0), 1 << 9);
    assert_eq!(out.tile_mask(1), 0);
}

#[test]
fn dimension_mismatch_leaves_destination_untouched() {
    let mut src = Counted::new(16, 16);
    src.put(3, 3, 1.0, 1);
    let mut dst = Counted::new(8, 16);
    dst.put(1, 1, 5.0, 9);
    let before_values = dst.values.clone();
    let before_mask = dst.mask.clone();
    let mut out = ActivePixels::default();

    let err = snapshot_delta(dst.dst(), src.src(), &mut out, &MergeOpts::default()).unwrap_err();
    assert!(matches!(
        err,
        MergeError::DimensionMismatch {
            src_width: 16,
            dst_width: 8,
            ..
        }
    ));
    assert_eq!(dst.values, before_values);
    assert_eq!(dst.mask, before_mask);
    assert!(!out.is_active());
}

#[test]
fn padding_bits_never_reach_the_destination() {
    let mut src = Counted::new(10, 10);
    // a caller that scribbles into the padding area
    src.mask.set_tile_mask(1, u64::MAX);
    src.counts.iter_mut().for_each(|c| *c = 1);
    src.values.iter_mut().for_each(|v| *v = 1.0);
    let mut dst = Counted::new(10, 10);
    let mut out = ActivePixels::default();
    snapshot_delta(dst.dst(), src.src(), &mut out, &MergeOpts::default()).unwrap();

    let valid = dst.mask.tile_valid_mask(1);
    assert_eq!(dst.mask.tile_mask(1), valid);
    assert_eq!(out.tile_mask(1), valid);
    assert_eq!(dst.values[64 + 2], 0.0);
    assert_eq!(dst.values[64 + 1], 1.0);
}

#[test]
fn mismatched_count_layout_is_rejected() {
    let src = Counted::new(8, 8);
    let mut dst = Counted::new(8, 8);
    let layer = SrcLayer {
        counts: None,
        ..src.src()
    };
    let err = snapshot_delta(dst.dst(), layer, &mut ActivePixels::default(), &MergeOpts::default())
        .unwrap_err();
    assert!(matches!(err, MergeError::UnsupportedElementKind(_)));
}

#[test]
fn short_value_array_is_a_validation_error() {
    let src = Counted::new(8, 8);
    let mut dst = Counted::new(8, 8);
    dst.values.truncate(10);
    let err = snapshot_delta(dst.dst(), src.src(), &mut ActivePixels::default(), &MergeOpts::default())
        .unwrap_err();
    assert!(matches!(err, MergeError::Validation(_)));
}

#[test]
fn rejected_call_leaves_out_as_it_was() {
    let src = Counted::new(8, 8);
    let mut out = ActivePixels::new(16, 16);
    out.set_active_pixel(9, 9);
    let before = out.clone();

    let mut dst = Counted::new(8, 8);
    dst.counts.truncate(10);
    let err = snapshot_delta(dst.dst(), src.src(), &mut out, &MergeOpts::default()).unwrap_err();
    assert!(matches!(err, MergeError::Validation(_)));
    assert_eq!(out, before);

    let mut dst = Counted::new(8, 8);
    let uncounted = SrcLayer {
        counts: None,
        ..src.src()
    };
    let err = snapshot_delta(dst.dst(), uncounted, &mut out, &MergeOpts::default()).unwrap_err();
    assert!(matches!(err, MergeError::UnsupportedElementKind(_)));
    assert_eq!(out, before);
}

#[test]
fn uncounted_merge_sets_cumulative_mask() {
    let mut src_mask = ActivePixels::new(8, 8);
    src_mask.set_tile_mask(0, 0b1010);
    let src_values = vec![0.0f32; 64];
    let mut dst_mask = ActivePixels::new(8, 8);
    let mut dst_values = vec![0.0f32; 64];
    let mut out = ActivePixels::default();

    for expected in [2, 0] {
        let changed = snapshot_delta(
            DstLayer {
                values: dst_values.as_mut_slice(),
                counts: None,
                mask: &mut dst_mask,
            },
            SrcLayer {
                values: src_values.as_slice(),
                counts: None,
                mask: &src_mask,
            },
            &mut out,
            &MergeOpts::default(),
        )
        .unwrap();
        assert_eq!(changed, expected);
    }
    assert_eq!(dst_mask.tile_mask(0), 0b1010);
}

#[test]
fn buffer_dispatch_merges_matching_kinds() {
    let mask = {
        let mut m = ActivePixels::new(8, 8);
        m.set_tile_mask(0, 0x3);
        m
    };
    let src_values = PixelBuffer::filled(ElementKind::Float3, 64, [1.0, 2.0, 3.0, 0.0]);
    let src_counts = vec![1u32; 64];
    let mut dst_values = PixelBuffer::filled(ElementKind::Float3, 64, [0.0; 4]);
    let mut dst_counts = vec![0u32; 64];
    let mut dst_mask = ActivePixels::new(8, 8);
    let mut out = ActivePixels::default();

    let changed = snapshot_delta_buffer(
        DstLayer {
            values: &mut dst_values,
            counts: Some(&mut dst_counts),
            mask: &mut dst_mask,
        },
        SrcLayer {
            values: &src_values,
            counts: Some(&src_counts),
            mask: &mask,
        },
        &mut out,
        &MergeOpts::default(),
    )
    .unwrap();
    assert_eq!(changed, 2);
    assert_eq!(dst_values.get_rgba(1), Some([1.0, 2.0, 3.0, 0.0]));
    assert_eq!(dst_values.get_rgba(2), Some([0.0; 4]));
}

#[test]
fn buffer_dispatch_rejects_kind_mismatch() {
    let mask = ActivePixels::new(8, 8);
    let src_values = PixelBuffer::filled(ElementKind::Float2, 64, [0.0; 4]);
    let mut dst_values = PixelBuffer::filled(ElementKind::Float4, 64, [0.0; 4]);
    let mut dst_mask = ActivePixels::new(8, 8);
    let err = snapshot_delta_buffer(
        DstLayer {
            values: &mut dst_values,
            counts: None,
            mask: &mut dst_mask,
        },
        SrcLayer {
            values: &src_values,
            counts: None,
            mask: &mask,
        },
        &mut ActivePixels::default(),
        &MergeOpts::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("Float4"));
}
