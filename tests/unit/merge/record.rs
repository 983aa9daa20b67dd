use super::*;

fn sample_pixels(w: u32, h: u32, tile: usize, mask: u64) -> ActivePixels {
    let mut p = ActivePixels::new(w, h);
    p.set_tile_mask(tile, mask);
    p
}

#[test]
fn set_only_appends_while_recording() {
    let mut rec = ActivePixelsRecord::new();
    assert!(!rec.set(ActivePixels::new(8, 8), false));
    rec.start();
    assert!(rec.set(ActivePixels::new(8, 8), true));
    rec.stop();
    assert!(!rec.set(ActivePixels::new(8, 8), false));
    assert_eq!(rec.len(), 1);
    assert!(rec.entries()[0].coarse_pass);
    rec.reset();
    assert!(rec.is_empty());
}

#[test]
fn encode_decode_preserves_entries() {
    let mut rec = ActivePixelsRecord::new();
    rec.start();
    rec.set(sample_pixels(20, 10, 5, 0xdead_beef), true);
    rec.set(sample_pixels(8, 8, 0, u64::MAX), false);
    rec.set(ActivePixels::new(3, 3), false);

    let mut bytes = Vec::new();
    rec.encode(&mut bytes).unwrap();
    // header + three entries; only non-empty tiles are stored
    assert_eq!(bytes.len(), 8 + 4 + 3 * 13 + 2 * 12);

    let back = ActivePixelsRecord::decode(&mut bytes.as_slice()).unwrap();
    assert!(!back.is_active());
    assert_eq!(back.entries(), rec.entries());
}

#[test]
fn decode_rejects_bad_magic_and_truncation() {
    let err = ActivePixelsRecord::decode(&mut &b"NOTAREC!\0\0\0\0"[..]).unwrap_err();
    assert!(err.to_string().contains("bad magic"));

    let mut rec = ActivePixelsRecord::new();
    rec.start();
    rec.set(sample_pixels(16, 16, 3, 0x1), false);
    let mut bytes = Vec::new();
    rec.encode(&mut bytes).unwrap();
    bytes.truncate(bytes.len() - 3);
    let err = ActivePixelsRecord::decode(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(err, MergeError::Decode(_)));
}

#[test]
fn decode_rejects_out_of_range_tile() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.push(0);
    bytes.extend_from_slice(&8u32.to_le_bytes());
    bytes.extend_from_slice(&8u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&1u64.to_le_bytes());
    let err = ActivePixelsRecord::decode(&mut bytes.as_slice()).unwrap_err();
    assert!(err.to_string().contains("tile id 1 out of range"));
}

#[test]
fn dump_appends_suffix_and_load_reads_it_back() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("session");
    let mut rec = ActivePixelsRecord::new();
    rec.start();
    rec.set(sample_pixels(32, 32, 15, 0x8000_0000_0000_0000), true);
    rec.stop();
    let recorded = rec.entries().to_vec();

    let written = rec.dump(&base).unwrap();
    assert_eq!(written, dir.path().join("session.merge"));
    assert!(written.exists());
    // entries are handed off to the file
    assert!(rec.is_empty());

    let back = ActivePixelsRecord::load(&base).unwrap();
    assert_eq!(back.entries(), recorded.as_slice());
}

#[test]
fn dump_refuses_while_recording_or_empty() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("busy");
    let mut rec = ActivePixelsRecord::new();

    let err = rec.dump(&base).unwrap_err();
    assert!(matches!(err, MergeError::Validation(_)));

    rec.start();
    rec.set(sample_pixels(8, 8, 0, 0x3), false);
    let err = rec.dump(&base).unwrap_err();
    assert!(matches!(err, MergeError::Validation(_)));
    assert_eq!(rec.len(), 1);
    assert!(!ActivePixelsRecord::file_path(&base).exists());
}

#[test]
fn side_limit_is_shared_by_encode_and_decode() {
    let mut rec = ActivePixelsRecord::new();
    rec.start();
    rec.set(sample_pixels(MAX_SIDE, 8, 4095, 0x1), false);
    let mut bytes = Vec::new();
    rec.encode(&mut bytes).unwrap();
    let back = ActivePixelsRecord::decode(&mut bytes.as_slice()).unwrap();
    assert_eq!(back.entries(), rec.entries());

    rec.set(ActivePixels::new(MAX_SIDE + 1, 8), false);
    let mut bytes = Vec::new();
    let err = rec.encode(&mut bytes).unwrap_err();
    assert!(matches!(err, MergeError::Validation(_)));
    assert!(bytes.is_empty());

    rec.stop();
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("wide");
    assert!(rec.dump(&base).is_err());
    assert!(!ActivePixelsRecord::file_path(&base).exists());
    assert_eq!(rec.len(), 2);
}

#[test]
fn load_of_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ActivePixelsRecord::load(dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, MergeError::Io(_)));
}
