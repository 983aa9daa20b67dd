//! Diagnostic log of per-call change masks.
//!
//! File layout, all integers little-endian:
//!
//! ```text
//! magic  "FBMREC01"
//! count  u32
//! count x { coarse u8, width u32, height u32, tiles u32, tiles x { tile_id u32, mask u64 } }
//! ```
//!
//! Only non-empty tiles are stored.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::foundation::error::{MergeError, MergeResult};
use crate::tile::active_pixels::ActivePixels;

/// Suffix appended to every dump file name.
pub const RECORD_SUFFIX: &str = ".merge";

const MAGIC: &[u8; 8] = b"FBMREC01";
const MAX_SIDE: u32 = 1 << 15;

/// One recorded merge call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordEntry {
    /// Beauty change mask of the call.
    pub pixels: ActivePixels,
    /// `true` if the merge belonged to a coarse pass.
    pub coarse_pass: bool,
}

/// Append-only recorder of beauty change masks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivePixelsRecord {
    active: bool,
    entries: Vec<RecordEntry>,
}

impl ActivePixelsRecord {
    /// Idle, empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin appending on [`ActivePixelsRecord::set`].
    pub fn start(&mut self) {
        self.active = true;
    }

    /// Stop appending. Recorded entries are kept.
    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Drop all entries.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// `true` while recording.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Append an entry if recording. Returns whether it was stored.
    pub fn set(&mut self, pixels: ActivePixels, coarse_pass: bool) -> bool {
        if !self.active {
            return false;
        }
        self.entries.push(RecordEntry {
            pixels,
            coarse_pass,
        });
        true
    }

    /// Recorded entries in call order.
    pub fn entries(&self) -> &[RecordEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// File written by [`ActivePixelsRecord::dump`] for `base`.
    pub fn file_path(base: impl AsRef<Path>) -> PathBuf {
        let mut name = OsString::from(base.as_ref().as_os_str());
        name.push(RECORD_SUFFIX);
        PathBuf::from(name)
    }

    /// Write all entries to `base` + [`RECORD_SUFFIX`] and return the path written.
    ///
    /// Refuses to dump while recording or when nothing was recorded. The entries are dropped
    /// once the file is written; on failure they are kept.
    #[tracing::instrument(skip(self, base), fields(entries = self.entries.len()))]
    pub fn dump(&mut self, base: impl AsRef<Path>) -> MergeResult<PathBuf> {
        if self.active {
            return Err(MergeError::validation("cannot dump a merge record while recording"));
        }
        if self.entries.is_empty() {
            return Err(MergeError::validation("merge record is empty"));
        }
        self.check_encodable()?;

        let path = Self::file_path(base);
        let result = File::create(&path)
            .map_err(MergeError::from)
            .and_then(|file| {
                let mut w = BufWriter::new(file);
                self.encode(&mut w)?;
                w.flush()?;
                Ok(())
            });
        match result {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "merge record dumped");
                self.entries.clear();
                Ok(path)
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "merge record dump failed");
                Err(err)
            }
        }
    }

    /// Read a recorder dumped for `base`. The result is idle.
    #[tracing::instrument(skip(base))]
    pub fn load(base: impl AsRef<Path>) -> MergeResult<Self> {
        let path = Self::file_path(base);
        let mut r = BufReader::new(File::open(&path)?);
        let record = Self::decode(&mut r)?;
        tracing::debug!(path = %path.display(), entries = record.len(), "merge record loaded");
        Ok(record)
    }

    /// Serialize all entries. Nothing is written if an entry is larger than
    /// [`ActivePixelsRecord::decode`] accepts.
    pub fn encode<W: Write + ?Sized>(&self, w: &mut W) -> MergeResult<()> {
        self.check_encodable()?;
        w.write_all(MAGIC)?;
        w.write_u32_le(len_u32(self.entries.len())?)?;
        for entry in &self.entries {
            let px = &entry.pixels;
            w.write_u8(u8::from(entry.coarse_pass))?;
            w.write_u32_le(px.width())?;
            w.write_u32_le(px.height())?;
            w.write_u32_le(len_u32(px.active_tile_total())?)?;
            for (tile_id, &mask) in px.tiles().iter().enumerate() {
                if mask != 0 {
                    w.write_u32_le(len_u32(tile_id)?)?;
                    w.write_u64_le(mask)?;
                }
            }
        }
        Ok(())
    }

    fn check_encodable(&self) -> MergeResult<()> {
        for (index, entry) in self.entries.iter().enumerate() {
            let (width, height) = (entry.pixels.width(), entry.pixels.height());
            if !side_fits(width) || !side_fits(height) {
                return Err(MergeError::validation(format!(
                    "entry {index}: image {width}x{height} exceeds {MAX_SIDE} per side"
                )));
            }
        }
        Ok(())
    }

    /// Parse entries written by [`ActivePixelsRecord::encode`].
    pub fn decode<R: Read + ?Sized>(r: &mut R) -> MergeResult<Self> {
        let mut magic = [0u8; 8];
        read_exact(r, &mut magic)?;
        if &magic != MAGIC {
            return Err(MergeError::decode("not a merge record (bad magic)"));
        }

        let count = r.read_u32_le()?;
        let mut entries = Vec::new();
        for index in 0..count {
            let coarse_pass = match r.read_u8()? {
                0 => false,
                1 => true,
                v => {
                    return Err(MergeError::decode(format!(
                        "entry {index}: coarse flag {v} is not 0 or 1"
                    )));
                }
            };
            let width = r.read_u32_le()?;
            let height = r.read_u32_le()?;
            if !side_fits(width) || !side_fits(height) {
                return Err(MergeError::decode(format!(
                    "entry {index}: image {width}x{height} exceeds {MAX_SIDE} per side"
                )));
            }
            let mut pixels = ActivePixels::new(width, height);
            let tiles = r.read_u32_le()? as usize;
            if tiles > pixels.num_tiles() {
                return Err(MergeError::decode(format!(
                    "entry {index}: {tiles} tiles listed, image has {}",
                    pixels.num_tiles()
                )));
            }
            for _ in 0..tiles {
                let tile_id = r.read_u32_le()? as usize;
                let mask = r.read_u64_le()?;
                if tile_id >= pixels.num_tiles() {
                    return Err(MergeError::decode(format!(
                        "entry {index}: tile id {tile_id} out of range"
                    )));
                }
                pixels.set_tile_mask(tile_id, mask);
            }
            entries.push(RecordEntry {
                pixels,
                coarse_pass,
            });
        }
        Ok(Self {
            active: false,
            entries,
        })
    }
}

fn side_fits(side: u32) -> bool {
    side <= MAX_SIDE
}

fn len_u32(n: usize) -> MergeResult<u32> {
    u32::try_from(n).map_err(|_| MergeError::validation(format!("{n} does not fit in u32")))
}

fn read_exact<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> MergeResult<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => MergeError::decode("truncated merge record"),
        _ => MergeError::Io(e),
    })
}

trait WriteLeExt: Write {
    fn write_u8(&mut self, v: u8) -> MergeResult<()> {
        self.write_all(&[v])?;
        Ok(())
    }

    fn write_u32_le(&mut self, v: u32) -> MergeResult<()> {
        self.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn write_u64_le(&mut self, v: u64) -> MergeResult<()> {
        self.write_all(&v.to_le_bytes())?;
        Ok(())
    }
}

impl<T: Write + ?Sized> WriteLeExt for T {}

trait ReadLeExt: Read {
    fn read_u8(&mut self) -> MergeResult<u8> {
        let mut buf = [0u8; 1];
        read_exact(self, &mut buf)?;
        Ok(buf[0])
    }

    fn read_u32_le(&mut self) -> MergeResult<u32> {
        let mut buf = [0u8; 4];
        read_exact(self, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64_le(&mut self) -> MergeResult<u64> {
        let mut buf = [0u8; 8];
        read_exact(self, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}

impl<T: Read + ?Sized> ReadLeExt for T {}

#[cfg(test)]
#[path = "../../tests/unit/merge/record.rs"]
mod tests;
