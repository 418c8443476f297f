//! The `kb00t!` boot header.
//!
//! Every bootable disk image starts with a fixed 12-byte header:
//!
//! ```text
//! offset  size  field
//! 0       6     magic        b"kb00t!"
//! 6       1     version      0x01
//! 7       1     reserved     unchecked
//! 8       4     entry_point  big-endian u32, nonzero
//! ```
//!
//! Images shorter than [`MIN_IMAGE_LEN`] bytes are rejected before any
//! field is inspected.
//!
//! - [`validate`] - per-field checks and the aggregated report
//! - [`BootImageHeader`] - synthesis of a conformant header

pub mod validate;

pub use validate::{
    validate, validate_file, CheckOutcome, HeaderCheck, HeaderDefect, HeaderError,
    ValidationReport,
};

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

/// Magic bytes at offset 0.
pub const MAGIC: &[u8; 6] = b"kb00t!";

/// The only header revision this tool accepts.
pub const SUPPORTED_VERSION: u8 = 1;

pub const VERSION_OFFSET: usize = 6;
pub const RESERVED_OFFSET: usize = 7;
pub const ENTRY_POINT_OFFSET: usize = 8;

/// Size of the encoded header.
pub const HEADER_LEN: usize = 12;

/// Shortest image the validator accepts.
pub const MIN_IMAGE_LEN: usize = 13;

/// Entry point written into freshly synthesized images.
pub const DEFAULT_ENTRY_POINT: u32 = 0x0010_0000;

/// Decoded boot header fields (magic is implied).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootImageHeader {
    pub version: u8,
    pub reserved: u8,
    pub entry_point: u32,
}

impl BootImageHeader {
    /// A revision-1 header pointing at `entry_point`.
    pub fn new(entry_point: u32) -> Self {
        Self {
            version: SUPPORTED_VERSION,
            reserved: 0,
            entry_point,
        }
    }

    /// Encode into the on-disk layout.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..MAGIC.len()].copy_from_slice(MAGIC);
        out[VERSION_OFFSET] = self.version;
        out[RESERVED_OFFSET] = self.reserved;
        out[ENTRY_POINT_OFFSET..HEADER_LEN].copy_from_slice(&self.entry_point.to_be_bytes());
        out
    }

    /// Decode the fields of `bytes`, ignoring whether they are valid.
    ///
    /// Returns `None` when `bytes` is shorter than the header or the magic
    /// does not match. Use [`validate`] to get a per-field verdict.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let raw = bytes.get(..HEADER_LEN)?;
        if &raw[..MAGIC.len()] != MAGIC {
            return None;
        }
        let mut entry = [0u8; 4];
        entry.copy_from_slice(&raw[ENTRY_POINT_OFFSET..HEADER_LEN]);
        Some(Self {
            version: raw[VERSION_OFFSET],
            reserved: raw[RESERVED_OFFSET],
            entry_point: u32::from_be_bytes(entry),
        })
    }
}

/// Overwrite the first [`HEADER_LEN`] bytes of an existing image.
///
/// The rest of the file is left untouched and the file is never truncated.
pub fn stamp_header(image: &Path, header: &BootImageHeader) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .open(image)
        .with_context(|| format!("opening image '{}' for header stamping", image.display()))?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&header.to_bytes())
        .with_context(|| format!("writing boot header into '{}'", image.display()))?;
    file.flush()?;
    Ok(())
}
