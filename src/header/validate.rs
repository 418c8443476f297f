//! Boot header validation.
//!
//! All four checks run on every input so a single pass reports every
//! defect. The report renders one line per check:
//!
//! ```text
//! [✔] Header size is valid
//! [✔] Found magic
//! [✘] Found incorrect version: 0x02 (2)
//! [✔] Found kernel entry point address: 0x00100000
//! ```

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{ENTRY_POINT_OFFSET, MAGIC, MIN_IMAGE_LEN, SUPPORTED_VERSION, VERSION_OFFSET};

const PASS_MARK: &str = "[✔]";
const FAIL_MARK: &str = "[✘]";

/// The individual checks, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderCheck {
    Size,
    Magic,
    Version,
    EntryPoint,
}

impl HeaderCheck {
    pub const ALL: [HeaderCheck; 4] = [
        HeaderCheck::Size,
        HeaderCheck::Magic,
        HeaderCheck::Version,
        HeaderCheck::EntryPoint,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HeaderCheck::Size => "size",
            HeaderCheck::Magic => "magic",
            HeaderCheck::Version => "version",
            HeaderCheck::EntryPoint => "entry_point",
        }
    }
}

/// A format defect found by one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HeaderDefect {
    #[error("File too small")]
    HeaderTooSmall,
    #[error("Magic not found")]
    MagicMismatch,
    #[error("Version not found")]
    VersionMissing,
    #[error("Found incorrect version: {0:#04x} ({0})")]
    VersionUnsupported(u8),
    #[error("Entry point address not found")]
    EntryPointMissing,
}

/// Input could not be read at all. Never accompanied by field results.
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("cannot read image '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result of one check: pass text or the defect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub check: HeaderCheck,
    pub result: Result<String, HeaderDefect>,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(text) => write!(f, "{PASS_MARK} {text}"),
            Err(defect) => write!(f, "{FAIL_MARK} {defect}"),
        }
    }
}

/// Outcome of every check over one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    outcomes: Vec<CheckOutcome>,
    entry_point: Option<u32>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.outcomes.iter().all(CheckOutcome::passed)
    }

    pub fn outcomes(&self) -> &[CheckOutcome] {
        &self.outcomes
    }

    pub fn outcome(&self, check: HeaderCheck) -> Option<&CheckOutcome> {
        self.outcomes.iter().find(|o| o.check == check)
    }

    pub fn defects(&self) -> Vec<HeaderDefect> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().copied())
            .collect()
    }

    /// Decoded entry point, when the entry point check passed.
    pub fn entry_point(&self) -> Option<u32> {
        self.entry_point
    }

    /// Write one line per check.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for outcome in &self.outcomes {
            writeln!(out, "{outcome}")?;
        }
        Ok(())
    }
}

/// Run every header check over `bytes`.
pub fn validate(bytes: &[u8]) -> ValidationReport {
    let entry_point = read_entry_point(bytes);

    let outcomes = vec![
        CheckOutcome {
            check: HeaderCheck::Size,
            result: check_size(bytes),
        },
        CheckOutcome {
            check: HeaderCheck::Magic,
            result: check_magic(bytes),
        },
        CheckOutcome {
            check: HeaderCheck::Version,
            result: check_version(bytes),
        },
        CheckOutcome {
            check: HeaderCheck::EntryPoint,
            result: entry_point
                .map(|addr| format!("Found kernel entry point address: {addr:#010x}"))
                .ok_or(HeaderDefect::EntryPointMissing),
        },
    ];

    ValidationReport {
        outcomes,
        entry_point,
    }
}

/// Read `path` and validate its contents.
pub fn validate_file(path: &Path) -> Result<ValidationReport, HeaderError> {
    let bytes = std::fs::read(path).map_err(|source| HeaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(validate(&bytes))
}

fn check_size(bytes: &[u8]) -> Result<String, HeaderDefect> {
    if bytes.len() < MIN_IMAGE_LEN {
        return Err(HeaderDefect::HeaderTooSmall);
    }
    Ok("Header size is valid".to_string())
}

fn check_magic(bytes: &[u8]) -> Result<String, HeaderDefect> {
    if !bytes.starts_with(MAGIC) {
        return Err(HeaderDefect::MagicMismatch);
    }
    Ok("Found magic".to_string())
}

fn check_version(bytes: &[u8]) -> Result<String, HeaderDefect> {
    match bytes.get(VERSION_OFFSET).copied() {
        Some(SUPPORTED_VERSION) => Ok(format!("Found version: {SUPPORTED_VERSION:02x}")),
        None | Some(0) => Err(HeaderDefect::VersionMissing),
        Some(other) => Err(HeaderDefect::VersionUnsupported(other)),
    }
}

// A truncated entry field counts as missing.
fn read_entry_point(bytes: &[u8]) -> Option<u32> {
    let raw: [u8; 4] = bytes
        .get(ENTRY_POINT_OFFSET..ENTRY_POINT_OFFSET + 4)?
        .try_into()
        .ok()?;
    match u32::from_be_bytes(raw) {
        0 => None,
        addr => Some(addr),
    }
}
