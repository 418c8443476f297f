//! Command implementations shared by the `check-header` and
//! `kboot-builder` binaries.

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::assembler::{self, AssemblyContext, TerminalStatus};
use crate::config::AssemblerConfig;
use crate::header::{self, BootImageHeader, DEFAULT_ENTRY_POINT};
use crate::platform::HostPlatform;
use crate::preflight;

pub const EXIT_OK: i32 = 0;
/// At least one header check failed, or an assembly run aborted.
pub const EXIT_FAILURE: i32 = 1;
/// The image could not be read.
pub const EXIT_IO: i32 = 2;
pub const EXIT_USAGE: i32 = 64;

/// Validate the header of `image`, writing one line per check to `out`.
pub fn check_image<W: Write>(image: &Path, out: &mut W) -> i32 {
    let report = match header::validate_file(image) {
        Ok(report) => report,
        Err(e) => {
            log::error!("{e}");
            return EXIT_IO;
        }
    };

    if let Err(e) = report.write_to(out) {
        log::error!("writing validation report: {e}");
        return EXIT_IO;
    }

    if report.is_valid() {
        EXIT_OK
    } else {
        EXIT_FAILURE
    }
}

/// Run the full assembly pipeline for the project at `root`.
pub fn assemble(root: &Path) -> Result<TerminalStatus> {
    let config = AssemblerConfig::load(root)?;
    let ctx = AssemblyContext::new(HostPlatform::detect(), config);

    preflight::warn_missing_tools(&ctx.platform, &ctx.config);
    let report = assembler::assemble(&ctx);

    match report.status() {
        TerminalStatus::Success => log::info!("Assembly finished."),
        TerminalStatus::Degraded => {
            log::warn!("Assembly finished with problems; see the lines above.")
        }
        TerminalStatus::Aborted => {
            if assembler::is_source_failure(&report) {
                log::error!("Kernel sources are required to build a ramdisk.");
            }
            log::error!("Assembly aborted.");
        }
    }
    Ok(report.status())
}

/// Print the host tools the assembler needs and fail if any are missing.
pub fn preflight(root: &Path) -> Result<()> {
    let config = AssemblerConfig::load(root)?;
    let platform = HostPlatform::detect();
    let tools = preflight::tools_for(&platform, &config);
    for (tool, package) in &tools {
        let mark = if preflight::command_exists(tool) { "ok" } else { "missing" };
        println!("  {tool:<10} {mark:<8} ({package})");
    }
    preflight::check_required_tools(&tools)
}

/// Write a conformant header into an existing image.
pub fn stamp(image: &Path, entry: Option<&str>) -> Result<()> {
    let entry_point = match entry {
        Some(raw) => parse_entry_point(raw)?,
        None => DEFAULT_ENTRY_POINT,
    };
    header::stamp_header(image, &BootImageHeader::new(entry_point))?;
    log::info!(
        "Stamped boot header into '{}' (entry {entry_point:#010x})",
        image.display()
    );
    Ok(())
}

/// Parse `0x`-prefixed hex or decimal. Zero is rejected.
pub fn parse_entry_point(raw: &str) -> Result<u32> {
    let raw = raw.trim();
    let value = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => raw.replace('_', "").parse::<u32>(),
    }
    .with_context(|| format!("invalid entry point '{raw}'"))?;

    if value == 0 {
        bail!("entry point must be nonzero");
    }
    Ok(value)
}

/// Pull `--root <dir>` out of `args`, defaulting to the current directory.
pub fn take_root(args: &mut Vec<String>) -> Result<PathBuf> {
    if let Some(pos) = args.iter().position(|a| a == "--root") {
        if pos + 1 >= args.len() {
            bail!("--root requires a directory");
        }
        let dir = args.remove(pos + 1);
        args.remove(pos);
        return Ok(PathBuf::from(dir));
    }
    std::env::current_dir().context("resolving current directory")
}
