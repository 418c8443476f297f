//! Preflight checks for the assembler's host tools.
//!
//! Missing tools are reported up front so the per-step diagnostics that
//! follow are not the first hint. The assembler itself still runs
//! best-effort; only `preflight` as a command turns a missing tool into a
//! failure.
//!
//! # Example
//!
//! ```rust
//! use kboot_builder::preflight::{command_exists, check_required_tools};
//!
//! if !command_exists("nasm") {
//!     println!("nasm not installed");
//! }
//!
//! let tools = &[("mkfs.fat", "dosfstools"), ("nasm", "nasm")];
//! if let Err(e) = check_required_tools(tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Result};

use crate::config::{ArchiveBackend, AssemblerConfig, ImageFormat};
use crate::platform::HostPlatform;

/// Check if a command exists on the host system.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Tools the assembler will invoke on `platform` with `config`.
///
/// Each tuple is (command_name, package_name).
pub fn tools_for(
    platform: &HostPlatform,
    config: &AssemblerConfig,
) -> Vec<(&'static str, &'static str)> {
    let mut tools = vec![("rustup", "rustup"), ("nasm", "nasm")];

    // The boot-header format writes its image in-process.
    if config.image_format == ImageFormat::Fat32 {
        match platform {
            HostPlatform::Windows => tools.push(("qemu-img", "qemu-utils")),
            HostPlatform::Linux | HostPlatform::MacOs => tools.push(("dd", "coreutils")),
            HostPlatform::Other(_) => {}
        }
    }

    if !platform.is_windows() {
        tools.push(("ld", "binutils"));
        if config.image_format == ImageFormat::Fat32 {
            tools.push(("mkfs.fat", "dosfstools"));
        }
    }

    if config.archive_backend == ArchiveBackend::External {
        tools.push(("tar", "tar"));
    }

    tools
}

/// Tools from `tools` that are not on PATH.
pub fn missing_tools<'a>(tools: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
    tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .copied()
        .collect()
}

/// Check that specific tools are available.
///
/// # Returns
///
/// * `Ok(())` if all tools are found
/// * `Err` with list of missing tools and their packages
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing = missing_tools(tools);

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Log a warning for every missing tool. Returns how many were missing.
pub fn warn_missing_tools(platform: &HostPlatform, config: &AssemblerConfig) -> usize {
    let tools = tools_for(platform, config);
    let missing = missing_tools(&tools);
    for (tool, package) in &missing {
        log::warn!("{tool} not found on PATH (install: {package})");
    }
    missing.len()
}
