//! Disk image creation.
//!
//! The existence check happens once: an image that is already present is
//! never touched, so re-running the assembler cannot destroy it.
//!
//! ```text
//! Absent ──create──> Created ──format/stamp──> Formatted
//! Present ─────────────────────────────────> Skipped
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::report::StepOutcome;
use super::AssemblyContext;
use crate::config::ImageFormat;
use crate::header::{stamp_header, BootImageHeader};
use crate::platform::HostPlatform;
use crate::process::Cmd;

const MIB: u64 = 1024 * 1024;

/// Terminal state of the disk image step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskImageState {
    /// Image existed before the run.
    Skipped,
    /// Created but left unformatted.
    Created { reason: String },
    /// Created and formatted with FAT32.
    Formatted,
    /// Created with a synthesized boot header.
    Stamped { entry_point: u32 },
}

impl DiskImageState {
    pub fn into_outcome(self, image: &Path) -> StepOutcome {
        match self {
            DiskImageState::Skipped => {
                StepOutcome::Skipped(format!("'{}' already exists", image.display()))
            }
            DiskImageState::Created { reason } => StepOutcome::Warned(reason),
            DiskImageState::Formatted => {
                StepOutcome::Done(format!("'{}' created and formatted FAT32", image.display()))
            }
            DiskImageState::Stamped { entry_point } => StepOutcome::Done(format!(
                "'{}' created with boot header (entry {entry_point:#010x})",
                image.display()
            )),
        }
    }
}

pub fn ensure(ctx: &AssemblyContext) -> StepOutcome {
    let image = &ctx.config.paths.disk_image;
    match ensure_disk_image(ctx) {
        Ok(state) => state.into_outcome(image),
        Err(e) => {
            log::error!("{e:#}");
            StepOutcome::Failed(format!("{e:#}"))
        }
    }
}

pub fn ensure_disk_image(ctx: &AssemblyContext) -> Result<DiskImageState> {
    let config = &ctx.config;
    let image = &config.paths.disk_image;

    if image.exists() {
        log::info!("HD image already exists.");
        return Ok(DiskImageState::Skipped);
    }

    log::info!("Creating new HD image...");
    if let Some(parent) = image.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating image directory '{}'", parent.display()))?;
    }

    let built = match config.image_format {
        ImageFormat::Fat32 => create_blank(&ctx.platform, image, config.image_size_mib)
            .and_then(|()| format_fat32(&ctx.platform, image)),
        ImageFormat::BootHeader => create_sparse(image, config.image_size_mib).and_then(|()| {
            stamp_header(image, &BootImageHeader::new(config.entry_point))?;
            Ok(DiskImageState::Stamped {
                entry_point: config.entry_point,
            })
        }),
    };
    // Nothing at `image` predates this run; a half-built image must not
    // outlive it.
    if built.is_err() {
        discard_partial(image);
    }
    built
}

fn discard_partial(image: &Path) {
    match fs::remove_file(image) {
        Ok(()) => log::info!("Removed partial HD image '{}'", image.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!(
            "Could not remove partial HD image '{}' ({e}); the next run will skip it. \
             Delete it by hand.",
            image.display()
        ),
    }
}

/// Zero-filled image through the platform's usual tool.
fn create_blank(platform: &HostPlatform, image: &Path, size_mib: u64) -> Result<()> {
    match platform {
        HostPlatform::Windows => {
            Cmd::new("qemu-img")
                .arg("create")
                .arg_path(image)
                .arg(format!("{size_mib}M"))
                .error_msg("qemu-img could not create the HD image")
                .run_interactive()?;
        }
        HostPlatform::Linux | HostPlatform::MacOs => {
            Cmd::new("dd")
                .arg("if=/dev/zero")
                .arg(format!("of={}", image.display()))
                .args(["bs=1M", &format!("count={size_mib}")])
                .error_msg("dd could not create the HD image")
                .run_interactive()?;
        }
        HostPlatform::Other(_) => create_sparse(image, size_mib)?,
    }
    Ok(())
}

/// Zero-filled image written in-process.
pub fn create_sparse(image: &Path, size_mib: u64) -> Result<()> {
    let file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(image)
        .with_context(|| format!("creating image '{}'", image.display()))?;
    file.set_len(size_mib * MIB)
        .with_context(|| format!("sizing image '{}' to {size_mib} MiB", image.display()))?;
    Ok(())
}

fn format_fat32(platform: &HostPlatform, image: &Path) -> Result<DiskImageState> {
    if platform.is_windows() {
        let reason = "Unsupported platform. Can't format HD image!".to_string();
        log::error!("{reason}");
        return Ok(DiskImageState::Created { reason });
    }

    Cmd::new("mkfs.fat")
        .args(["-F", "32"])
        .arg_path(image)
        .error_msg("mkfs.fat could not format the HD image")
        .run_interactive()?;
    Ok(DiskImageState::Formatted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssemblerConfig;
    use crate::header::validate;
    use tempfile::TempDir;

    fn context(root: &Path, format: ImageFormat) -> AssemblyContext {
        let mut config = AssemblerConfig::defaults(root);
        config.image_format = format;
        config.image_size_mib = 1;
        AssemblyContext::new(HostPlatform::Linux, config)
    }

    #[test]
    fn partial_image_is_discarded() {
        let tmp = TempDir::new().unwrap();
        let image = tmp.path().join("hd.img");
        fs::write(&image, vec![0u8; 64]).unwrap();

        discard_partial(&image);
        assert!(!image.exists());

        // Already gone: nothing to do.
        discard_partial(&image);
    }

    #[test]
    fn existing_image_is_untouched() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path(), ImageFormat::Fat32);
        fs::write(&ctx.config.paths.disk_image, b"precious bytes").unwrap();

        let state = ensure_disk_image(&ctx).unwrap();

        assert_eq!(state, DiskImageState::Skipped);
        assert_eq!(
            fs::read(&ctx.config.paths.disk_image).unwrap(),
            b"precious bytes"
        );
    }

    #[test]
    fn boot_header_image_validates() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path(), ImageFormat::BootHeader);

        let state = ensure_disk_image(&ctx).unwrap();

        assert_eq!(
            state,
            DiskImageState::Stamped {
                entry_point: 0x0010_0000
            }
        );
        let bytes = fs::read(&ctx.config.paths.disk_image).unwrap();
        assert_eq!(bytes.len() as u64, MIB);
        let report = validate(&bytes);
        assert!(report.is_valid());
        assert_eq!(report.entry_point(), Some(0x0010_0000));
    }

    #[test]
    fn sparse_creation_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        let image = tmp.path().join("hd.img");
        fs::write(&image, b"keep").unwrap();
        assert!(create_sparse(&image, 1).is_err());
        assert_eq!(fs::read(&image).unwrap(), b"keep");
    }

    #[test]
    fn windows_images_are_left_unformatted() {
        let tmp = TempDir::new().unwrap();
        let state = format_fat32(&HostPlatform::Windows, &tmp.path().join("hd.img")).unwrap();
        assert!(matches!(state, DiskImageState::Created { .. }));
        assert!(matches!(
            state.into_outcome(Path::new("hd.img")),
            StepOutcome::Warned(_)
        ));
    }
}
