//! Disk image and ramdisk assembly.
//!
//! Runs a fixed, strictly sequential pipeline:
//!
//! 1. report the host platform
//! 2. install compiler targets/components ([`toolchain`])
//! 3. create the disk image unless it exists ([`disk`])
//! 4. build `init` unless it exists ([`init`])
//! 5. stage the ramdisk tree ([`ramdisk`])
//! 6. regenerate the kernel source dump ([`sources`])
//! 7. pack the archive ([`archive`])
//!
//! Tool failures in steps 2–5 are logged and the run continues. A missing
//! or empty kernel source tree, a failed archive, or a concurrent run
//! aborts. Every outcome lands in the returned [`AssemblyReport`].

pub mod archive;
pub mod disk;
pub mod init;
pub mod lock;
pub mod ramdisk;
pub mod report;
pub mod sources;
pub mod toolchain;

pub use report::{AssemblyReport, Step, StepOutcome, TerminalStatus};
pub use sources::FatalPipelineError;

use anyhow::Result;

use crate::config::AssemblerConfig;
use crate::platform::HostPlatform;
use lock::RunLock;

/// Everything a step needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AssemblyContext {
    pub platform: HostPlatform,
    pub config: AssemblerConfig,
}

impl AssemblyContext {
    pub fn new(platform: HostPlatform, config: AssemblerConfig) -> Self {
        Self { platform, config }
    }
}

struct StepFailure {
    step: Step,
    error: anyhow::Error,
}

trait FatalAt<T> {
    fn fatal_at(self, step: Step) -> std::result::Result<T, StepFailure>;
}

impl<T> FatalAt<T> for Result<T> {
    fn fatal_at(self, step: Step) -> std::result::Result<T, StepFailure> {
        self.map_err(|error| StepFailure { step, error })
    }
}

/// Run the whole pipeline and write `target/assembly-report.json`.
pub fn assemble(ctx: &AssemblyContext) -> AssemblyReport {
    let mut report = AssemblyReport::begin(&ctx.platform);

    if let Err(failure) = run_steps(ctx, &mut report) {
        log::error!("{:#}", failure.error);
        report.abort(failure.step, &failure.error);
    }
    report.finish();

    if let Err(e) = report.write_json(&ctx.config.paths.report) {
        log::warn!("Could not write assembly report: {e:#}");
    }
    report
}

fn run_steps(
    ctx: &AssemblyContext,
    report: &mut AssemblyReport,
) -> std::result::Result<(), StepFailure> {
    let paths = &ctx.config.paths;
    let _lock = RunLock::acquire(&paths.lock_dir).fatal_at(Step::Lock)?;

    report.record(Step::Platform, platform_outcome(&ctx.platform));
    report.record(Step::Toolchain, toolchain::install(ctx));
    report.record(Step::DiskImage, disk::ensure(ctx));
    report.record(Step::InitBinary, init::ensure(ctx));

    let staged = ramdisk::stage(paths).fatal_at(Step::Ramdisk)?;
    report.record(Step::Ramdisk, staged);

    let dump = paths.staging_dir.join(sources::SOURCE_DUMP_FILENAME);
    let count = sources::write_source_dump(&paths.kernel_sources, &dump)
        .fatal_at(Step::SourceDump)?;
    report.record(
        Step::SourceDump,
        StepOutcome::Done(format!("{count} files dumped")),
    );

    archive::pack(&paths.staging_dir, &paths.archive, ctx.config.archive_backend)
        .fatal_at(Step::Archive)?;
    match archive::sha256_file(&paths.archive) {
        Ok(sha) => report.archive_sha256 = Some(sha),
        Err(e) => log::warn!("Could not hash archive: {e:#}"),
    }
    report.record(
        Step::Archive,
        StepOutcome::Done(format!("'{}' written", paths.archive.display())),
    );
    log::info!("Ramdisk archive written to '{}'", paths.archive.display());

    Ok(())
}

fn platform_outcome(platform: &HostPlatform) -> StepOutcome {
    log::info!("Running on {platform}");
    if platform.is_supported() {
        return StepOutcome::Done(platform.to_string());
    }
    log::warn!(
        "The only OS this supports is Linux and (kinda) MacOS. \
         Windows users can use WSL2."
    );
    StepOutcome::Warned(format!("{platform} is not a supported host"))
}

/// Whether a failed run was caused by the kernel source tree.
pub fn is_source_failure(report: &AssemblyReport) -> bool {
    matches!(&report.abort, Some(abort) if abort.step == Step::SourceDump)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssemblerConfig, ImageFormat};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    // Keeps every step off the external tools: image and init exist.
    fn prepared_project(root: &Path) -> AssemblyContext {
        let mut config = AssemblerConfig::defaults(root);
        config.targets.clear();
        config.components.clear();
        config.image_format = ImageFormat::BootHeader;
        fs::write(&config.paths.disk_image, b"existing image").unwrap();
        fs::write(&config.paths.init_binary, b"\x7fELF").unwrap();
        AssemblyContext::new(HostPlatform::Linux, config)
    }

    #[test]
    fn missing_sources_abort() {
        let tmp = TempDir::new().unwrap();
        let ctx = prepared_project(tmp.path());

        let report = assemble(&ctx);

        assert_eq!(report.status(), TerminalStatus::Aborted);
        assert!(is_source_failure(&report));
        assert!(!ctx.config.paths.archive.exists());
        assert!(ctx.config.paths.report.exists());
    }

    #[test]
    fn empty_sources_abort() {
        let tmp = TempDir::new().unwrap();
        let ctx = prepared_project(tmp.path());
        fs::create_dir_all(&ctx.config.paths.kernel_sources).unwrap();

        let report = assemble(&ctx);

        assert_eq!(report.status(), TerminalStatus::Aborted);
        assert!(report
            .abort
            .as_ref()
            .unwrap()
            .reason
            .contains("no files found"));
    }

    #[test]
    fn full_run_packs_ramdisk_and_keeps_image() {
        let tmp = TempDir::new().unwrap();
        let ctx = prepared_project(tmp.path());
        let src = &ctx.config.paths.kernel_sources;
        fs::create_dir_all(src).unwrap();
        fs::write(src.join("main.rs"), "fn main() {}").unwrap();

        let report = assemble(&ctx);

        assert_eq!(report.status(), TerminalStatus::Success, "{report:?}");
        assert!(matches!(
            report.outcome(Step::DiskImage),
            Some(StepOutcome::Skipped(_))
        ));
        assert_eq!(
            fs::read(&ctx.config.paths.disk_image).unwrap(),
            b"existing image"
        );
        let staging = &ctx.config.paths.staging_dir;
        assert_eq!(
            fs::read_to_string(staging.join("lcsrc.txt")).unwrap(),
            "// main.rs\nfn main() {}\n\n"
        );
        assert!(staging.join("lorem.txt").is_file());
        assert!(staging.join("init").is_file());
        assert!(ctx.config.paths.archive.is_file());
        assert_eq!(report.archive_sha256.as_ref().map(String::len), Some(64));
    }

    #[test]
    fn concurrent_run_is_refused() {
        let tmp = TempDir::new().unwrap();
        let ctx = prepared_project(tmp.path());
        let _held = RunLock::acquire(&ctx.config.paths.lock_dir).unwrap();

        let report = assemble(&ctx);

        assert_eq!(report.status(), TerminalStatus::Aborted);
        assert_eq!(report.abort.as_ref().unwrap().step, Step::Lock);
        assert!(report.steps.is_empty());
    }

    #[test]
    fn unsupported_platform_warns() {
        assert!(matches!(
            platform_outcome(&HostPlatform::Other("freebsd".into())),
            StepOutcome::Warned(_)
        ));
        assert!(matches!(
            platform_outcome(&HostPlatform::Linux),
            StepOutcome::Done(_)
        ));
    }
}
