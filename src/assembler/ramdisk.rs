//! Ramdisk staging tree.
//!
//! `target/ramdisk/` holds a sample text file, the `init` binary and the
//! kernel source dump. The first two are only written when missing; the
//! dump is rebuilt on every run by [`super::sources`].

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::report::StepOutcome;
use crate::config::ProjectPaths;

pub const SAMPLE_FILENAME: &str = "lorem.txt";
pub const INIT_FILENAME: &str = "init";

pub const SAMPLE_TEXT: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, \
sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, \
quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat. Duis aute \
irure dolor in reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla pariatur. \
Excepteur sint occaecat cupidatat non proident, sunt in culpa qui officia deserunt mollit \
anim id est laborum.\n";

/// Create the staging directory and place the fixed files.
pub fn stage(paths: &ProjectPaths) -> Result<StepOutcome> {
    let staging = &paths.staging_dir;
    fs::create_dir_all(staging)
        .with_context(|| format!("creating ramdisk staging dir '{}'", staging.display()))?;

    let sample = staging.join(SAMPLE_FILENAME);
    if !sample.exists() {
        fs::write(&sample, SAMPLE_TEXT)
            .with_context(|| format!("writing '{}'", sample.display()))?;
        log::info!("Wrote sample file '{}'", sample.display());
    }

    stage_init(&paths.init_binary, &staging.join(INIT_FILENAME))
}

fn stage_init(built: &Path, staged: &Path) -> Result<StepOutcome> {
    if staged.exists() {
        return Ok(StepOutcome::Done("init already staged".into()));
    }
    if !built.is_file() {
        log::warn!(
            "No init program at '{}'; ramdisk will not contain one",
            built.display()
        );
        return Ok(StepOutcome::Warned("init binary not available".into()));
    }

    fs::copy(built, staged).with_context(|| {
        format!(
            "copying init '{}' -> '{}'",
            built.display(),
            staged.display()
        )
    })?;
    log::info!("Copied init program into the ramdisk");
    Ok(StepOutcome::Done("init staged".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssemblerConfig;
    use tempfile::TempDir;

    #[test]
    fn stages_sample_and_init() {
        let tmp = TempDir::new().unwrap();
        let paths = AssemblerConfig::defaults(tmp.path()).paths;
        fs::write(&paths.init_binary, b"\x7fELF init").unwrap();

        let outcome = stage(&paths).unwrap();

        assert_eq!(outcome, StepOutcome::Done("init staged".into()));
        assert_eq!(
            fs::read_to_string(paths.staging_dir.join(SAMPLE_FILENAME)).unwrap(),
            SAMPLE_TEXT
        );
        assert_eq!(
            fs::read(paths.staging_dir.join(INIT_FILENAME)).unwrap(),
            b"\x7fELF init"
        );
    }

    #[test]
    fn existing_files_are_kept() {
        let tmp = TempDir::new().unwrap();
        let paths = AssemblerConfig::defaults(tmp.path()).paths;
        fs::create_dir_all(&paths.staging_dir).unwrap();
        fs::write(paths.staging_dir.join(SAMPLE_FILENAME), "custom").unwrap();
        fs::write(paths.staging_dir.join(INIT_FILENAME), "old init").unwrap();
        fs::write(&paths.init_binary, "new init").unwrap();

        stage(&paths).unwrap();

        assert_eq!(
            fs::read_to_string(paths.staging_dir.join(SAMPLE_FILENAME)).unwrap(),
            "custom"
        );
        assert_eq!(
            fs::read_to_string(paths.staging_dir.join(INIT_FILENAME)).unwrap(),
            "old init"
        );
    }

    #[test]
    fn missing_init_warns() {
        let tmp = TempDir::new().unwrap();
        let paths = AssemblerConfig::defaults(tmp.path()).paths;
        assert!(matches!(stage(&paths).unwrap(), StepOutcome::Warned(_)));
        assert!(!paths.staging_dir.join(INIT_FILENAME).exists());
    }
}
