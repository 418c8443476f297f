//! Project configuration (`kboot.toml`).
//!
//! Every key is optional; a project without a config file gets the
//! layout the kernel repository has always used (`hd.img`, `init.asm`,
//! `target/ramdisk`, `hd.tar`, `kernel/src`).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::header::DEFAULT_ENTRY_POINT;

pub const CONFIG_FILENAME: &str = "kboot.toml";

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "KBOOT_CONFIG";

pub const DEFAULT_IMAGE_SIZE_MIB: u64 = 512;

/// How a new disk image is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageFormat {
    /// Zero-filled and formatted with `mkfs.fat -F 32`.
    Fat32,
    /// Zero-filled with a synthesized `kb00t!` header at offset 0.
    BootHeader,
}

/// Which packer writes the ramdisk archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveBackend {
    /// Deterministic tar written in-process.
    Builtin,
    /// The host `tar` binary.
    External,
}

/// Resolved paths, all absolute under the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub disk_image: PathBuf,
    pub init_source: PathBuf,
    pub init_object: PathBuf,
    pub init_binary: PathBuf,
    pub staging_dir: PathBuf,
    pub archive: PathBuf,
    pub kernel_sources: PathBuf,
    pub report: PathBuf,
    pub lock_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblerConfig {
    pub paths: ProjectPaths,
    pub image_size_mib: u64,
    pub image_format: ImageFormat,
    pub entry_point: u32,
    pub archive_backend: ArchiveBackend,
    pub targets: Vec<String>,
    pub components: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    paths: Option<PathsToml>,
    image: Option<ImageToml>,
    archive: Option<ArchiveToml>,
    toolchain: Option<ToolchainToml>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PathsToml {
    disk_image: Option<String>,
    init_source: Option<String>,
    init_object: Option<String>,
    init_binary: Option<String>,
    staging_dir: Option<String>,
    archive: Option<String>,
    kernel_sources: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ImageToml {
    size_mib: Option<u64>,
    format: Option<ImageFormat>,
    entry_point: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArchiveToml {
    backend: Option<ArchiveBackend>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ToolchainToml {
    targets: Option<Vec<String>>,
    components: Option<Vec<String>>,
}

impl AssemblerConfig {
    /// Defaults for a project rooted at `root`.
    pub fn defaults(root: &Path) -> Self {
        Self::from_toml(root, ConfigToml::default())
    }

    /// Load `kboot.toml` from `root` (or [`CONFIG_ENV`]), falling back to
    /// defaults when no file exists.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => resolve(root, &path.to_string_lossy()),
            None => root.join(CONFIG_FILENAME),
        };
        if !config_path.is_file() {
            log::debug!("no config at '{}', using defaults", config_path.display());
            return Ok(Self::defaults(root));
        }
        Self::load_file(root, &config_path)
    }

    pub fn load_file(root: &Path, config_path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(config_path)
            .with_context(|| format!("reading config '{}'", config_path.display()))?;
        let parsed: ConfigToml = toml::from_str(&raw)
            .with_context(|| format!("parsing config '{}'", config_path.display()))?;

        let config = Self::from_toml(root, parsed);
        if config.image_size_mib == 0 {
            bail!(
                "invalid config '{}': image.size_mib must be greater than zero",
                config_path.display()
            );
        }
        if config.entry_point == 0 {
            bail!(
                "invalid config '{}': image.entry_point must be nonzero",
                config_path.display()
            );
        }
        Ok(config)
    }

    fn from_toml(root: &Path, parsed: ConfigToml) -> Self {
        let paths = parsed.paths.unwrap_or_default();
        let image = parsed.image.unwrap_or_default();
        let archive = parsed.archive.unwrap_or_default();
        let toolchain = parsed.toolchain.unwrap_or_default();

        let path = |value: Option<String>, default: &str| {
            resolve(root, value.as_deref().unwrap_or(default))
        };

        let target_dir = root.join("target");
        let paths = ProjectPaths {
            root: root.to_path_buf(),
            disk_image: path(paths.disk_image, "hd.img"),
            init_source: path(paths.init_source, "init.asm"),
            init_object: path(paths.init_object, "init.o"),
            init_binary: path(paths.init_binary, "init"),
            staging_dir: path(paths.staging_dir, "target/ramdisk"),
            archive: path(paths.archive, "hd.tar"),
            kernel_sources: path(paths.kernel_sources, "kernel/src"),
            report: target_dir.join("assembly-report.json"),
            lock_dir: target_dir,
        };

        Self {
            paths,
            image_size_mib: image.size_mib.unwrap_or(DEFAULT_IMAGE_SIZE_MIB),
            image_format: image.format.unwrap_or(ImageFormat::Fat32),
            entry_point: image.entry_point.unwrap_or(DEFAULT_ENTRY_POINT),
            archive_backend: archive.backend.unwrap_or(ArchiveBackend::Builtin),
            targets: toolchain
                .targets
                .unwrap_or_else(|| vec!["x86_64-unknown-none".to_string()]),
            components: toolchain
                .components
                .unwrap_or_else(|| vec!["llvm-tools".to_string(), "rust-src".to_string()]),
        }
    }
}

fn resolve(root: &Path, raw: &str) -> PathBuf {
    let candidate = Path::new(raw);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_kernel_repo_layout() {
        let root = Path::new("/work/kernel-repo");
        let config = AssemblerConfig::defaults(root);
        assert_eq!(config.paths.disk_image, root.join("hd.img"));
        assert_eq!(config.paths.staging_dir, root.join("target/ramdisk"));
        assert_eq!(config.paths.archive, root.join("hd.tar"));
        assert_eq!(config.paths.kernel_sources, root.join("kernel/src"));
        assert_eq!(config.image_size_mib, 512);
        assert_eq!(config.image_format, ImageFormat::Fat32);
        assert_eq!(config.entry_point, 0x0010_0000);
        assert_eq!(config.archive_backend, ArchiveBackend::Builtin);
        assert_eq!(config.targets, vec!["x86_64-unknown-none"]);
        assert_eq!(config.components, vec!["llvm-tools", "rust-src"]);
    }

    #[test]
    fn file_overrides_selected_keys() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(CONFIG_FILENAME);
        fs::write(
            &config_path,
            r#"
[paths]
disk_image = "out/disk.img"
kernel_sources = "/abs/src"

[image]
size_mib = 64
format = "boot-header"
entry_point = 0x200000

[archive]
backend = "external"
"#,
        )
        .unwrap();

        let config = AssemblerConfig::load_file(tmp.path(), &config_path).unwrap();
        assert_eq!(config.paths.disk_image, tmp.path().join("out/disk.img"));
        assert_eq!(config.paths.kernel_sources, PathBuf::from("/abs/src"));
        assert_eq!(config.paths.archive, tmp.path().join("hd.tar"));
        assert_eq!(config.image_size_mib, 64);
        assert_eq!(config.image_format, ImageFormat::BootHeader);
        assert_eq!(config.entry_point, 0x0020_0000);
        assert_eq!(config.archive_backend, ArchiveBackend::External);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&config_path, "[image]\nsize = 1\n").unwrap();
        assert!(AssemblerConfig::load_file(tmp.path(), &config_path).is_err());
    }

    #[test]
    fn zero_entry_point_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&config_path, "[image]\nentry_point = 0\n").unwrap();
        let err = AssemblerConfig::load_file(tmp.path(), &config_path).unwrap_err();
        assert!(err.to_string().contains("entry_point"));
    }
}
