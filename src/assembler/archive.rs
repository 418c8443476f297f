//! Ramdisk archive packing.
//!
//! The builtin packer writes entries in sorted order with zeroed mtime,
//! uid and gid, so an unchanged staging tree packs to the same bytes.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tar::Builder as TarBuilder;
use walkdir::WalkDir;

use crate::config::ArchiveBackend;
use crate::process::Cmd;

/// Pack `staging` into `output` with the selected backend.
pub fn pack(staging: &Path, output: &Path, backend: ArchiveBackend) -> Result<()> {
    log::info!(
        "Packing '{}' into '{}'...",
        staging.display(),
        output.display()
    );
    match backend {
        ArchiveBackend::Builtin => create_tar(staging, output),
        ArchiveBackend::External => {
            Cmd::new("tar")
                .arg("-cf")
                .arg_path(output)
                .arg("-C")
                .arg_path(staging)
                .arg(".")
                .error_msg("tar failed to pack the ramdisk")
                .run_interactive()?;
            Ok(())
        }
    }
}

/// Write an uncompressed tar of `src_dir`'s contents.
pub fn create_tar(src_dir: &Path, out_path: &Path) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let out = File::create(out_path)
        .with_context(|| format!("Failed to create {}", out_path.display()))?;
    let mut builder = TarBuilder::new(out);

    // Collect paths deterministically.
    let mut entries: Vec<PathBuf> = vec![];
    for ent in WalkDir::new(src_dir).follow_links(false) {
        let ent = ent.with_context(|| format!("walking '{}'", src_dir.display()))?;
        if ent.path() == src_dir {
            continue;
        }
        entries.push(ent.into_path());
    }

    entries.sort_by(|a, b| {
        let ra = a.strip_prefix(src_dir).unwrap_or(a).to_string_lossy();
        let rb = b.strip_prefix(src_dir).unwrap_or(b).to_string_lossy();
        ra.cmp(&rb)
    });

    for p in entries {
        let rel = p
            .strip_prefix(src_dir)
            .unwrap_or(&p)
            .to_string_lossy()
            .replace('\\', "/");

        let md = fs::symlink_metadata(&p)?;
        let mut header = tar::Header::new_gnu();
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_mode(entry_mode(&md));

        if md.is_dir() {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_size(0);
            header.set_cksum();
            builder.append_data(&mut header, rel, std::io::empty())?;
        } else if md.file_type().is_symlink() {
            let target = fs::read_link(&p)?;
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            header.set_link_name(&target)?;
            header.set_cksum();
            builder.append_data(&mut header, rel, std::io::empty())?;
        } else if md.is_file() {
            let mut f = File::open(&p)?;
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(md.len());
            header.set_cksum();
            builder.append_data(&mut header, rel, &mut f)?;
        }
    }

    builder
        .into_inner()
        .with_context(|| "Failed to finalize tar builder")?;
    Ok(())
}

#[cfg(unix)]
fn entry_mode(md: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    md.permissions().mode()
}

#[cfg(not(unix))]
fn entry_mode(md: &fs::Metadata) -> u32 {
    if md.is_dir() {
        0o755
    } else {
        0o644
    }
}

/// SHA-256 of a file, hex encoded.
pub fn sha256_file(path: &Path) -> Result<String> {
    let f = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut r = BufReader::new(f);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = r.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
