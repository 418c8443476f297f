use std::fs;
use std::process::Command;

use kboot_builder::header::BootImageHeader;
use tempfile::TempDir;

fn check_header(path: &std::path::Path) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_check-header"))
        .arg(path)
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

#[test]
fn valid_image_exits_zero() {
    let tmp = TempDir::new().unwrap();
    let image = tmp.path().join("hd.img");
    let mut bytes = BootImageHeader::new(0x0010_0000).to_bytes().to_vec();
    bytes.extend_from_slice(&[0u8; 500]);
    fs::write(&image, bytes).unwrap();

    let out = check_header(&image);

    assert_eq!(out.status.code(), Some(0));
    assert_eq!(
        String::from_utf8(out.stdout).unwrap(),
        "[✔] Header size is valid\n\
         [✔] Found magic\n\
         [✔] Found version: 01\n\
         [✔] Found kernel entry point address: 0x00100000\n"
    );
}

#[test]
fn defective_image_exits_one_and_reports_everything() {
    let tmp = TempDir::new().unwrap();
    let image = tmp.path().join("hd.img");
    let mut bytes = b"kb00t!\x02\x00\x00\x00\x00\x00".to_vec();
    bytes.extend_from_slice(&[0xffu8; 16]);
    fs::write(&image, bytes).unwrap();

    let out = check_header(&image);

    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("[✔] Found magic"));
    assert!(stdout.contains("[✘] Found incorrect version: 0x02 (2)"));
    assert!(stdout.contains("[✘] Entry point address not found"));
}

#[test]
fn unreadable_image_is_distinct() {
    let tmp = TempDir::new().unwrap();
    let out = check_header(&tmp.path().join("missing.img"));

    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8(out.stderr).unwrap().contains("cannot read image"));
}

#[test]
fn wrong_arguments_print_usage() {
    let out = Command::new(env!("CARGO_BIN_EXE_check-header"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(64));
    assert!(String::from_utf8(out.stderr).unwrap().contains("Usage"));
}
