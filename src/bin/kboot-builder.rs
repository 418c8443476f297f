use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use kboot_builder::cli::{self, EXIT_FAILURE, EXIT_OK, EXIT_USAGE};
use kboot_builder::logging::StatusLogger;

fn usage() -> &'static str {
    "Usage:\n  kboot-builder [--root <dir>] assemble\n  kboot-builder check <image>\n  kboot-builder stamp-header <image> [entry_point]\n  kboot-builder [--root <dir>] preflight"
}

fn main() -> ExitCode {
    let _ = StatusLogger::from_env().init();
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    match run(&mut args) {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(EXIT_FAILURE as u8)
        }
    }
}

fn run(args: &mut Vec<String>) -> Result<i32> {
    let root = cli::take_root(args)?;

    match args.as_slice() {
        [] => Ok(cli::assemble(&root)?.exit_code()),
        [cmd] if cmd == "assemble" => Ok(cli::assemble(&root)?.exit_code()),
        [cmd, image] if cmd == "check" => {
            Ok(cli::check_image(Path::new(image), &mut std::io::stdout().lock()))
        }
        [cmd, image] if cmd == "stamp-header" => {
            cli::stamp(Path::new(image), None)?;
            Ok(EXIT_OK)
        }
        [cmd, image, entry] if cmd == "stamp-header" => {
            cli::stamp(Path::new(image), Some(entry))?;
            Ok(EXIT_OK)
        }
        [cmd] if cmd == "preflight" => {
            cli::preflight(&root)?;
            Ok(EXIT_OK)
        }
        [cmd] if cmd == "help" || cmd == "--help" || cmd == "-h" => {
            println!("{}", usage());
            Ok(EXIT_OK)
        }
        _ => {
            eprintln!("{}", usage());
            Ok(EXIT_USAGE)
        }
    }
}
