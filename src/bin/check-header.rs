use std::path::Path;
use std::process::ExitCode;

use kboot_builder::cli::{check_image, EXIT_USAGE};
use kboot_builder::logging::StatusLogger;

fn usage() -> &'static str {
    "Usage:\n  check-header <image>"
}

fn main() -> ExitCode {
    let _ = StatusLogger::from_env().init();
    let args: Vec<String> = std::env::args().skip(1).collect();

    let code = match args.as_slice() {
        [image] => check_image(Path::new(image), &mut std::io::stdout().lock()),
        _ => {
            eprintln!("{}", usage());
            EXIT_USAGE
        }
    };
    ExitCode::from(code as u8)
}
