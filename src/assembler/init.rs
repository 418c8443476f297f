//! The ramdisk's `init` program: `nasm` then `ld`.
//!
//! Every failure here is logged and the run continues without an init
//! binary; the staged ramdisk simply lacks one.

use super::report::StepOutcome;
use super::AssemblyContext;
use crate::config::ProjectPaths;
use crate::platform::HostPlatform;
use crate::process::{Cmd, ToolError};

#[derive(Debug)]
pub enum InitBuild {
    AlreadyBuilt,
    Built,
    /// Assembled, but this platform has no linker step.
    AssembledOnly,
    AssemblerMissing,
    AssemblerFailed(ToolError),
    LinkFailed(ToolError),
}

impl InitBuild {
    pub fn into_outcome(self) -> StepOutcome {
        match self {
            InitBuild::AlreadyBuilt => StepOutcome::Skipped("init already compiled".into()),
            InitBuild::Built => StepOutcome::Done("init compiled and linked".into()),
            InitBuild::AssembledOnly => {
                StepOutcome::Warned("init assembled; linking is not supported on Windows".into())
            }
            InitBuild::AssemblerMissing => StepOutcome::Failed("nasm is not installed".into()),
            InitBuild::AssemblerFailed(e) => StepOutcome::Failed(format!("assembler: {e}")),
            InitBuild::LinkFailed(e) => StepOutcome::Failed(format!("linker: {e}")),
        }
    }
}

pub fn ensure(ctx: &AssemblyContext) -> StepOutcome {
    build_init(&ctx.platform, &ctx.config.paths).into_outcome()
}

pub fn build_init(platform: &HostPlatform, paths: &ProjectPaths) -> InitBuild {
    if paths.init_binary.exists() {
        log::info!("Init program already compiled.");
        return InitBuild::AlreadyBuilt;
    }

    log::info!("Compiling init program...");
    match assemble_cmd(paths).run_interactive() {
        Ok(_) => log::info!("Successfully compiled the init program!"),
        Err(ToolError::Missing { .. }) => {
            log::error!("Please install nasm to compile the init program!");
            return InitBuild::AssemblerMissing;
        }
        Err(e) => {
            log::error!("Unable to compile the init program! ({e})");
            return InitBuild::AssemblerFailed(e);
        }
    }

    if platform.is_windows() {
        return InitBuild::AssembledOnly;
    }

    match link_cmd(paths).run_interactive() {
        Ok(_) => {
            log::info!("Successfully linked the init program!");
            InitBuild::Built
        }
        Err(e) => {
            log::error!("Failed to link the init program! ({e})");
            InitBuild::LinkFailed(e)
        }
    }
}

/// `nasm -felf64 init.asm -o init.o`
pub fn assemble_cmd(paths: &ProjectPaths) -> Cmd {
    Cmd::new("nasm")
        .arg("-felf64")
        .arg_path(&paths.init_source)
        .arg("-o")
        .arg_path(&paths.init_object)
        .current_dir(&paths.root)
        .error_msg("nasm failed")
}

/// `ld -o init init.o`
pub fn link_cmd(paths: &ProjectPaths) -> Cmd {
    Cmd::new("ld")
        .arg("-o")
        .arg_path(&paths.init_binary)
        .arg_path(&paths.init_object)
        .current_dir(&paths.root)
        .error_msg("ld failed")
}
