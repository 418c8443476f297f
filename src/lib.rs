//! Boot image tooling for the kboot hobby kernel.
//!
//! Two independent pieces:
//!
//! - **Header validation** - checks the fixed `kb00t!` header at the start
//!   of a disk image and reports every field in one pass
//! - **Image assembly** - drives the host toolchain to produce `hd.img`
//!   and the ramdisk archive `hd.tar`
//!
//! # Architecture
//!
//! ```text
//! check-header ──────────> header::validate
//!
//! kboot-builder assemble
//!     │
//!     ├── config      kboot.toml, resolved once
//!     ├── platform    detected once, passed to every step
//!     ├── preflight   missing tools reported up front
//!     └── assembler   toolchain → disk → init → ramdisk → sources → archive
//!             │
//!             └── process::Cmd   external tools, exit status only
//! ```
//!
//! # Example
//!
//! ```rust
//! use kboot_builder::header::{validate, BootImageHeader};
//!
//! let mut image = BootImageHeader::new(0x0010_0000).to_bytes().to_vec();
//! image.extend_from_slice(b"payload");
//! assert!(validate(&image).is_valid());
//! ```

pub mod assembler;
pub mod cli;
pub mod config;
pub mod header;
pub mod logging;
pub mod platform;
pub mod preflight;
pub mod process;

pub use assembler::{assemble, AssemblyContext, AssemblyReport, TerminalStatus};
pub use config::AssemblerConfig;
pub use header::{validate, BootImageHeader, ValidationReport};
pub use platform::HostPlatform;
