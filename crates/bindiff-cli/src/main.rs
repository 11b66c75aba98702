//! modpatch-bindiff - Create or apply binary deltas
//!
//! Usage:
//!   modpatch-bindiff create <old> <new> [-o patch.bin]
//!   modpatch-bindiff apply <patch> <target> [-o patched_output]
//!
//! Exit codes: 0 on success, 1 if the operation failed, 2 if an input is missing.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use modpatch::delta::{apply_patch_file, create_patch_file};
use modpatch::Error;

const EXIT_FAILURE: u8 = 1;
const EXIT_MISSING_INPUT: u8 = 2;

#[derive(Parser)]
#[command(name = "modpatch-bindiff")]
#[command(version)]
#[command(about = "Create or apply binary delta patches for files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a patch from OLD to NEW
    Create {
        /// Path to the old/original file
        old: PathBuf,
        /// Path to the new/modified file
        new: PathBuf,
        /// Output patch file path
        #[arg(short, long, default_value = "patch.bin")]
        out: PathBuf,
    },
    /// Apply a patch to a target file
    Apply {
        /// Path to the patch file
        patch: PathBuf,
        /// Path to the target (old) file to patch
        target: PathBuf,
        /// Output file path for the patched result
        #[arg(short, long, default_value = "patched_output")]
        out: PathBuf,
    },
}

fn exit_code_for(err: &Error) -> u8 {
    match err {
        Error::MissingInput(_) => EXIT_MISSING_INPUT,
        _ => EXIT_FAILURE,
    }
}

fn create(old: &Path, new: &Path, out: &Path) -> u8 {
    match create_patch_file(old, new, out) {
        Ok(_) => {
            println!("Patch created successfully: {}", out.display());
            0
        }
        Err(e) => {
            eprintln!("Failed to create patch: {}", e);
            exit_code_for(&e)
        }
    }
}

fn apply(patch: &Path, target: &Path, out: &Path) -> u8 {
    match apply_patch_file(patch, target, out) {
        Ok(_) => {
            println!("Patch applied successfully. Wrote: {}", out.display());
            0
        }
        Err(e) => {
            eprintln!("Failed to apply patch: {}", e);
            exit_code_for(&e)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Create { old, new, out } => create(&old, &new, &out),
        Commands::Apply { patch, target, out } => apply(&patch, &target, &out),
    };
    ExitCode::from(code)
}
