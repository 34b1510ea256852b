use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::platform::ClipboardMode;

#[derive(Parser)]
#[command(name = "platformd", about = "Platform channel host for an embedded UI engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve the flutter/platform channel
    Serve {
        /// Socket path (default: $XDG_RUNTIME_DIR/platformd/platform.sock)
        #[arg(long)]
        socket: Option<PathBuf>,

        /// Clipboard backing Clipboard.* calls
        #[arg(long, value_enum, default_value = "memory")]
        clipboard: ClipboardMode,
    },

    /// Send one method call to a running host
    Call {
        /// Method name, e.g. Clipboard.getData
        method: String,

        /// Arguments as JSON, e.g. '"text/plain"'
        #[arg(long)]
        args: Option<String>,

        /// Socket path (default: $XDG_RUNTIME_DIR/platformd/platform.sock)
        #[arg(long)]
        socket: Option<PathBuf>,
    },
}
