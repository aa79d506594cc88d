// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command-line surface: `put`/`get`/`ls`/`node-stats` subcommands, each
//! either taking flags directly or loading a YAML job file (`--config`).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "dfs-client")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a file, striping it into replicated fragments.
    Put {
        /// Path to the local file to upload.
        file: Option<PathBuf>,

        /// Controller address, e.g. 127.0.0.1:9001.
        #[arg(long)]
        controller: Option<String>,

        /// Fragment size in bytes; defaults to the controller's configured size.
        #[arg(long)]
        chunk_size: Option<u64>,

        /// Load a PUT job from a YAML file instead of the flags above.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Download a file by name and reassemble it.
    Get {
        /// Name of the file as known to the controller.
        file: Option<String>,

        #[arg(long)]
        controller: Option<String>,

        /// Directory to write the reassembled file into.
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Load a GET job from a YAML file instead of the flags above.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List every file name known to the controller.
    Ls {
        #[arg(long)]
        controller: String,
    },

    /// Show live storage-node statistics.
    NodeStats {
        #[arg(long)]
        controller: String,
    },
}
