// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Distributed file system client: uploads files as replicated fragment
//! sets and retrieves them by name.

mod cli;
mod config;
mod dispatcher;
mod file;

use std::path::PathBuf;

use clap::Parser;
use cli::{Cli, Command};
use tracing::{error, info, Level};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Dual file+console logging: every run leaves a log file behind
    // alongside whatever's printed to the terminal.
    let file_appender = tracing_appender::rolling::never(".", "dfs-client.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stdout.and(file_writer))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Command::Put {
            file,
            controller,
            chunk_size,
            config,
        } => run_put(file, controller, chunk_size, config).await?,
        Command::Get {
            file,
            controller,
            out,
            config,
        } => run_get(file, controller, out, config).await?,
        Command::Ls { controller } => run_ls(controller).await?,
        Command::NodeStats { controller } => run_node_stats(controller).await?,
    }

    Ok(())
}

async fn run_put(
    file_arg: Option<PathBuf>,
    controller_arg: Option<String>,
    chunk_size_arg: Option<u64>,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (addr, path, chunk_size) = if let Some(config_path) = config {
        let job = config::load_put_job(&config_path)?;
        let addr = job.controller.socket_addr()?;
        let path = PathBuf::from(job.file_dir).join(job.input_file);
        (addr, path, job.chunk_size)
    } else {
        let controller = controller_arg.ok_or("--controller is required without --config")?;
        let path = file_arg.ok_or("a file path is required without --config")?;
        (controller.parse()?, path, chunk_size_arg)
    };

    let source = file::SourceFile::open(&path)?;
    info!(file = %path.display(), size = source.size(), "starting PUT");

    match dispatcher::put_file(addr, &source, chunk_size).await {
        Ok(()) => {
            info!("PUT complete");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "PUT failed");
            Err(e)
        }
    }
}

async fn run_get(
    file_arg: Option<String>,
    controller_arg: Option<String>,
    out_arg: PathBuf,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (addr, filename, out_dir) = if let Some(config_path) = config {
        let job = config::load_get_job(&config_path)?;
        let addr = job.controller.socket_addr()?;
        (addr, job.input_file, PathBuf::from(job.file_dir))
    } else {
        let controller = controller_arg.ok_or("--controller is required without --config")?;
        let filename = file_arg.ok_or("a file name is required without --config")?;
        (controller.parse()?, filename, out_arg)
    };

    info!(file = %filename, "starting GET");
    match dispatcher::get_file(addr, &filename, &out_dir).await {
        Ok(()) => {
            info!("GET complete");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "GET failed");
            Err(e)
        }
    }
}

async fn run_ls(controller: String) -> Result<(), Box<dyn std::error::Error>> {
    let addr = controller.parse()?;
    let files = dispatcher::list_files(addr).await?;
    for name in files {
        println!("{name}");
    }
    Ok(())
}

async fn run_node_stats(controller: String) -> Result<(), Box<dyn std::error::Error>> {
    let addr = controller.parse()?;
    let stats = dispatcher::node_stats(addr).await?;
    for entry in stats {
        println!("{}\t{} bytes free", entry.node_id, entry.free_space);
    }
    Ok(())
}
