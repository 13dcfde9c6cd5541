//! ftpseek: find a file on an FTP server and download it

mod args;
mod config;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use ftpseek_core::{FtpTransport, RetrieveError, Retriever};

use args::Args;
use config::{Config, ConfigError};

/// Exit status when the file or directory does not exist
const EXIT_NOT_FOUND: u8 = 2;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Retrieve(#[from] RetrieveError),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),

    #[error("failed to encode metadata: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            Self::Retrieve(e) if e.is_not_found() => ExitCode::from(EXIT_NOT_FOUND),
            _ => ExitCode::FAILURE,
        }
    }
}

/// Install the stderr log subscriber
///
/// `--debug` forces the `debug` level; otherwise `RUST_LOG` applies, falling
/// back to warnings only.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ftpseek: {e}");
            e.exit_code()
        }
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    let config = Config::load(args.config.as_deref())?;
    debug!(?config, "loaded configuration");

    let endpoint = config.endpoint(&args)?;
    let retriever =
        Retriever::new(endpoint, Arc::new(FtpTransport::new())).with_hints(config.hints);

    if args.meta {
        let entry = retriever.get_meta(&args.filename, &args.path).await?;
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }

    let written = match &args.output {
        Some(path) => download_to_file(&retriever, &args, path).await?,
        None => {
            let mut stdout = tokio::io::stdout();
            retriever
                .get_to_writer(&args.filename, &args.path, args.offset, &mut stdout)
                .await?
        }
    };

    info!(filename = %args.filename, bytes = written, "download complete");
    Ok(())
}

/// Sibling of `path` the download is staged in
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Download into `path`, leaving it untouched unless the transfer succeeds
async fn download_to_file(retriever: &Retriever, args: &Args, path: &Path) -> Result<u64, CliError> {
    let partial = partial_path(path);
    let mut file = tokio::fs::File::create(&partial).await?;

    let result = retriever
        .get_to_writer(&args.filename, &args.path, args.offset, &mut file)
        .await;
    drop(file);

    match result {
        Ok(written) => {
            tokio::fs::rename(&partial, path).await?;
            Ok(written)
        }
        Err(e) => {
            if let Err(remove) = tokio::fs::remove_file(&partial).await {
                debug!(path = %partial.display(), error = %remove, "failed to remove partial download");
            }
            Err(e.into())
        }
    }
}
