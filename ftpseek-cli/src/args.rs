//! Command-line argument parsing

use std::path::PathBuf;

use clap::Parser;

/// Get default config path help text for current platform
fn default_config_help() -> String {
    #[cfg(target_os = "linux")]
    return "Config file path (default: ~/.config/ftpseek/config.json)".to_string();

    #[cfg(target_os = "macos")]
    return "Config file path (default: ~/Library/Application Support/ftpseek/config.json)"
        .to_string();

    #[cfg(target_os = "windows")]
    return "Config file path (default: %APPDATA%\\ftpseek\\config.json)".to_string();

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    return "Config file path (overrides platform default)".to_string();
}

/// Find a file on an FTP server and download it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Name of the file to find
    pub filename: String,

    /// FTP server hostname
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// FTP control port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Login name
    #[arg(short, long)]
    pub user: Option<String>,

    /// Login password
    #[arg(long)]
    pub password: Option<String>,

    /// Maximum concurrent connections the server accepts
    #[arg(short = 'c', long = "max-connections")]
    pub max_connections: Option<usize>,

    /// Connect and command timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Directory the file is expected in; searched recursively if it is not
    /// directly inside (default: the whole server)
    #[arg(long, default_value = "")]
    pub path: String,

    /// Byte offset to start the download from
    #[arg(short, long, default_value_t = 0)]
    pub offset: u64,

    /// Write the file here instead of stdout
    #[arg(short = 'O', long)]
    pub output: Option<PathBuf>,

    /// Print the file's metadata as JSON instead of downloading it
    #[arg(long, default_value = "false")]
    pub meta: bool,

    /// Config file path (overrides platform default)
    #[arg(long, help = default_config_help())]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, default_value = "false")]
    pub debug: bool,
}
