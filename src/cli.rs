//! Command-line interface definitions for dupwalk.
//!
//! # Example
//!
//! ```bash
//! # Walk two trees, keeping checkpoints in ./session
//! dupwalk ~/photos /mnt/backup/photos
//!
//! # Rerun after an interruption: the walk log is reused, sizes and hashes resume
//! dupwalk
//!
//! # Leave a subtree out of the report and print JSON
//! dupwalk ~/photos --ignore ~/photos/thumbnails --output json
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Resumable duplicate file finder.
///
/// Walks the given folders, records every file's size and content hash in
/// checkpoint logs, and groups duplicates by the directories they live in.
/// An interrupted run picks up where it stopped when started again with the
/// same temp-data directory.
#[derive(Debug, Parser)]
#[command(name = "dupwalk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Folders to scan (optional when a walk log already exists)
    #[arg(value_name = "FOLDER")]
    pub folders: Vec<PathBuf>,

    /// Leave files under this directory out of the report (repeatable)
    #[arg(long, value_name = "DIR")]
    pub ignore: Vec<PathBuf>,

    /// Directory for the checkpoint logs [default: session]
    #[arg(long, value_name = "DIR")]
    pub temp_datadir: Option<PathBuf>,

    /// Output format for the report
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Read block size for hashing (e.g. 64KiB, 4MiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub hash_block_size: Option<u64>,

    /// Follow symbolic links while walking
    ///
    /// Warning: Files reachable through several links are counted repeatedly.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Path to a TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors and the report
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain-text listing, one block per directory signature
    Text,
    /// JSON document for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Accepts plain byte counts and SI or IEC suffixes, case-insensitive.
///
/// # Examples
///
/// ```
/// use dupwalk::cli::parse_size;
///
/// assert_eq!(parse_size("4096").unwrap(), 4096);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// ```
///
/// # Errors
///
/// Returns a message for clap if the string is not a size or is zero.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let size: bytesize::ByteSize = s.trim().parse().map_err(|e| format!("Invalid size '{s}': {e}"))?;
    match size.as_u64() {
        0 => Err("Size must be greater than zero".to_string()),
        bytes => Ok(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("64KiB").unwrap(), 65_536);
        assert_eq!(parse_size("4 MiB").unwrap(), 4 * 1_048_576);
        assert_eq!(parse_size("1kb").unwrap(), 1_000);
    }

    #[test]
    fn test_parse_size_errors() {
        assert!(parse_size("").is_err());
        assert!(parse_size("lots").is_err());
        assert!(parse_size("0").is_err());
    }

    #[test]
    fn test_cli_parse_help() {
        assert!(Cli::try_parse_from(["dupwalk", "--help"]).is_err());
    }

    #[test]
    fn test_cli_no_folders() {
        let cli = Cli::try_parse_from(["dupwalk"]).unwrap();
        assert!(cli.folders.is_empty());
        assert_eq!(cli.output, OutputFormat::Text);
        assert_eq!(cli.temp_datadir, None);
    }

    #[test]
    fn test_cli_parse_all_flags() {
        let cli = Cli::try_parse_from([
            "dupwalk",
            "/a",
            "/b",
            "--ignore",
            "/a/x",
            "--ignore",
            "/b/y",
            "--temp-datadir",
            "/tmp/s",
            "--output",
            "json",
            "--hash-block-size",
            "64KiB",
            "--no-progress",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.folders, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(cli.ignore, vec![PathBuf::from("/a/x"), PathBuf::from("/b/y")]);
        assert_eq!(cli.temp_datadir, Some(PathBuf::from("/tmp/s")));
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.hash_block_size, Some(65_536));
        assert!(cli.no_progress);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["dupwalk", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
