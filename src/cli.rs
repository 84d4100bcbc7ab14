use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "subpair")]
#[command(version = "0.1.0")]
#[command(about = "Match dropped subtitles to their videos before upload", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file (defaults to ~/.config/subpair/config.yaml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(short, long, global = true, default_value = "false")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Pair the videos and subtitles found under the given paths
    Pair {
        /// Files or folders, as they would be dropped
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Minimum similarity (0-1) for a subtitle to be matched
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Hash files and guess language/movie before the final pairing
        #[arg(short, long, default_value = "false")]
        enrich: bool,

        /// Print the result as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
    /// List what would be collected from the given paths
    Scan {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Print the collection as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
    /// Write the default configuration to the config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(short, long, default_value = "false")]
        force: bool,
    },
}
