// src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// Watch a directory tree and run a command on change.
#[derive(Parser, Debug)]
#[command(name = "vigil", version, about)]
pub struct Cli {
    /// Directory to watch (defaults to the current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Regular expressions for paths to ignore; dotfiles when omitted.
    /// Directories are matched with a trailing `/` appended.
    #[arg(long = "ignore", value_name = "REGEX")]
    pub ignore: Vec<String>,

    /// Grace period between SIGINT and SIGKILL when restarting the command,
    /// in milliseconds
    #[arg(long, default_value = "1000")]
    pub kill_delay_ms: u64,

    /// Verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to (re)run on every event
    #[arg(last = true, value_name = "CMD")]
    pub command: Vec<String>,
}
