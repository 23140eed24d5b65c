use clap::{Args, Subcommand};
use std::path::PathBuf;

use xesremote_frame::Language;
use xesremote_session::DEFAULT_ENDPOINT;

use crate::exit::CliResult;

pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a program on the remote backend and attach to it interactively.
    Run(RunArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Source file to run.
    pub file: PathBuf,
    /// Source language. Guessed from the file extension when omitted.
    #[arg(long, value_name = "LANG")]
    pub lang: Option<Language>,
    /// Also print the backend's echo of input typed here.
    #[arg(long)]
    pub echo: bool,
    /// Backend WebSocket endpoint.
    #[arg(long, env = "XESREMOTE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
    /// Interval between liveness frames (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s")]
    pub liveness_interval: String,
    /// Print messages with unrecognized tags to stderr.
    #[arg(long)]
    pub show_unknown: bool,
    /// Command-line arguments passed to the remote program.
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
