use std::path::PathBuf;

use clap::{command, Parser, Subcommand};

//
// For parsing user specified command.
//
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Unix socket of the coordinator. Defaults to `/var/tmp/mrl-<user>`.
    #[arg(short, long, global = true)]
    pub socket: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Display what the coordinator is doing: the job phase and how many
    /// tasks of that phase are pending, executing and finished.
    Status,
}

pub fn parse_args() -> Args {
    Args::parse()
}
