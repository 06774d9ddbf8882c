use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Input files. Each one becomes a map task.
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Number of reduce partitions.
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    pub n_reduce: u32,

    /// Seconds a task may run unreported before it is handed to another worker.
    #[arg(short, long, default_value = "10")]
    pub timeout: u64,

    /// Unix socket to listen on. Defaults to `/var/tmp/mrl-<user>`.
    #[arg(short, long)]
    pub socket: Option<PathBuf>,
}
