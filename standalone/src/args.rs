use std::path::PathBuf;

use clap::Parser;

/// Run a workload sequentially in one process, without a coordinator.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Input files. Glob patterns are expanded.
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Name of the workload to run.
    #[arg(short, long, default_value = "wc")]
    pub workload: String,

    /// File receiving every `<key> <value>` line.
    #[arg(short, long, default_value = "mr-out-0")]
    pub output: PathBuf,

    /// Auxiliary arguments to pass to the MapReduce application.
    #[clap(value_parser, last = true)]
    pub aux: Vec<String>,
}
