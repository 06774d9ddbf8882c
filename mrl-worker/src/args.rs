use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Unix socket of the coordinator. Defaults to `/var/tmp/mrl-<user>`.
    #[arg(short, long)]
    pub socket: Option<PathBuf>,

    /// Name of the workload to run.
    #[arg(short, long, default_value = "wc")]
    pub workload: String,

    /// Directory for intermediate and output files.
    #[arg(short = 'd', long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Auxiliary arguments to pass to the MapReduce application.
    #[clap(value_parser, last = true)]
    pub aux: Vec<String>,
}
