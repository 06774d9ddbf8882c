use anyhow::anyhow;
use bytes::Bytes;
use clap::Parser;
use tracing::info;

mod args;
use args::Args;

use common::rpc::default_socket_path;
use mrl_worker::MRWorker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let workload = workload::try_named(&args.workload)
        .ok_or_else(|| anyhow!("The workload `{}` is not a known workload", args.workload))?;

    let socket = args.socket.unwrap_or_else(default_socket_path);
    info!(
        workload = %args.workload,
        work_dir = %args.work_dir.display(),
        "worker joining coordinator at {}",
        socket.display()
    );

    MRWorker::new(workload)
        .with_aux(Bytes::from(args.aux.join(" ")))
        .with_work_dir(args.work_dir)
        .connect_and_run(&socket)
        .await
}
