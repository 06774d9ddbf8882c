mod args;

use std::time::Duration;

use args::Args;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use common::rpc::default_socket_path;
use mrl_coordinator::{bind, serve, MRCoordinator, Scheduler};

/// How often the job is checked for completion.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Retrieve server configuration from command line.
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let socket = args.socket.unwrap_or_else(default_socket_path);

    let scheduler = Scheduler::new(args.inputs, args.n_reduce)
        .with_timeout(Duration::from_secs(args.timeout));
    info!(
        n_reduce = scheduler.n_reduce(),
        timeout = ?scheduler.timeout(),
        "created coordinator"
    );
    let coordinator = MRCoordinator::new(scheduler);

    // Failing to bind is fatal to the whole job.
    let listener = bind(&socket)?;
    info!("CoordinatorServer listening on {}", socket.display());

    let token = CancellationToken::new();
    let shutdown = token.clone();
    let mut server = tokio::spawn(serve(coordinator.clone(), listener, async move {
        shutdown.cancelled().await
    }));

    loop {
        tokio::select! {
            result = &mut server => {
                result??;
                return Err("coordinator server stopped before the job finished".into());
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {
                if coordinator.done().await {
                    break;
                }
            }
        }
    }

    info!("job done");

    // Give workers a moment to get replies to their last reports.
    tokio::time::sleep(POLL_INTERVAL).await;
    token.cancel();
    if tokio::time::timeout(POLL_INTERVAL, server).await.is_err() {
        warn!("server did not stop in time");
    }

    let _ = std::fs::remove_file(&socket);
    Ok(())
}
