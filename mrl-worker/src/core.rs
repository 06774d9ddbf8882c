use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Error;
use bytes::Bytes;
use tonic::transport::Channel;
use tracing::{debug, error, info};

use common::rpc::{connect, CoordinatorClient, FinishRequest, RequestTaskRequest};
use common::task::{Assignment, TaskSpec};
use common::Workload;

use crate::{map, reduce};

/// Pause between two task requests.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A worker: asks the coordinator for tasks and runs them with its workload
/// until the coordinator goes away.
#[derive(Debug, Clone)]
pub struct MRWorker {
    workload: Workload,

    /// Auxiliary argument handed to both callbacks.
    aux: Bytes,

    /// Where intermediate and output files are written.
    work_dir: PathBuf,

    poll_interval: Duration,
}

impl MRWorker {
    pub fn new(workload: Workload) -> MRWorker {
        MRWorker {
            workload,
            aux: Bytes::new(),
            work_dir: PathBuf::from("."),
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_aux(mut self, aux: Bytes) -> Self {
        self.aux = aux;
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Connect to the coordinator at `socket` and [`run`](Self::run).
    pub async fn connect_and_run(&self, socket: &Path) -> Result<(), Error> {
        let client = match connect(socket).await {
            Ok(client) => client,
            Err(e) => {
                info!("coordinator at {} unreachable ({e}), exiting", socket.display());
                return Ok(());
            }
        };

        self.run(client).await
    }

    /// The worker loop.
    ///
    /// Returns `Ok` once the coordinator stops answering. Any failure while
    /// executing a task is returned as is; the coordinator will hand the
    /// abandoned task to someone else after its timeout.
    pub async fn run(&self, mut client: CoordinatorClient<Channel>) -> Result<(), Error> {
        loop {
            tokio::time::sleep(self.poll_interval).await;

            let reply = match client.request_task(RequestTaskRequest {}).await {
                Ok(reply) => reply.into_inner(),
                Err(status) => {
                    info!("coordinator unreachable ({}), exiting", status.message());
                    return Ok(());
                }
            };

            let (n_reduce, task) = match Assignment::from(reply) {
                Assignment::Wait => {
                    debug!("no task available");
                    continue;
                }
                Assignment::Run { n_reduce, task } => (n_reduce, task),
            };

            let (is_map, id) = (task.is_map(), task.id());

            if let Err(e) = self.execute_blocking(n_reduce, task).await {
                error!(is_map, id, "task failed: {e:#}");
                return Err(e);
            }

            if let Err(status) = client.finish(FinishRequest { is_map, id }).await {
                info!("coordinator unreachable ({}), exiting", status.message());
                return Ok(());
            }
        }
    }

    /// Run one task to completion.
    pub fn execute(&self, n_reduce: u32, task: TaskSpec) -> Result<(), Error> {
        match task {
            TaskSpec::Map(spec) => map::perform_map(
                &spec,
                n_reduce,
                &self.workload,
                self.aux.clone(),
                &self.work_dir,
            ),
            TaskSpec::Reduce(spec) => {
                reduce::perform_reduce(&spec, &self.workload, self.aux.clone(), &self.work_dir)
            }
        }
    }

    /// [`execute`](Self::execute) off the async runtime, since tasks do
    /// blocking file I/O.
    async fn execute_blocking(&self, n_reduce: u32, task: TaskSpec) -> Result<(), Error> {
        let worker = self.clone();
        tokio::task::spawn_blocking(move || worker.execute(n_reduce, task)).await?
    }
}
