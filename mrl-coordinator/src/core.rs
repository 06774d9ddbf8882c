use std::future::Future;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use tokio::net::UnixListener;
use tokio::sync::Mutex;
use tokio_stream::wrappers::UnixListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

use common::rpc::{
    Coordinator, CoordinatorServer, FinishRequest, FinishResponse, RequestTaskRequest,
    StatusRequest, StatusResponse, TaskReply,
};
use common::task::Progress;

use crate::scheduler::Scheduler;

/// gRPC front of a [`Scheduler`].
///
/// Cheap to clone; every clone shares the same job.
#[derive(Debug, Clone)]
pub struct MRCoordinator {
    scheduler: Arc<Mutex<Scheduler>>,
}

impl MRCoordinator {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
        }
    }

    /// Whether the whole job has finished.
    pub async fn done(&self) -> bool {
        self.scheduler.lock().await.done()
    }

    pub async fn progress(&self) -> Progress {
        self.scheduler.lock().await.progress()
    }
}

#[tonic::async_trait]
impl Coordinator for MRCoordinator {
    async fn request_task(
        &self,
        _request: Request<RequestTaskRequest>,
    ) -> Result<Response<TaskReply>, Status> {
        // The lock covers the whole scan, so two callers can never pick
        // the same pending task.
        let assignment = self.scheduler.lock().await.request_task();
        Ok(Response::new(assignment.into()))
    }

    async fn finish(
        &self,
        request: Request<FinishRequest>,
    ) -> Result<Response<FinishResponse>, Status> {
        let FinishRequest { is_map, id } = request.into_inner();
        debug!(is_map, id, "completion reported");

        self.scheduler.lock().await.finish(is_map, id);
        Ok(Response::new(FinishResponse {}))
    }

    async fn status(
        &self,
        _request: Request<StatusRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let progress = self.progress().await;
        Ok(Response::new(progress.into()))
    }
}

/// Bind the coordinator socket, replacing a stale socket file left behind
/// by an earlier run.
pub fn bind(socket: &Path) -> std::io::Result<UnixListener> {
    match std::fs::remove_file(socket) {
        Ok(()) => debug!("removed stale socket {}", socket.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    UnixListener::bind(socket)
}

/// Serve `coordinator` on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    coordinator: MRCoordinator,
    listener: UnixListener,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let incoming = UnixListenerStream::new(listener);

    Server::builder()
        .add_service(CoordinatorServer::new(coordinator))
        .serve_with_incoming_shutdown(incoming, shutdown)
        .await?;

    info!("CoordinatorServer stopped");
    Ok(())
}
