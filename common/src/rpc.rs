//! The wire contract between coordinator and workers.
//!
//! gRPC stubs generated from `protos/coordinator.proto`, conversions to the
//! task model, and the Unix socket plumbing both sides share.

use std::path::{Path, PathBuf};

use tokio::net::UnixStream;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;

use crate::task::{Assignment, JobPhase, MapSpec, Progress, ReduceSpec, TaskSpec};

pub mod coordinator {
    tonic::include_proto!("coordinator");
}

pub use coordinator::coordinator_client::CoordinatorClient;
pub use coordinator::coordinator_server::{Coordinator, CoordinatorServer};
pub use coordinator::{
    FinishRequest, FinishResponse, RequestTaskRequest, StatusRequest, StatusResponse, TaskReply,
};

/// Socket the coordinator of the invoking user listens on.
///
/// Keyed by user name so that jobs of different users on one machine
/// don't collide.
pub fn default_socket_path() -> PathBuf {
    PathBuf::from(format!("/var/tmp/mrl-{}", whoami::username()))
}

/// Open a channel to a coordinator listening on the Unix socket at `path`.
pub async fn connect(path: &Path) -> Result<CoordinatorClient<Channel>, tonic::transport::Error> {
    let path = path.to_path_buf();

    // The URI is required by the endpoint but ignored by the connector.
    let channel = Endpoint::from_static("http://[::]:50051")
        .connect_with_connector(service_fn(move |_: Uri| UnixStream::connect(path.clone())))
        .await?;

    Ok(CoordinatorClient::new(channel))
}

/////////////////////////////////////////////////////////////////////////////
// Conversions
/////////////////////////////////////////////////////////////////////////////

impl From<Assignment> for TaskReply {
    fn from(assignment: Assignment) -> Self {
        use coordinator::task_reply::Task;

        match assignment {
            Assignment::Wait => TaskReply {
                n_reduce: 0,
                task: None,
            },
            Assignment::Run { n_reduce, task } => {
                let task = match task {
                    TaskSpec::Map(spec) => Task::MapTask(coordinator::MapTask {
                        id: spec.id,
                        input: spec.input,
                    }),
                    TaskSpec::Reduce(spec) => Task::ReduceTask(coordinator::ReduceTask {
                        id: spec.id,
                        intermediate: spec.intermediate,
                    }),
                };
                TaskReply {
                    n_reduce,
                    task: Some(task),
                }
            }
        }
    }
}

impl From<TaskReply> for Assignment {
    fn from(reply: TaskReply) -> Self {
        use coordinator::task_reply::Task;

        let task = match reply.task {
            None => return Assignment::Wait,
            Some(Task::MapTask(map)) => TaskSpec::Map(MapSpec {
                id: map.id,
                input: map.input,
            }),
            Some(Task::ReduceTask(reduce)) => TaskSpec::Reduce(ReduceSpec {
                id: reduce.id,
                intermediate: reduce.intermediate,
            }),
        };

        Assignment::Run {
            n_reduce: reply.n_reduce,
            task,
        }
    }
}

impl From<JobPhase> for coordinator::Phase {
    fn from(phase: JobPhase) -> Self {
        match phase {
            JobPhase::Mapping => coordinator::Phase::Mapping,
            JobPhase::Reducing => coordinator::Phase::Reducing,
            JobPhase::Done => coordinator::Phase::Done,
        }
    }
}

impl From<coordinator::Phase> for JobPhase {
    fn from(phase: coordinator::Phase) -> Self {
        match phase {
            coordinator::Phase::Mapping => JobPhase::Mapping,
            coordinator::Phase::Reducing => JobPhase::Reducing,
            coordinator::Phase::Done => JobPhase::Done,
        }
    }
}

impl From<Progress> for StatusResponse {
    fn from(progress: Progress) -> Self {
        let mut response = StatusResponse {
            phase: 0,
            pending: progress.pending,
            executing: progress.executing,
            finished: progress.finished,
        };
        response.set_phase(progress.phase.into());
        response
    }
}

impl From<StatusResponse> for Progress {
    fn from(response: StatusResponse) -> Self {
        Progress {
            phase: response.phase().into(),
            pending: response.pending,
            executing: response.executing,
            finished: response.finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_cross_the_wire_intact() {
        let assignments = [
            Assignment::Wait,
            Assignment::Run {
                n_reduce: 4,
                task: TaskSpec::Map(MapSpec {
                    id: 9,
                    input: "pg-grimm.txt".into(),
                }),
            },
            Assignment::Run {
                n_reduce: 4,
                task: TaskSpec::Reduce(ReduceSpec {
                    id: 2,
                    intermediate: vec!["mr-1-2".into(), "mr-3-2".into()],
                }),
            },
        ];

        for assignment in assignments {
            let reply = TaskReply::from(assignment.clone());
            assert_eq!(Assignment::from(reply), assignment);
        }
    }

    #[test]
    fn wait_has_no_task() {
        let reply = TaskReply::from(Assignment::Wait);
        assert!(reply.task.is_none());
    }

    #[test]
    fn status_carries_phase() {
        let progress = Progress {
            phase: JobPhase::Reducing,
            pending: 1,
            executing: 2,
            finished: 3,
        };
        let response = StatusResponse::from(progress);
        assert_eq!(response.phase(), coordinator::Phase::Reducing);
        assert_eq!(Progress::from(response), progress);
    }

    #[test]
    fn default_socket_is_per_user() {
        let path = default_socket_path();
        assert!(path.starts_with("/var/tmp"));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("mrl-"));
    }
}
