use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use common::rpc::coordinator::task_reply::Task;
use common::rpc::{connect, FinishRequest, RequestTaskRequest};
use common::task::{Assignment, JobPhase, TaskSpec};
use common::utils::output_name;
use mrl_coordinator::{bind, serve, MRCoordinator, Scheduler};
use mrl_worker::MRWorker;

const WORKER_POLL: Duration = Duration::from_millis(20);
const JOB_LIMIT: Duration = Duration::from_secs(30);

/// A coordinator serving on a socket inside its own scratch directory.
struct Cluster {
    dir: TempDir,
    socket: PathBuf,
    coordinator: MRCoordinator,
    stop: oneshot::Sender<()>,
}

impl Cluster {
    async fn start(contents: &[&str], n_reduce: u32, timeout: Duration) -> Cluster {
        let dir = tempfile::tempdir().unwrap();

        let inputs = contents
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let path = dir.path().join(format!("pg-{i}.txt"));
                fs::write(&path, text).unwrap();
                path.to_string_lossy().into_owned()
            })
            .collect();

        let socket = dir.path().join("coordinator.sock");
        let coordinator = MRCoordinator::new(Scheduler::new(inputs, n_reduce).with_timeout(timeout));
        let listener = bind(&socket).unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        tokio::spawn(serve(coordinator.clone(), listener, async move {
            let _ = stopped.await;
        }));

        Cluster {
            dir,
            socket,
            coordinator,
            stop,
        }
    }

    fn work_dir(&self) -> &Path {
        self.dir.path()
    }

    fn spawn_workers(&self, count: usize) -> Vec<JoinHandle<anyhow::Result<()>>> {
        (0..count)
            .map(|_| {
                let worker = MRWorker::new(workload::try_named("wc").unwrap())
                    .with_work_dir(self.work_dir())
                    .with_poll_interval(WORKER_POLL);
                let socket = self.socket.clone();
                tokio::spawn(async move { worker.connect_and_run(&socket).await })
            })
            .collect()
    }

    async fn wait_done(&self) {
        tokio::time::timeout(JOB_LIMIT, async {
            while !self.coordinator.done().await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("job did not finish in time");
    }

    /// Stop the coordinator and check that every worker notices and exits
    /// cleanly.
    async fn shutdown(self, workers: Vec<JoinHandle<anyhow::Result<()>>>) -> TempDir {
        let _ = self.stop.send(());
        for worker in workers {
            let result = tokio::time::timeout(JOB_LIMIT, worker)
                .await
                .expect("worker did not exit")
                .unwrap();
            assert!(result.is_ok(), "worker failed: {result:?}");
        }
        self.dir
    }
}

fn read_outputs(dir: &Path, n_reduce: u32) -> Vec<String> {
    (0..n_reduce)
        .map(|id| fs::read_to_string(dir.join(output_name(id))).unwrap())
        .collect()
}

fn output_lines(dir: &Path, n_reduce: u32) -> Vec<String> {
    let mut lines: Vec<String> = read_outputs(dir, n_reduce)
        .iter()
        .flat_map(|out| out.lines().map(str::to_string).collect::<Vec<_>>())
        .collect();
    lines.sort();
    lines
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn word_count_over_two_partitions() {
    let cluster = Cluster::start(&["a b a", "a b a"], 2, Duration::from_secs(10)).await;
    let workers = cluster.spawn_workers(2);

    cluster.wait_done().await;

    let dir = cluster.shutdown(workers).await;

    // "a" hashes to partition 0 and "b" to partition 1.
    assert_eq!(read_outputs(dir.path(), 2), vec!["a 4\n", "b 2\n"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn outputs_exist_once_the_job_is_done() {
    let texts = [
        "the quick brown fox",
        "jumps over the lazy dog",
        "the dog barks",
        "a fox runs",
    ];
    let cluster = Cluster::start(&texts, 3, Duration::from_secs(10)).await;
    let workers = cluster.spawn_workers(3);

    cluster.wait_done().await;
    for id in 0..3 {
        assert!(cluster.work_dir().join(output_name(id)).exists());
    }

    let dir = cluster.shutdown(workers).await;
    let lines = output_lines(dir.path(), 3);
    assert_eq!(
        lines,
        vec![
            "a 1", "barks 1", "brown 1", "dog 2", "fox 2", "jumps 1", "lazy 1", "over 1",
            "quick 1", "runs 1", "the 3",
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn crashed_map_worker_is_replaced_under_a_new_id() {
    let timeout = Duration::from_millis(300);
    let cluster = Cluster::start(&["x y x"], 1, timeout).await;

    // A worker that takes the only map task and dies without reporting.
    let mut crashed = connect(&cluster.socket).await.unwrap();
    let reply = crashed
        .request_task(RequestTaskRequest {})
        .await
        .unwrap()
        .into_inner();
    let Some(Task::MapTask(first)) = reply.task else {
        panic!("expected a map task");
    };

    // Still within the timeout: nothing to hand out.
    let reply = crashed
        .request_task(RequestTaskRequest {})
        .await
        .unwrap()
        .into_inner();
    assert!(reply.task.is_none());

    tokio::time::sleep(timeout * 2).await;

    let reply = crashed
        .request_task(RequestTaskRequest {})
        .await
        .unwrap()
        .into_inner();
    let Some(Task::MapTask(second)) = reply.task else {
        panic!("expected the map task again");
    };
    assert_eq!(second.input, first.input);
    assert_ne!(second.id, first.id);
    drop(crashed);

    // Real workers pick the task up once it times out again.
    let workers = cluster.spawn_workers(2);
    cluster.wait_done().await;

    let dir = cluster.shutdown(workers).await;
    assert_eq!(output_lines(dir.path(), 1), vec!["x 2", "y 1"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_reduce_produces_identical_output() {
    let texts = ["one two three two", "three three one", "four"];

    // Baseline: a clean run.
    let baseline = Cluster::start(&texts, 1, Duration::from_secs(10)).await;
    let workers = baseline.spawn_workers(2);
    baseline.wait_done().await;
    let baseline_dir = baseline.shutdown(workers).await;
    let expected = read_outputs(baseline_dir.path(), 1);
    assert_eq!(expected, vec!["four 1\none 2\nthree 3\ntwo 2\n"]);

    let timeout = Duration::from_millis(300);
    let cluster = Cluster::start(&texts, 1, timeout).await;
    let slow = MRWorker::new(workload::try_named("wc").unwrap()).with_work_dir(cluster.work_dir());
    let mut client = connect(&cluster.socket).await.unwrap();

    // The slow worker runs every map task itself, then takes the only
    // reduce task and sits on it past the timeout.
    let (n_reduce, stale) = loop {
        let reply = client
            .request_task(RequestTaskRequest {})
            .await
            .unwrap()
            .into_inner();
        match Assignment::from(reply) {
            Assignment::Run {
                n_reduce,
                task: TaskSpec::Map(spec),
            } => {
                let id = spec.id;
                slow.execute(n_reduce, TaskSpec::Map(spec)).unwrap();
                client
                    .finish(FinishRequest { is_map: true, id })
                    .await
                    .unwrap();
            }
            Assignment::Run {
                n_reduce,
                task: TaskSpec::Reduce(spec),
            } => break (n_reduce, spec),
            Assignment::Wait => panic!("no other worker holds a task"),
        }
    };
    assert_eq!(stale.intermediate.len(), texts.len());

    // Another worker picks the reduce task up once it times out and
    // finishes the job.
    let workers = cluster.spawn_workers(1);
    cluster.wait_done().await;
    let reassigned = fs::read(cluster.work_dir().join(output_name(stale.id))).unwrap();

    // The slow worker completes anyway; its rename lands last.
    let id = stale.id;
    slow.execute(n_reduce, TaskSpec::Reduce(stale)).unwrap();
    client
        .finish(FinishRequest { is_map: false, id })
        .await
        .unwrap();
    drop(client);

    assert_eq!(cluster.coordinator.progress().await.phase, JobPhase::Done);

    let dir = cluster.shutdown(workers).await;
    let outputs = read_outputs(dir.path(), 1);
    assert_eq!(outputs, expected);
    assert_eq!(outputs[0].as_bytes(), reassigned.as_slice());
}

#[tokio::test]
async fn worker_exits_when_coordinator_is_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("nobody-listens.sock");

    let worker = MRWorker::new(workload::try_named("wc").unwrap())
        .with_work_dir(dir.path())
        .with_poll_interval(WORKER_POLL);

    let result = tokio::time::timeout(JOB_LIMIT, worker.connect_and_run(&socket))
        .await
        .expect("worker kept running");
    assert!(result.is_ok());
}
