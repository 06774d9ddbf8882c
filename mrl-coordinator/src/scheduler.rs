use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use common::task::{
    Assignment, JobPhase, MapSpec, MapTask, Progress, ReduceSpec, ReduceTask, TaskMeta, TaskSpec,
    TaskState,
};
use common::utils::intermediate_name;

/// How long an `Executing` task may go unreported before it is handed out again.
pub const TASK_TIMEOUT: Duration = Duration::from_secs(10);

/// Task state of a single job.
///
/// Every method is a complete read-decide-mutate step; callers serving
/// concurrent requests must hold one lock around each call.
#[derive(Debug)]
pub struct Scheduler {
    /// The current phase of the job.
    phase: JobPhase,

    /// Number of reduce partitions.
    n_reduce: u32,

    /// One task per input, in input order.
    map_tasks: Vec<MapTask>,

    /// One task per partition, indexed by partition.
    reduce_tasks: Vec<ReduceTask>,

    /// Ids of finished map tasks. Their intermediate files are what reduce
    /// tasks get to read.
    mapped_ids: BTreeSet<u32>,

    /// Last map id handed out. Ids are never reused.
    max_task_id: u32,

    /// Staleness threshold.
    timeout: Duration,
}

impl Scheduler {
    /// A job mapping `inputs` into `n_reduce` partitions.
    ///
    /// # Panics
    ///
    /// If there are inputs but `n_reduce` is zero: no map task could ever
    /// succeed, so the job would never finish.
    pub fn new(inputs: Vec<String>, n_reduce: u32) -> Self {
        assert!(
            n_reduce > 0 || inputs.is_empty(),
            "a job with inputs needs at least one reduce partition"
        );

        let mut scheduler = Self {
            phase: JobPhase::Mapping,
            n_reduce,
            map_tasks: inputs.into_iter().map(MapTask::new).collect(),
            reduce_tasks: (0..n_reduce).map(ReduceTask::new).collect(),
            mapped_ids: BTreeSet::new(),
            max_task_id: 0,
            timeout: TASK_TIMEOUT,
        };

        // A phase without tasks is complete before anyone asks.
        scheduler.advance();
        scheduler
    }

    /// Override the staleness threshold.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn n_reduce(&self) -> u32 {
        self.n_reduce
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn done(&self) -> bool {
        self.phase == JobPhase::Done
    }

    pub fn request_task(&mut self) -> Assignment {
        self.request_task_at(Instant::now())
    }

    /// Hand out the first pending task of the current phase, as seen at `now`.
    ///
    /// Executing tasks passed on the way are checked for staleness and put
    /// back to `Pending` if their worker has been silent for too long.
    pub fn request_task_at(&mut self, now: Instant) -> Assignment {
        let timeout = self.timeout;

        match self.phase {
            JobPhase::Mapping => {
                for task in self.map_tasks.iter_mut() {
                    reclaim_if_stale(&mut task.meta, now, timeout);
                    if task.meta.state != TaskState::Pending {
                        continue;
                    }

                    let Some(id) = self.max_task_id.checked_add(1) else {
                        error!(input = %task.input, "map task ids exhausted");
                        return Assignment::Wait;
                    };
                    self.max_task_id = id;
                    task.meta.id = Some(id);
                    task.meta.start(now);

                    info!(id, input = %task.input, "assigned map task");
                    return Assignment::Run {
                        n_reduce: self.n_reduce,
                        task: TaskSpec::Map(MapSpec {
                            id,
                            input: task.input.clone(),
                        }),
                    };
                }
            }
            JobPhase::Reducing => {
                for task in self.reduce_tasks.iter_mut() {
                    reclaim_if_stale(&mut task.meta, now, timeout);
                    if task.meta.state != TaskState::Pending {
                        continue;
                    }

                    let partition = task.partition();
                    task.meta.start(now);
                    task.intermediate = self
                        .mapped_ids
                        .iter()
                        .map(|map_id| intermediate_name(*map_id, partition))
                        .collect();

                    info!(id = partition, inputs = task.intermediate.len(), "assigned reduce task");
                    return Assignment::Run {
                        n_reduce: self.n_reduce,
                        task: TaskSpec::Reduce(ReduceSpec {
                            id: partition,
                            intermediate: task.intermediate.clone(),
                        }),
                    };
                }
            }
            JobPhase::Done => {}
        }

        debug!(phase = %self.phase, "no task to assign");
        Assignment::Wait
    }

    /// Record that task `id` finished.
    ///
    /// Reports for unknown ids, for tasks of a phase that has already
    /// passed, or for tasks that already finished change nothing.
    pub fn finish(&mut self, is_map: bool, id: u32) {
        let current_is_map = match self.phase {
            JobPhase::Mapping => true,
            JobPhase::Reducing => false,
            JobPhase::Done => {
                debug!(is_map, id, "ignoring completion, job is done");
                return;
            }
        };

        if is_map != current_is_map {
            warn!(is_map, id, phase = %self.phase, "ignoring completion from another phase");
            return;
        }

        let meta = if is_map {
            self.map_tasks
                .iter_mut()
                .map(|task| &mut task.meta)
                .find(|meta| meta.id == Some(id))
        } else {
            self.reduce_tasks
                .iter_mut()
                .map(|task| &mut task.meta)
                .find(|meta| meta.id == Some(id))
        };

        let Some(meta) = meta else {
            warn!(is_map, id, "ignoring completion of unknown task");
            return;
        };

        if meta.state == TaskState::Finished {
            debug!(is_map, id, "task already finished");
            return;
        }

        meta.state = TaskState::Finished;
        if is_map {
            self.mapped_ids.insert(id);
        }
        info!(is_map, id, "task finished");

        self.advance();
    }

    /// Task counts of the current phase.
    pub fn progress(&self) -> Progress {
        let metas: Vec<&TaskMeta> = match self.phase {
            JobPhase::Mapping => self.map_tasks.iter().map(|task| &task.meta).collect(),
            JobPhase::Reducing | JobPhase::Done => {
                self.reduce_tasks.iter().map(|task| &task.meta).collect()
            }
        };

        let count = |state: TaskState| metas.iter().filter(|meta| meta.state == state).count() as u32;

        Progress {
            phase: self.phase,
            pending: count(TaskState::Pending),
            executing: count(TaskState::Executing),
            finished: count(TaskState::Finished),
        }
    }

    /// Move to the next phase for as long as the current one is complete.
    fn advance(&mut self) {
        loop {
            let complete = match self.phase {
                JobPhase::Mapping => all_finished(self.map_tasks.iter().map(|t| &t.meta)),
                JobPhase::Reducing => all_finished(self.reduce_tasks.iter().map(|t| &t.meta)),
                JobPhase::Done => return,
            };

            if !complete {
                return;
            }

            self.phase = match self.phase {
                JobPhase::Mapping => JobPhase::Reducing,
                _ => JobPhase::Done,
            };
            info!(phase = %self.phase, "job advanced");
        }
    }
}

fn reclaim_if_stale(meta: &mut TaskMeta, now: Instant, timeout: Duration) {
    if meta.is_stale(now, timeout) {
        debug!(id = ?meta.id, "task timed out, reassigning");
        meta.state = TaskState::Pending;
    }
}

fn all_finished<'a>(mut metas: impl Iterator<Item = &'a TaskMeta>) -> bool {
    metas.all(|meta| meta.state == TaskState::Finished)
}
