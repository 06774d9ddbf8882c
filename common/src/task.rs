//! Task identity, lifecycle state and the per-phase payloads.
//!
//! The coordinator owns every [`MapTask`] and [`ReduceTask`]; workers only
//! ever see an [`Assignment`], a copy taken at the moment of dispatch.

use std::fmt;
use std::time::Instant;

/// Global stage of a job. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobPhase {
    /// Map tasks are schedulable.
    Mapping,

    /// Every map task finished, reduce tasks are schedulable.
    Reducing,

    /// Every reduce task finished.
    Done,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobPhase::Mapping => "mapping",
            JobPhase::Reducing => "reducing",
            JobPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Pending,
    Executing,
    Finished,
}

/// State shared by both kinds of task.
#[derive(Debug, Clone, Default)]
pub struct TaskMeta {
    pub state: TaskState,

    /// When the task last went `Pending -> Executing`.
    pub start_time: Option<Instant>,

    /// Map tasks get an id on every dispatch; reduce tasks are created with
    /// their partition number.
    pub id: Option<u32>,
}

impl TaskMeta {
    /// An `Executing` task whose start plus `timeout` lies before `now`.
    pub fn is_stale(&self, now: Instant, timeout: std::time::Duration) -> bool {
        match (self.state, self.start_time) {
            (TaskState::Executing, Some(start)) => start + timeout < now,
            _ => false,
        }
    }

    /// Move to `Executing`, stamping the start time.
    pub fn start(&mut self, now: Instant) {
        self.state = TaskState::Executing;
        self.start_time = Some(now);
    }
}

/// One unit of input for the mapping phase.
#[derive(Debug, Clone)]
pub struct MapTask {
    pub meta: TaskMeta,

    /// Input reference, e.g. a file path.
    pub input: String,
}

impl MapTask {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            meta: TaskMeta::default(),
            input: input.into(),
        }
    }
}

/// One output partition for the reducing phase.
#[derive(Debug, Clone)]
pub struct ReduceTask {
    pub meta: TaskMeta,

    /// Intermediate files to consume, recomputed on every dispatch.
    pub intermediate: Vec<String>,
}

impl ReduceTask {
    pub fn new(partition: u32) -> Self {
        Self {
            meta: TaskMeta {
                id: Some(partition),
                ..TaskMeta::default()
            },
            intermediate: vec![],
        }
    }

    pub fn partition(&self) -> u32 {
        // Reduce tasks are always created with an id.
        self.meta.id.unwrap_or_default()
    }
}

/// Map work handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSpec {
    pub id: u32,
    pub input: String,
}

/// Reduce work handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceSpec {
    pub id: u32,
    pub intermediate: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSpec {
    Map(MapSpec),
    Reduce(ReduceSpec),
}

impl TaskSpec {
    pub fn is_map(&self) -> bool {
        matches!(self, TaskSpec::Map(_))
    }

    pub fn id(&self) -> u32 {
        match self {
            TaskSpec::Map(spec) => spec.id,
            TaskSpec::Reduce(spec) => spec.id,
        }
    }
}

/// Answer to a task request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// Nothing assignable right now; ask again later.
    Wait,

    /// Run this task.
    Run { n_reduce: u32, task: TaskSpec },
}

/// Task counts for the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub phase: JobPhase,
    pub pending: u32,
    pub executing: u32,
    pub finished: u32,
}
