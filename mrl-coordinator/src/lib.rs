//! The coordinator of a MapReduce job: the single authority over task state.
//!
//! [`scheduler::Scheduler`] holds the state machine, [`core::MRCoordinator`]
//! serves it to workers over gRPC.

pub mod core;
pub mod scheduler;

pub use crate::core::{bind, serve, MRCoordinator};
pub use crate::scheduler::{Scheduler, TASK_TIMEOUT};
