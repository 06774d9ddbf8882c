//! The worker side of a MapReduce job.
//!
//! A worker polls the coordinator for tasks, runs the user's map or reduce
//! function, leaves its results on the shared filesystem and reports back.

pub mod core;
pub mod map;
pub mod reduce;

pub use crate::core::{MRWorker, POLL_INTERVAL};
