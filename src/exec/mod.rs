// src/exec/mod.rs

//! Task execution layer.
//!
//! This module runs task instances off the runtime's thread and reports back
//! to the orchestration runtime via `RuntimeEvent`s.
//!
//! - [`task_runner`] runs one scheduled task: inputs, `run`, outputs.
//! - [`backend`] provides the `ExecutorBackend` trait and the worker pool
//!   `PoolExecutorBackend` used in production, which tests can replace with
//!   a fake implementation.

pub mod backend;
pub mod task_runner;

pub use backend::{ExecutorBackend, PoolExecutorBackend};
pub use task_runner::{execute_task, run_task};
