// src/dag/mod.rs

//! Build-time dependency graph construction and validation.
//!
//! - [`graph`] holds the acyclic consumer → producer graph, checked on every
//!   edge insertion.
//! - [`index`] keeps every descriptor per `(consumer, producer)` pair.
//! - [`validate`] cross-checks declared inputs against dependencies.
//! - [`builder`] is the public declaration API that ties them together and
//!   emits a [`Schedule`](crate::schedule::Schedule).

pub mod builder;
pub mod graph;
pub mod index;
pub mod validate;

pub use builder::ScheduleBuilder;
pub use graph::DependencyGraph;
pub use index::DependencyIndex;
pub use validate::DependencyValidator;
