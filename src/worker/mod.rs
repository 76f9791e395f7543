// src/worker/mod.rs
//! The poll → extract → dispatch → persist loop.

pub mod actor;
pub mod backoff;
pub mod context;

pub use actor::{WorkerActor, WorkerError, WorkerHandle, WorkerMessage};
pub use backoff::Backoff;
pub use context::{CycleReport, WorkerContext};
