//! Job task execution -- the background lifecycle of a single job.
//!
//! Split into focused submodules:
//! - [`context`] - Owned job state plus publish/save/event helpers
//! - [`orchestration`] - Top-level phase sequence
//! - [`fetching`] - Gated concurrent fetching with per-completion progress
//! - [`finalization`] - Archiving and terminal outcomes

mod context;
mod fetching;
mod finalization;
mod orchestration;

pub(crate) use context::JobTaskContext;
pub(crate) use orchestration::run_job_task;
