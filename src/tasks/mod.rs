//! Background Tasks Module
//!
//! Optional async drivers for the synchronous engine.
//!
//! # Tasks
//! - TTL Sweep: fires expiry timers and removes expired entries on an interval
//! - Sync: applies change notifications from other processes as they arrive

mod sweep;
mod sync;

pub use sweep::{spawn_sweep_task, spawn_sweep_task_every};
pub use sync::spawn_sync_task;
