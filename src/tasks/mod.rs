//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the cache is live.
//!
//! # Tasks
//! - TTL Sweep: Removes expired entries in bounded batches at configured intervals

mod sweep;

pub use sweep::{spawn_sweep_task, sweep_once};
