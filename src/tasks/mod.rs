//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the cache.
//!
//! # Tasks
//! - TTL Cleanup: Purges expired entries of the in-process store at configured intervals

mod cleanup;

pub use cleanup::spawn_cleanup_task;
