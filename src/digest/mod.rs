//! Digest Pipeline
//!
//! Batches non-immediate alerts per channel and flushes them on a
//! timezone-aware schedule (spec §4.4, §4.5). `service` owns queueing
//! and delivery; `scheduler` owns timer arming/cancellation.

pub mod render;
pub mod scheduler;
pub mod service;

pub use scheduler::DigestScheduler;
pub use service::DigestService;
