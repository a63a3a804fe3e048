//! Alert Delivery Control Plane
//!
//! Storm detection, digest batching, escalation tracking, and
//! alert-rule template resolution for router-fleet alert delivery.
//! The core depends on four external collaborators supplied by the
//! embedding application: a `Clock`, a `Dispatcher`, an `EventBus`, and
//! a `Store`. Each ships one in-crate reference implementation for
//! tests and local development.

pub mod clock;
pub mod config;
pub mod digest;
pub mod dispatch;
pub mod error;
pub mod escalation_engine;
pub mod events;
pub mod ids;
pub mod models;
pub mod store;
pub mod storm_detector;
pub mod templates;

pub use clock::{Clock, SystemClock, TestClock};
pub use config::Config;
pub use digest::{DigestScheduler, DigestService};
pub use dispatch::{DispatchResult, Dispatcher, LoggingDispatcher};
pub use error::{CoreError, CoreResult};
pub use escalation_engine::EscalationEngine;
pub use events::{CoreEvent, EventBus, LoggingEventBus, Publisher};
pub use ids::new_id;
pub use models::*;
pub use store::{
    AlertRuleStore, AlertStore, DigestEntryStore, EscalationStore, MemoryStore, Store,
    TemplateStore,
};
pub use storm_detector::StormDetector;
pub use templates::TemplateResolver;
