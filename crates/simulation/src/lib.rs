//! Deterministic discrete-event simulation core.
//!
//! Given the same seed and run number, and the same sequence of scheduling
//! calls, a simulation produces identical results every time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      Scheduler                          │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     EventQueue (BinaryHeap<EventKey, Callback>)    │ │
//! │  │     Ordered by: time, sequence                     │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │ pop earliest, advance now   │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     callback(&mut Scheduler)                       │ │
//! │  │     reads now(), entities, random streams          │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     schedule_at / schedule_after → new events      │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Execution is single-threaded and run-to-completion. `Scheduler` is not
//! `Send`; a multi-threaded front end has to funnel calls onto the thread
//! that owns it.

mod config;
mod entity;
mod error;
mod event_queue;
mod random;
mod scheduler;

pub use config::{SimConfig, DEFAULT_RUN, DEFAULT_SEED};
pub use entity::{Entity, EntityRegistry};
pub use error::SimError;
pub use event_queue::{Event, EventHandle, EventKey, EventQueue};
pub use random::{RandomStream, RandomStreamManager, StreamHandle, StreamOwner};
pub use scheduler::{Callback, Scheduler, SchedulerStats};
