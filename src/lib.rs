//! Dashmill - chunked-upload to MPEG-DASH conversion worker
//!
//! Hexagonal Architecture:
//! - domain/: Pure pipeline logic (jobs, fragment assembly, DASH conversion)
//! - ports/: Trait definitions (queue, ledger store, transcoder)
//! - adapters/: Concrete implementations (Redis, PostgreSQL, ffmpeg, in-memory)
//! - application/: Idempotency ledger, job handler, dispatcher
//! - config: Environment configuration
//!
//! A job message `{"video_id": 7, "path": "/media/uploads/7"}` names a
//! directory of `N.chunk` fragments. The worker merges them in numeric order,
//! converts the result to `mpeg-dash/output.mpd`, and records the outcome so
//! a redelivered message for a converted video is skipped.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod ports;

pub use application::dispatcher::Dispatcher;
pub use application::handler::{HandleOutcome, JobHandler};
pub use application::ledger::IdempotencyLedger;
pub use config::WorkerConfig;
pub use domain::jobs::Job;
