//! # Synchronization Subsystem
//!
//! Background work scheduled at OAuth completion: webhook subscription
//! registration and the one-time historical backfill. Both run as
//! fire-and-forget jobs (see `crate::jobs`) and write through the same
//! repositories as the live webhook ingest handlers, relying on
//! natural-key upserts for convergence rather than ordering.

pub mod backfill;
pub mod subscriber;

pub use backfill::{BackfillEngine, BackfillSummary};
pub use subscriber::{WEBHOOK_TOPICS, WebhookSubscriber};
