//! Outbox consumers and the shared polling driver.
//!
//! Every downstream processor is a [`consumer::Consumer`] — a processor name,
//! an event-type filter, and a handler — driven by one
//! [`consumer::PollingDriver`] implementing the claim/ack protocol. The
//! storage layer is the only synchronisation point: replicas of the same
//! consumer coordinate through `FOR UPDATE SKIP LOCKED` claims and
//! `ON CONFLICT DO NOTHING` acks, never through in-process state.

pub mod consumer;
pub mod indexer;
pub mod notifier;
pub mod rule_worker;

pub use consumer::{Consumer, PollingDriver};
pub use indexer::IndexerWorker;
pub use notifier::NotifierWorker;
pub use rule_worker::RuleWorker;
