//! # Protocol Layer
//!
//! Authorization semantics on top of the wire format: the transaction
//! domain model, the configurable fault policy, and the server-side
//! packet processor that ties them together.

pub mod fault;
pub mod processor;
pub mod transaction;

pub use fault::{FaultKind, FaultPolicy};
pub use processor::PacketProcessor;
pub use transaction::{DeclineReason, Transaction, TransactionStatus};
