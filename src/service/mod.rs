//! # Service Layer
//!
//! The two network endpoints (acquiring server and POS terminal client)
//! and the persistence seam behind the server.

pub mod client;
pub mod server;
pub mod storage;

pub use client::PosTerminal;
pub use server::AcquiringServer;
pub use storage::{MemoryStore, TransactionStore};
