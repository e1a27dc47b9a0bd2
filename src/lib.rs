//! # Acquiring Protocol
//!
//! A card-payment acquiring network simulator: a POS terminal client and an
//! acquiring server speaking a proprietary binary protocol over TCP, with a
//! configurable fault policy emulating the failure modes of a real
//! acquiring network.
//!
//! ## Wire Format
//! ```text
//! [Version(1)] [Type(1)] [TotalLength(2, BE)] [WrappedKey(256)] [IV(12)] [HMAC(32)] [Ciphertext(N)]
//! ```
//! The payload is a TLV-encoded transaction, sealed with a fresh AES-256-GCM
//! session key that is itself RSA-OAEP wrapped under the acquirer's public
//! key. An HMAC-SHA256 tag over the ciphertext provides integrity under a
//! pre-shared secret.
//!
//! Responses are a fixed 15 bytes of cleartext:
//! ```text
//! [Status(1)] [Field(6, ASCII)] [Timestamp(8, BE epoch ms)]
//! ```
//!
//! ## Layers
//! - [`core`]: TLV fields, packet assembly/parsing, response format
//! - [`protocol`]: transaction model, fault policy, packet processor
//! - [`service`]: server accept loop, POS terminal client, storage
//! - [`utils`]: crypto envelope, RSA key handling, logging, hexdump
//!
//! ## Example
//! ```no_run
//! use acquiring_protocol::config::AcquiringConfig;
//! use acquiring_protocol::protocol::{FaultPolicy, PacketProcessor};
//! use acquiring_protocol::service::{AcquiringServer, MemoryStore};
//! use acquiring_protocol::utils::{keys, Envelope};
//! use std::sync::Arc;
//!
//! # async fn run() -> acquiring_protocol::error::Result<()> {
//! let config = AcquiringConfig::default();
//! let private_key = keys::load_or_generate_private_key(config.keys.private_key_path.as_deref())?;
//! let envelope = Envelope::for_acquirer(private_key, config.keys.hmac_secret.clone().into_bytes());
//! let processor = PacketProcessor::new(
//!     envelope,
//!     FaultPolicy::new(config.faults.clone()),
//!     Arc::new(MemoryStore::new()),
//! );
//! let server = AcquiringServer::bind(&config.server.address, processor, config.server.max_workers).await?;
//! server.run().await
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod utils;

pub use config::AcquiringConfig;
pub use error::{ProtocolError, Result};
pub use protocol::{FaultPolicy, PacketProcessor, Transaction, TransactionStatus};
pub use service::{AcquiringServer, MemoryStore, PosTerminal, TransactionStore};
