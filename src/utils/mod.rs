//! # Utility Modules
//!
//! Supporting utilities for cryptography, key material, logging, and tracing
//! output.
//!
//! ## Components
//! - **Crypto**: the hybrid encryption envelope (RSA-OAEP key wrap,
//!   AES-256-GCM payload sealing, HMAC-SHA256 integrity tags)
//! - **Keys**: PEM parsing, loading, and ephemeral key-pair generation
//! - **Hexdump**: packet tracing output
//! - **Logging**: subscriber setup for the binaries
//!
//! ## Security
//! - Cryptographically secure RNG (`OsRng`) for keys and nonces
//! - Session keys zeroized on drop (zeroize crate)
//! - Constant-time integrity tag comparison

pub mod crypto;
pub mod hexdump;
pub mod keys;
pub mod logging;

pub use crypto::Envelope;
