//! # Error Types
//!
//! Error handling for the acquiring protocol stack.
//!
//! This module defines all error variants that can occur while encoding,
//! encrypting, framing, sending, and processing authorization requests.
//!
//! ## Error Categories
//! - **Transport errors**: socket I/O failures and read timeouts
//! - **Codec errors**: TLV encode/decode violations
//! - **Cryptographic errors**: key wrap/unwrap, AEAD and integrity failures
//! - **Framing errors**: packet assembly and body slicing problems
//! - **Configuration errors**: invalid or missing settings and key material
//!
//! Server-side processing never surfaces these on the wire directly: the
//! connection handler maps them to coded 15-byte responses (or to silence
//! for transport framing failures), see `protocol::processor`.

use std::io;
use thiserror::Error;

/// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLV fields must carry at least one byte of value.
    #[error("empty value for TLV tag 0x{0:02X}")]
    EmptyField(u8),

    /// TLV length is a u16; longer values cannot be framed.
    #[error("value for TLV tag 0x{tag:02X} too large: {len} bytes (max 65535)")]
    FieldTooLarge { tag: u8, len: usize },

    #[error("malformed TLV payload: {0}")]
    MalformedTlv(String),

    /// The AMOUNT field is exactly four bytes on the wire.
    #[error("invalid amount encoding: expected 4 bytes, got {0}")]
    InvalidAmountEncoding(usize),

    #[error("session key wrap failed")]
    KeyWrap,

    #[error("session key unwrap failed")]
    KeyUnwrap,

    #[error("payload encryption failed")]
    SealFailure,

    #[error("authenticated decryption failed")]
    AuthenticatedDecryption,

    /// Fatal local error while assembling a request; the packet is never sent.
    #[error("packet assembly failed: {0}")]
    PacketAssembly(String),

    #[error("request body too short: expected at least {expected} bytes, got {actual}")]
    TruncatedBody { expected: usize, actual: usize },

    /// Responses are a fixed 15 bytes; anything shorter is discarded.
    #[error("short response: {0} bytes")]
    ShortResponse(usize),

    /// Covers both an elapsed read timeout and a connection closed with no
    /// data, which the server uses to emulate packet loss.
    #[error("timed out waiting for server response")]
    Timeout,

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("key material error: {0}")]
    KeyMaterial(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("{0}")]
    Custom(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
