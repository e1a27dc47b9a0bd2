//! # Core Protocol Components
//!
//! Byte-exact codecs for the acquiring wire protocol: TLV payload encoding,
//! request packet framing, and the fixed 15-byte response.
//!
//! ## Request Wire Format
//! ```text
//! [Version(1)] [Type(1)] [TotalLength(2, BE)]
//! [WrappedSessionKey(256)] [IV(12)] [IntegrityTag(32)] [Ciphertext(N)]
//! ```
//!
//! ## Security
//! - `TotalLength` is validated against the bytes actually received
//! - The integrity tag covers the ciphertext; headers are checked explicitly
//! - TLV lengths are bounded by the u16 length field

pub mod packet;
pub mod response;
pub mod tlv;
