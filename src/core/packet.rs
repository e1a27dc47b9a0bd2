//! # Packet Framing
//!
//! Wire packet assembly and parsing for authorization requests.
//!
//! ## Wire Format
//! ```text
//! [version(1)=0x01] [type(1)=0x01] [totalLength(2, BE)]
//! [wrappedSessionKey(256)] [iv(12)] [integrityTag(32)] [ciphertext(rest)]
//! ```
//!
//! `totalLength` counts the whole packet including the 4-byte header and
//! must match the bytes actually received. The integrity tag covers only the
//! ciphertext; header tampering is caught by the processor's explicit
//! checks.

use bytes::{BufMut, BytesMut};
use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::utils::crypto::{self, Envelope, INTEGRITY_TAG_LEN, IV_LEN, WRAPPED_KEY_LEN};

/// Protocol version carried in the first header byte.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// The only defined message type: an authorization request.
pub const MSG_TYPE_AUTH_REQUEST: u8 = 0x01;

/// Fixed header size: version + type + totalLength.
pub const HEADER_LEN: usize = 4;

/// Smallest structurally valid packet (header + empty ciphertext).
pub const MIN_PACKET_LEN: usize = HEADER_LEN + WRAPPED_KEY_LEN + IV_LEN + INTEGRITY_TAG_LEN;

/// Build a complete request packet around an already TLV-encoded payload.
///
/// Generates a fresh session key and nonce, wraps the key under the
/// acquirer's public key, seals the payload, and tags the ciphertext.
///
/// # Errors
/// `PacketAssembly` on any internal size mismatch (the packet is never
/// sent); crypto errors propagate unchanged.
pub fn build_request(plaintext: &[u8], envelope: &Envelope) -> Result<Vec<u8>> {
    let session_key = crypto::generate_session_key();
    let wrapped_key = envelope.wrap_session_key(&session_key)?;
    if wrapped_key.len() != WRAPPED_KEY_LEN {
        return Err(ProtocolError::PacketAssembly(format!(
            "wrapped key is {} bytes, expected {WRAPPED_KEY_LEN}",
            wrapped_key.len()
        )));
    }

    let iv = crypto::generate_iv();
    let ciphertext = crypto::seal_payload(plaintext, &session_key, &iv)?;
    let integrity_tag = envelope.compute_integrity_tag(&ciphertext)?;

    let total_len = MIN_PACKET_LEN + ciphertext.len();
    let declared: u16 = total_len.try_into().map_err(|_| {
        ProtocolError::PacketAssembly(format!("packet of {total_len} bytes exceeds u16 length"))
    })?;

    let mut packet = BytesMut::with_capacity(total_len);
    packet.put_u8(PROTOCOL_VERSION);
    packet.put_u8(MSG_TYPE_AUTH_REQUEST);
    packet.put_u16(declared);
    packet.put_slice(&wrapped_key);
    packet.put_slice(&iv);
    packet.put_slice(&integrity_tag);
    packet.put_slice(&ciphertext);

    debug_assert_eq!(packet.len(), total_len);
    debug!(bytes = total_len, "request packet assembled");
    Ok(packet.to_vec())
}

/// Parsed packet header. Pure field extraction; validity checks belong to
/// the processor's ordered state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub message_type: u8,
    /// Declared length of the whole packet, header included.
    pub declared_len: usize,
}

impl Header {
    /// Read the 4-byte header off the front of a packet.
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if packet.len() < HEADER_LEN {
            return Err(ProtocolError::TruncatedBody {
                expected: HEADER_LEN,
                actual: packet.len(),
            });
        }
        Ok(Self {
            version: packet[0],
            message_type: packet[1],
            declared_len: u16::from_be_bytes([packet[2], packet[3]]) as usize,
        })
    }
}

/// Body of a request packet, sliced into its fixed-offset components.
#[derive(Debug)]
pub struct RequestBody<'a> {
    pub wrapped_key: &'a [u8],
    pub iv: &'a [u8; IV_LEN],
    pub integrity_tag: &'a [u8],
    pub ciphertext: &'a [u8],
}

/// Slice everything after the header into wrappedKey/iv/tag/ciphertext.
///
/// # Errors
/// `TruncatedBody` when the body cannot hold the three fixed-size fields.
pub fn split_body(body: &[u8]) -> Result<RequestBody<'_>> {
    let fixed = WRAPPED_KEY_LEN + IV_LEN + INTEGRITY_TAG_LEN;
    if body.len() < fixed {
        return Err(ProtocolError::TruncatedBody {
            expected: fixed,
            actual: body.len(),
        });
    }

    let (wrapped_key, rest) = body.split_at(WRAPPED_KEY_LEN);
    let (iv, rest) = rest.split_at(IV_LEN);
    let (integrity_tag, ciphertext) = rest.split_at(INTEGRITY_TAG_LEN);

    // Infallible: split_at produced exactly IV_LEN bytes.
    let iv: &[u8; IV_LEN] = iv
        .try_into()
        .map_err(|_| ProtocolError::PacketAssembly("iv slice width".into()))?;

    Ok(RequestBody {
        wrapped_key,
        iv,
        integrity_tag,
        ciphertext,
    })
}
