//! # TLV Codec
//!
//! Tag-Length-Value encoding for the authorization payload.
//!
//! Each field is framed as `tag(1) | length(2, BE) | value(length)`. The
//! payload carries exactly four defined tags; unknown tags are preserved by
//! the decoder (duplicate tags: last wins) and ignored by the transaction
//! builder.
//!
//! ## Wire Layout
//! ```text
//! [PAN 0x10] [AMOUNT 0x20 (4 bytes BE)] [TRANSACTION_ID 0x30] [MERCHANT_ID 0x40]
//! ```
//!
//! The amount travels as four big-endian bytes; `Endianness::Big` is the only
//! variant used on the live path. A middle-endian interpretation exists as a
//! separately named utility for the legacy byte order and is never silently
//! substituted.

use bytes::{Buf, BufMut, BytesMut};
use std::collections::HashMap;

use crate::error::{ProtocolError, Result};

/// The amount field is a fixed-width unsigned integer.
pub const AMOUNT_LEN: usize = 4;

/// Maximum encodable value length (TLV length field is a u16).
pub const MAX_VALUE_LEN: usize = u16::MAX as usize;

/// Defined payload field tags.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldTag {
    /// Primary account number (card number), up to 19 characters.
    Pan = 0x10,
    /// Transaction amount in minor units, 4 bytes big-endian.
    Amount = 0x20,
    /// Unique transaction identifier.
    TransactionId = 0x30,
    /// Merchant identifier.
    MerchantId = 0x40,
}

impl FieldTag {
    /// Wire byte for this tag.
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Human-readable tag name for diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            FieldTag::Pan => "PAN",
            FieldTag::Amount => "AMOUNT",
            FieldTag::TransactionId => "TRANSACTION_ID",
            FieldTag::MerchantId => "MERCHANT_ID",
        }
    }
}

/// Byte-order convention for the 4-byte amount field.
///
/// `Big` is canonical. `Middle` reorders the big-endian bytes as
/// `[1, 0, 3, 2]` and survives only as an explicitly requested conversion
/// for data produced by legacy terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Middle,
}

/// Serialize an amount under the given byte-order convention.
pub fn encode_amount(value: u32, endianness: Endianness) -> [u8; AMOUNT_LEN] {
    let be = value.to_be_bytes();
    match endianness {
        Endianness::Big => be,
        Endianness::Middle => [be[1], be[0], be[3], be[2]],
    }
}

/// Parse a 4-byte amount under the given byte-order convention.
///
/// # Errors
/// `InvalidAmountEncoding` when the value is not exactly four bytes.
pub fn decode_amount(bytes: &[u8], endianness: Endianness) -> Result<u32> {
    if bytes.len() != AMOUNT_LEN {
        return Err(ProtocolError::InvalidAmountEncoding(bytes.len()));
    }
    let be = match endianness {
        Endianness::Big => [bytes[0], bytes[1], bytes[2], bytes[3]],
        Endianness::Middle => [bytes[1], bytes[0], bytes[3], bytes[2]],
    };
    Ok(u32::from_be_bytes(be))
}

/// Append one `tag | length | value` frame to the output buffer.
///
/// # Errors
/// `EmptyField` for zero-length values, `FieldTooLarge` for values that do
/// not fit a u16 length.
pub fn encode_field(out: &mut BytesMut, tag: FieldTag, value: &[u8]) -> Result<()> {
    if value.is_empty() {
        return Err(ProtocolError::EmptyField(tag.byte()));
    }
    if value.len() > MAX_VALUE_LEN {
        return Err(ProtocolError::FieldTooLarge {
            tag: tag.byte(),
            len: value.len(),
        });
    }

    out.put_u8(tag.byte());
    out.put_u16(value.len() as u16);
    out.put_slice(value);
    Ok(())
}

/// Decoded payload: a mapping from raw tag byte to value bytes.
#[derive(Debug, Default, Clone)]
pub struct FieldMap {
    fields: HashMap<u8, Vec<u8>>,
}

impl FieldMap {
    /// Look up a defined tag.
    pub fn get(&self, tag: FieldTag) -> Option<&[u8]> {
        self.fields.get(&tag.byte()).map(Vec::as_slice)
    }

    /// Look up a defined tag, failing when it is absent.
    pub fn require(&self, tag: FieldTag) -> Result<&[u8]> {
        self.get(tag).ok_or_else(|| {
            ProtocolError::MalformedTlv(format!("missing required field {}", tag.name()))
        })
    }

    /// Look up a defined tag as a UTF-8 string.
    pub fn require_str(&self, tag: FieldTag) -> Result<String> {
        let raw = self.require(tag)?;
        String::from_utf8(raw.to_vec()).map_err(|_| {
            ProtocolError::MalformedTlv(format!("field {} is not valid UTF-8", tag.name()))
        })
    }

    /// Number of distinct tags decoded.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no fields were decoded.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Decode a TLV byte stream into a tag -> value mapping.
///
/// Frames are read back to back until the input is exhausted. A duplicate
/// tag overwrites the earlier value (last wins).
///
/// # Errors
/// `MalformedTlv` on empty input or when a frame header or value runs past
/// the end of the input.
pub fn decode(data: &[u8]) -> Result<FieldMap> {
    if data.is_empty() {
        return Err(ProtocolError::MalformedTlv("empty payload".into()));
    }

    let mut buf = data;
    let mut fields = HashMap::new();

    while buf.has_remaining() {
        if buf.remaining() < 3 {
            return Err(ProtocolError::MalformedTlv(format!(
                "truncated frame header: {} trailing bytes",
                buf.remaining()
            )));
        }
        let tag = buf.get_u8();
        let length = buf.get_u16() as usize;
        if buf.remaining() < length {
            return Err(ProtocolError::MalformedTlv(format!(
                "tag 0x{tag:02X} declares {length} bytes, {} remain",
                buf.remaining()
            )));
        }
        let value = buf[..length].to_vec();
        buf.advance(length);
        fields.insert(tag, value);
    }

    Ok(FieldMap { fields })
}
