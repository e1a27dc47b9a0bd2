//! # Response Codec
//!
//! The acquirer always answers with a fixed 15-byte cleartext response:
//!
//! ```text
//! [status(1)] [field(6, ASCII)] [timestamp(8, BE epoch ms)]
//! ```
//!
//! Status 0x00 carries a six-digit auth code in the field; 0x01 carries the
//! literal `DECLIN`; reject codes reuse the status byte with the field
//! `ERROR\0`. A processing error therefore shares status 0x01 with a
//! decline and is told apart by the field bytes. No response at all (the
//! connection closing) signals an emulated timeout, which the terminal must
//! distinguish from a malformed short response.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{ProtocolError, Result};

/// Responses are always exactly this long.
pub const RESPONSE_LEN: usize = 15;

/// Status byte for an approved authorization.
pub const STATUS_APPROVED: u8 = 0x00;

/// Status byte for a declined authorization (also the processing-error code).
pub const STATUS_DECLINED: u8 = 0x01;

/// Field bytes accompanying a decline.
pub const DECLINED_FIELD: [u8; 6] = *b"DECLIN";

/// Field bytes accompanying any reject code.
pub const ERROR_FIELD: [u8; 6] = *b"ERROR\0";

/// Coded rejections the server can send instead of an authorization result.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectCode {
    /// Catch-all for crypto, decode, corruption, and persistence failures.
    ProcessingError = 0x01,
    UnsupportedVersion = 0x02,
    UnsupportedType = 0x03,
    LengthMismatch = 0x04,
    ServiceUnavailable = 0x05,
    HmacFailed = 0x06,
}

impl RejectCode {
    /// Log label matching the wire semantics.
    pub const fn label(self) -> &'static str {
        match self {
            RejectCode::ProcessingError => "PROCESSING_ERROR",
            RejectCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            RejectCode::UnsupportedType => "UNSUPPORTED_TYPE",
            RejectCode::LengthMismatch => "LENGTH_MISMATCH",
            RejectCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            RejectCode::HmacFailed => "HMAC_FAILED",
        }
    }

    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Map a wire status byte back to a known reject code.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(RejectCode::ProcessingError),
            0x02 => Some(RejectCode::UnsupportedVersion),
            0x03 => Some(RejectCode::UnsupportedType),
            0x04 => Some(RejectCode::LengthMismatch),
            0x05 => Some(RejectCode::ServiceUnavailable),
            0x06 => Some(RejectCode::HmacFailed),
            _ => None,
        }
    }
}

/// Milliseconds since the Unix epoch; clamps to zero on clock rollback.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn assemble(status: u8, field: [u8; 6], timestamp_ms: u64) -> [u8; RESPONSE_LEN] {
    let mut out = [0u8; RESPONSE_LEN];
    out[0] = status;
    out[1..7].copy_from_slice(&field);
    out[7..15].copy_from_slice(&timestamp_ms.to_be_bytes());
    out
}

/// Approval response carrying a six-digit auth code.
pub fn approval(auth_code: &str) -> [u8; RESPONSE_LEN] {
    let mut field = [b'0'; 6];
    for (dst, src) in field.iter_mut().zip(auth_code.bytes()) {
        *dst = src;
    }
    assemble(STATUS_APPROVED, field, now_ms())
}

/// Decline response; the reason stays server-side.
pub fn decline() -> [u8; RESPONSE_LEN] {
    assemble(STATUS_DECLINED, DECLINED_FIELD, now_ms())
}

/// Coded rejection response.
pub fn reject(code: RejectCode) -> [u8; RESPONSE_LEN] {
    assemble(code.byte(), ERROR_FIELD, now_ms())
}

/// A response as decoded by the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerReply {
    Approved { auth_code: String, timestamp_ms: u64 },
    Declined { timestamp_ms: u64 },
    Error { code: u8, timestamp_ms: u64 },
}

/// Parse the first 15 bytes of whatever the server sent back.
///
/// # Errors
/// `ShortResponse` when fewer than 15 bytes arrived; the caller logs and
/// discards those without retrying.
pub fn parse_reply(data: &[u8]) -> Result<ServerReply> {
    if data.len() < RESPONSE_LEN {
        return Err(ProtocolError::ShortResponse(data.len()));
    }

    let status = data[0];
    let field: [u8; 6] = data[1..7]
        .try_into()
        .map_err(|_| ProtocolError::ShortResponse(data.len()))?;
    let timestamp_ms = u64::from_be_bytes(
        data[7..15]
            .try_into()
            .map_err(|_| ProtocolError::ShortResponse(data.len()))?,
    );

    Ok(match status {
        STATUS_APPROVED => ServerReply::Approved {
            auth_code: String::from_utf8_lossy(&field).trim_end_matches('\0').to_string(),
            timestamp_ms,
        },
        STATUS_DECLINED if field == DECLINED_FIELD => ServerReply::Declined { timestamp_ms },
        code => ServerReply::Error { code, timestamp_ms },
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn approval_round_trip() {
        let raw = approval("042731");
        assert_eq!(raw.len(), RESPONSE_LEN);
        assert_eq!(raw[0], STATUS_APPROVED);

        match parse_reply(&raw).unwrap() {
            ServerReply::Approved { auth_code, timestamp_ms } => {
                assert_eq!(auth_code, "042731");
                assert!(timestamp_ms > 0);
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn decline_round_trip() {
        let raw = decline();
        assert_eq!(raw[0], STATUS_DECLINED);
        assert_eq!(&raw[1..7], b"DECLIN");
        assert!(matches!(parse_reply(&raw).unwrap(), ServerReply::Declined { .. }));
    }

    #[test]
    fn reject_codes_carry_error_field() {
        for code in [
            RejectCode::ProcessingError,
            RejectCode::UnsupportedVersion,
            RejectCode::UnsupportedType,
            RejectCode::LengthMismatch,
            RejectCode::ServiceUnavailable,
            RejectCode::HmacFailed,
        ] {
            let raw = reject(code);
            assert_eq!(raw[0], code.byte());
            assert_eq!(&raw[1..7], b"ERROR\0");
        }
    }

    #[test]
    fn processing_error_and_decline_share_status_byte() {
        // Same status 0x01; only the field bytes disambiguate.
        let error = reject(RejectCode::ProcessingError);
        let declined = decline();
        assert_eq!(error[0], declined[0]);

        assert!(matches!(
            parse_reply(&error).unwrap(),
            ServerReply::Error { code: 0x01, .. }
        ));
        assert!(matches!(parse_reply(&declined).unwrap(), ServerReply::Declined { .. }));
    }

    #[test]
    fn short_response_rejected() {
        let raw = decline();
        assert!(matches!(
            parse_reply(&raw[..14]),
            Err(ProtocolError::ShortResponse(14))
        ));
        assert!(matches!(parse_reply(&[]), Err(ProtocolError::ShortResponse(0))));
    }

    #[test]
    fn extra_bytes_beyond_fifteen_ignored() {
        let mut raw = approval("123456").to_vec();
        raw.extend_from_slice(&[0xAA; 32]);
        assert!(matches!(parse_reply(&raw).unwrap(), ServerReply::Approved { .. }));
    }

    #[test]
    fn timestamp_is_big_endian_epoch_ms() {
        let raw = assemble(STATUS_APPROVED, *b"000000", 0x0102_0304_0506_0708);
        assert_eq!(&raw[7..15], &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
    }
}
