//! Transaction data model and synthetic transaction generation.
//!
//! A transaction is created by the terminal before send and mutated only by
//! the server (status and auth code) immediately before persistence. The
//! four wire fields travel in the TLV payload; status, auth code, and
//! timestamp are local state.

use bytes::BytesMut;
use rand::Rng;
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

use crate::core::tlv::{self, Endianness, FieldTag};
use crate::error::Result;

/// Card numbers are at most 19 characters (ISO/IEC 7812).
pub const MAX_PAN_LEN: usize = 19;

/// Reasons an issuer may decline an authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclineReason {
    InsufficientFunds,
    CardExpired,
    TransactionLimitExceeded,
    SuspiciousActivity,
    CardBlocked,
    InvalidMerchant,
    TechnicalError,
}

impl DeclineReason {
    /// All reasons, for uniform sampling.
    pub const ALL: [DeclineReason; 7] = [
        DeclineReason::InsufficientFunds,
        DeclineReason::CardExpired,
        DeclineReason::TransactionLimitExceeded,
        DeclineReason::SuspiciousActivity,
        DeclineReason::CardBlocked,
        DeclineReason::InvalidMerchant,
        DeclineReason::TechnicalError,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            DeclineReason::InsufficientFunds => "INSUFFICIENT_FUNDS",
            DeclineReason::CardExpired => "CARD_EXPIRED",
            DeclineReason::TransactionLimitExceeded => "TRANSACTION_LIMIT_EXCEEDED",
            DeclineReason::SuspiciousActivity => "SUSPICIOUS_ACTIVITY",
            DeclineReason::CardBlocked => "CARD_BLOCKED",
            DeclineReason::InvalidMerchant => "INVALID_MERCHANT",
            DeclineReason::TechnicalError => "TECHNICAL_ERROR",
        }
    }
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization state of a transaction.
///
/// Declines carry their reason structurally; the combined
/// `DECLINED_<reason>` spelling exists only as display output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Approved,
    Declined(DeclineReason),
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => f.write_str("PENDING"),
            TransactionStatus::Approved => f.write_str("APPROVED"),
            TransactionStatus::Declined(reason) => write!(f, "DECLINED_{reason}"),
        }
    }
}

/// A card-payment authorization request and its outcome.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// Primary account number, at most 19 characters.
    pub pan: String,
    /// Amount in minor currency units.
    pub amount: u32,
    /// Unique transaction identifier (UUID v4 for generated traffic).
    pub transaction_id: String,
    /// Merchant identifier.
    pub merchant_id: String,
    /// Creation time on the terminal, processing time on the acquirer.
    pub timestamp: SystemTime,
    pub status: TransactionStatus,
    /// Six-digit authorization code, set only on approval.
    pub auth_code: Option<String>,
}

impl Transaction {
    /// Create a fresh PENDING transaction with a random id.
    pub fn new(pan: impl Into<String>, amount: u32, merchant_id: impl Into<String>) -> Self {
        Self {
            pan: pan.into(),
            amount,
            transaction_id: Uuid::new_v4().to_string(),
            merchant_id: merchant_id.into(),
            timestamp: SystemTime::now(),
            status: TransactionStatus::Pending,
            auth_code: None,
        }
    }

    /// Encode the four wire fields as TLV, in the fixed order
    /// PAN, AMOUNT, TRANSACTION_ID, MERCHANT_ID.
    pub fn encode_tlv(&self) -> Result<Vec<u8>> {
        let mut out = BytesMut::new();
        tlv::encode_field(&mut out, FieldTag::Pan, self.pan.as_bytes())?;
        let amount = tlv::encode_amount(self.amount, Endianness::Big);
        tlv::encode_field(&mut out, FieldTag::Amount, &amount)?;
        tlv::encode_field(&mut out, FieldTag::TransactionId, self.transaction_id.as_bytes())?;
        tlv::encode_field(&mut out, FieldTag::MerchantId, self.merchant_id.as_bytes())?;
        Ok(out.to_vec())
    }

    /// Rebuild a PENDING transaction from a decoded TLV payload.
    pub fn decode_tlv(data: &[u8]) -> Result<Self> {
        let fields = tlv::decode(data)?;
        Ok(Self {
            pan: fields.require_str(FieldTag::Pan)?,
            amount: tlv::decode_amount(fields.require(FieldTag::Amount)?, Endianness::Big)?,
            transaction_id: fields.require_str(FieldTag::TransactionId)?,
            merchant_id: fields.require_str(FieldTag::MerchantId)?,
            timestamp: SystemTime::now(),
            status: TransactionStatus::Pending,
            auth_code: None,
        })
    }

    /// Mark approved with the given six-digit auth code.
    pub fn approve(&mut self, auth_code: String) {
        self.status = TransactionStatus::Approved;
        self.auth_code = Some(auth_code);
    }

    /// Mark declined for the given reason.
    pub fn decline(&mut self, reason: DeclineReason) {
        self.status = TransactionStatus::Declined(reason);
        self.auth_code = None;
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transaction{{id={}, pan={}, amount={}, merchant={}}}",
            self.transaction_id, self.pan, self.amount, self.merchant_id
        )
    }
}

/// Sample PANs used for generated traffic (masked test card numbers).
pub const SAMPLE_PANS: [&str; 3] = [
    "4242********4242",
    "5555********5555",
    "3782********0005",
];

/// Sample merchant identifiers for generated traffic.
pub const SAMPLE_MERCHANTS: [&str; 3] = ["MERCHANT_001", "MERCHANT_002", "MERCHANT_003"];

/// Generator for synthetic terminal traffic.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransactionGenerator;

impl TransactionGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Random PAN/merchant pair with an amount in 100..=9999 minor units.
    pub fn generate(&self) -> Transaction {
        let mut rng = rand::rng();
        let pan = SAMPLE_PANS[rng.random_range(0..SAMPLE_PANS.len())];
        let merchant = SAMPLE_MERCHANTS[rng.random_range(0..SAMPLE_MERCHANTS.len())];
        let amount = rng.random_range(100..10_000);
        Transaction::new(pan, amount, merchant)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn sample() -> Transaction {
        Transaction::new("4242********4242", 10_000, "MERCHANT_001")
    }

    #[test]
    fn tlv_round_trip_preserves_wire_fields() {
        let tx = sample();
        let encoded = tx.encode_tlv().unwrap();
        let decoded = Transaction::decode_tlv(&encoded).unwrap();

        assert_eq!(decoded.pan, tx.pan);
        assert_eq!(decoded.amount, tx.amount);
        assert_eq!(decoded.transaction_id, tx.transaction_id);
        assert_eq!(decoded.merchant_id, tx.merchant_id);
        assert_eq!(decoded.status, TransactionStatus::Pending);
        assert_eq!(decoded.auth_code, None);
    }

    #[test]
    fn amount_10000_encodes_as_00_00_27_10() {
        let encoded = sample().encode_tlv().unwrap();
        // PAN frame: 1 + 2 + 16 bytes, then AMOUNT tag + length.
        let amount_value = &encoded[19 + 3..19 + 3 + 4];
        assert_eq!(amount_value, [0x00, 0x00, 0x27, 0x10]);
    }

    #[test]
    fn field_order_is_fixed() {
        let encoded = sample().encode_tlv().unwrap();
        let mut tags = Vec::new();
        let mut i = 0;
        while i < encoded.len() {
            tags.push(encoded[i]);
            let len = u16::from_be_bytes([encoded[i + 1], encoded[i + 2]]) as usize;
            i += 3 + len;
        }
        assert_eq!(tags, vec![0x10, 0x20, 0x30, 0x40]);
    }

    #[test]
    fn decode_requires_all_fields() {
        // Only a PAN frame.
        let mut data = vec![0x10, 0x00, 0x04];
        data.extend_from_slice(b"4242");
        assert!(Transaction::decode_tlv(&data).is_err());
    }

    #[test]
    fn empty_pan_refuses_to_encode() {
        let tx = Transaction::new("", 100, "MERCHANT_001");
        assert!(tx.encode_tlv().is_err());
    }

    #[test]
    fn declined_status_displays_combined_form() {
        let mut tx = sample();
        tx.decline(DeclineReason::CardExpired);
        assert_eq!(tx.status.to_string(), "DECLINED_CARD_EXPIRED");
        assert_eq!(tx.auth_code, None);
    }

    #[test]
    fn generator_stays_in_bounds() {
        let generator = TransactionGenerator::new();
        for _ in 0..100 {
            let tx = generator.generate();
            assert!(tx.pan.len() <= MAX_PAN_LEN);
            assert!((100..10_000).contains(&tx.amount));
            assert!(SAMPLE_MERCHANTS.contains(&tx.merchant_id.as_str()));
            assert_eq!(tx.status, TransactionStatus::Pending);
        }
    }
}
