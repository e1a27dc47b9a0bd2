//! # Packet Processor
//!
//! The server-side state machine: one fully received packet in, one 15-byte
//! response out (or `None` to drop the connection silently, which the
//! terminal cannot tell apart from a lost packet).
//!
//! ## Processing Order (short-circuiting)
//! 1. Emulated network delay, always applied
//! 2. Timeout trial: drop without responding
//! 3. Header validation: version, type, declared vs actual length
//! 4. Service-unavailable trial
//! 5. Body slicing into wrappedKey/iv/tag/ciphertext
//! 6. Integrity tag verification over the ciphertext
//! 7. Data-corruption trial
//! 8. Key unwrap, payload open, TLV decode
//! 9. Bank-rejection trial decides APPROVED vs DECLINED
//! 10. Database-failure trial
//! 11. Persist exactly once, respond
//!
//! Every failure after header validation collapses to the single
//! PROCESSING_ERROR code; transactions are never persisted on a drop or on
//! any error path.

use rand::Rng;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::core::packet::{self, Header, HEADER_LEN, MSG_TYPE_AUTH_REQUEST, PROTOCOL_VERSION};
use crate::core::response::{self, RejectCode, RESPONSE_LEN};
use crate::error::{ProtocolError, Result};
use crate::protocol::fault::{FaultKind, FaultPolicy};
use crate::protocol::transaction::{Transaction, TransactionStatus};
use crate::service::storage::TransactionStore;
use crate::utils::crypto::{self, Envelope};

/// Processes authorization packets for the acquiring server.
///
/// Holds the acquirer's envelope (private key + HMAC secret), the injected
/// fault policy, and the persistence collaborator. Stateless across
/// requests; safe to share behind an `Arc`.
pub struct PacketProcessor {
    envelope: Envelope,
    faults: FaultPolicy,
    store: Arc<dyn TransactionStore>,
}

impl PacketProcessor {
    pub fn new(envelope: Envelope, faults: FaultPolicy, store: Arc<dyn TransactionStore>) -> Self {
        Self {
            envelope,
            faults,
            store,
        }
    }

    /// Run one packet through the full validation/failure pipeline.
    ///
    /// Returns `None` when the connection should close without a response:
    /// either the emulated timeout fired or the packet is too short to even
    /// carry a header.
    pub async fn process(&self, packet: &[u8]) -> Option<[u8; RESPONSE_LEN]> {
        let delay = self.faults.network_delay();
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis() as u64, "emulating network delay");
            tokio::time::sleep(delay).await;
        }

        if self.faults.triggers(FaultKind::Timeout) {
            warn!("dropping request without response");
            return None;
        }

        let header = match Header::parse(packet) {
            Ok(header) => header,
            Err(_) => {
                warn!(bytes = packet.len(), "packet shorter than header, dropping");
                return None;
            }
        };

        if header.version != PROTOCOL_VERSION {
            return Some(self.reject(RejectCode::UnsupportedVersion, header.version));
        }
        if header.message_type != MSG_TYPE_AUTH_REQUEST {
            return Some(self.reject(RejectCode::UnsupportedType, header.message_type));
        }
        if header.declared_len != packet.len() {
            warn!(
                declared = header.declared_len,
                actual = packet.len(),
                "packet length mismatch"
            );
            return Some(response::reject(RejectCode::LengthMismatch));
        }

        if self.faults.triggers(FaultKind::ServiceUnavailable) {
            return Some(response::reject(RejectCode::ServiceUnavailable));
        }

        match self.authorize(&packet[HEADER_LEN..]) {
            Ok(reply) => Some(reply),
            Err(e) => {
                error!(error = %e, "packet processing failed");
                Some(response::reject(RejectCode::ProcessingError))
            }
        }
    }

    /// Steps 5-11: everything past the header. Errors here are the
    /// catch-all PROCESSING_ERROR path.
    fn authorize(&self, body: &[u8]) -> Result<[u8; RESPONSE_LEN]> {
        let body = packet::split_body(body)?;

        if !self
            .envelope
            .verify_integrity_tag(body.ciphertext, body.integrity_tag)
        {
            warn!("integrity tag verification failed");
            return Ok(response::reject(RejectCode::HmacFailed));
        }

        if self.faults.triggers(FaultKind::DataCorruption) {
            return Err(ProtocolError::Custom("emulated data corruption".into()));
        }

        let session_key = self.envelope.unwrap_session_key(body.wrapped_key)?;
        let plaintext = crypto::open_payload(body.ciphertext, &session_key, body.iv)?;
        let mut transaction = Transaction::decode_tlv(&plaintext)?;

        if self.faults.triggers(FaultKind::BankRejection) {
            transaction.decline(self.faults.decline_reason());
        } else {
            transaction.approve(generate_auth_code());
        }

        if self.faults.triggers(FaultKind::DatabaseFailure) {
            return Err(ProtocolError::Custom("emulated database failure".into()));
        }

        self.store.save(&transaction)?;

        match transaction.status {
            TransactionStatus::Approved => {
                let auth_code = transaction.auth_code.as_deref().unwrap_or("000000");
                info!(
                    transaction = %transaction.transaction_id,
                    auth_code,
                    "transaction APPROVED"
                );
                Ok(response::approval(auth_code))
            }
            TransactionStatus::Declined(reason) => {
                info!(
                    transaction = %transaction.transaction_id,
                    reason = %reason,
                    "transaction DECLINED"
                );
                Ok(response::decline())
            }
            TransactionStatus::Pending => {
                Err(ProtocolError::Custom("transaction left pending".into()))
            }
        }
    }

    fn reject(&self, code: RejectCode, offending_byte: u8) -> [u8; RESPONSE_LEN] {
        warn!(
            code = code.byte(),
            label = code.label(),
            byte = offending_byte,
            "rejecting packet"
        );
        response::reject(code)
    }
}

/// Random six-digit authorization code.
fn generate_auth_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000))
}
