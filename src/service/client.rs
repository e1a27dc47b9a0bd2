//! # POS Terminal Client
//!
//! Point-of-sale side of the protocol. Every authorization opens a fresh
//! TCP connection, writes one sealed request packet, and waits up to the
//! configured read timeout for the 15-byte reply.
//!
//! ## Retry Behavior
//! A timed-out exchange (no bytes, or the server closed without writing)
//! is retried after the configured delay, up to `max_attempts` total
//! attempts. A short reply (1..14 bytes) is NOT retried; it is logged and
//! reported as no reply, since the server demonstrably answered.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::core::packet::build_request;
use crate::core::response::{parse_reply, RejectCode, ServerReply, RESPONSE_LEN};
use crate::error::{ProtocolError, Result};
use crate::protocol::transaction::{Transaction, TransactionGenerator};
use crate::utils::crypto::Envelope;
use crate::utils::hexdump;

/// Read buffer for the response. The reply is 15 bytes; anything extra a
/// misbehaving server sends is captured and ignored.
const READ_BUFFER_LEN: usize = 1024;

pub struct PosTerminal {
    config: ClientConfig,
    envelope: Envelope,
    generator: TransactionGenerator,
}

impl PosTerminal {
    /// Build a terminal from its config and the acquirer's public-key
    /// envelope.
    pub fn new(config: ClientConfig, envelope: Envelope) -> Self {
        Self {
            config,
            envelope,
            generator: TransactionGenerator,
        }
    }

    /// Generate a random transaction and submit it.
    pub async fn submit_random(&self) -> Result<(Transaction, Option<ServerReply>)> {
        let transaction = self.generator.generate();
        let reply = self.submit(&transaction).await?;
        Ok((transaction, reply))
    }

    /// Submit one transaction, retrying timed-out exchanges.
    ///
    /// Returns `Ok(None)` when the server replied with fewer than 15
    /// bytes; returns `Err(Timeout)` once every attempt timed out.
    pub async fn submit(&self, transaction: &Transaction) -> Result<Option<ServerReply>> {
        let plaintext = transaction.encode_tlv()?;
        let packet = build_request(&plaintext, &self.envelope)?;

        info!(
            transaction = %transaction.transaction_id,
            merchant = %transaction.merchant_id,
            amount = transaction.amount,
            "submitting authorization"
        );

        let mut attempt = 1;
        loop {
            match self.exchange(&packet).await {
                Ok(reply) => return Ok(reply),
                Err(ProtocolError::Timeout) if attempt < self.config.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.config.max_attempts,
                        delay_ms = self.config.retry_delay.as_millis() as u64,
                        "no response from acquirer, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One connect/write/read round trip.
    async fn exchange(&self, packet: &[u8]) -> Result<Option<ServerReply>> {
        let mut stream = TcpStream::connect(&self.config.server_address).await?;
        stream.write_all(packet).await?;
        stream.flush().await?;
        debug!(bytes = packet.len(), "request written");

        let mut buffer = [0u8; READ_BUFFER_LEN];
        let n = tokio::time::timeout(self.config.read_timeout, stream.read(&mut buffer))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        // Connection closed without a single byte is indistinguishable
        // from a dropped packet; treat it as a timeout so it retries.
        if n == 0 {
            return Err(ProtocolError::Timeout);
        }

        debug!(bytes = n, "response received\n{}", hexdump::format(&buffer[..n]));

        if n < RESPONSE_LEN {
            warn!(bytes = n, "short response from acquirer, discarding");
            return Ok(None);
        }

        let reply = parse_reply(&buffer[..n])?;
        match &reply {
            ServerReply::Approved { auth_code, .. } => {
                info!(auth_code = %auth_code, "authorization APPROVED");
            }
            ServerReply::Declined { .. } => {
                info!("authorization DECLINED");
            }
            ServerReply::Error { code, .. } => {
                let label = RejectCode::from_byte(*code).map_or("UNKNOWN", RejectCode::label);
                warn!(code, label, "acquirer error");
            }
        }
        Ok(Some(reply))
    }
}
