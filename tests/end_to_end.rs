//! Full-stack tests: real server on an ephemeral port, real client, real
//! RSA/AES/HMAC material. Fault probabilities are pinned to 0.0 or 1.0 so
//! every path is deterministic.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use acquiring_protocol::config::{ClientConfig, FaultConfig};
use acquiring_protocol::core::response::ServerReply;
use acquiring_protocol::error::ProtocolError;
use acquiring_protocol::protocol::transaction::{Transaction, TransactionStatus};
use acquiring_protocol::protocol::{FaultPolicy, PacketProcessor};
use acquiring_protocol::service::{AcquiringServer, MemoryStore, PosTerminal};
use acquiring_protocol::utils::{keys, Envelope};
use rsa::{RsaPrivateKey, RsaPublicKey};
use tokio::sync::mpsc;

const SECRET: &[u8] = b"end-to-end-shared-secret";

fn key_pair() -> &'static (RsaPrivateKey, RsaPublicKey) {
    static PAIR: OnceLock<(RsaPrivateKey, RsaPublicKey)> = OnceLock::new();
    PAIR.get_or_init(|| keys::generate_key_pair().expect("key generation"))
}

/// Boot a server with the given fault policy. Returns the client that
/// talks to it, the store behind it, and the shutdown handle.
async fn boot(faults: FaultPolicy) -> (PosTerminal, Arc<MemoryStore>, mpsc::Sender<()>) {
    let (private, public) = key_pair().clone();

    let store = Arc::new(MemoryStore::new());
    let processor = PacketProcessor::new(
        Envelope::for_acquirer(private, SECRET.to_vec()),
        faults,
        store.clone(),
    );
    let server = AcquiringServer::bind("127.0.0.1:0", processor, 4)
        .await
        .expect("bind");
    let addr = server.local_addr().expect("local addr");

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    tokio::spawn(server.run_with_shutdown(shutdown_rx));

    let config = ClientConfig {
        server_address: addr.to_string(),
        read_timeout: Duration::from_millis(2000),
        retry_delay: Duration::from_millis(20),
        max_attempts: 2,
    };
    let terminal = PosTerminal::new(config, Envelope::for_terminal(public, SECRET.to_vec()));

    (terminal, store, shutdown_tx)
}

#[tokio::test]
async fn approved_transaction_round_trip() {
    let (terminal, store, _shutdown) = boot(FaultPolicy::disabled()).await;

    let transaction = Transaction::new("4242424242424242", 7_350, "MERCHANT_002");
    let reply = terminal.submit(&transaction).await.expect("submit");

    match reply {
        Some(ServerReply::Approved {
            auth_code,
            timestamp_ms,
        }) => {
            assert_eq!(auth_code.len(), 6);
            assert!(timestamp_ms > 0);
        }
        other => panic!("expected approval, got {other:?}"),
    }

    // Persisted exactly once, with the terminal's field values intact.
    let records = store.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].pan, "4242424242424242");
    assert_eq!(records[0].amount, 7_350);
    assert_eq!(records[0].transaction_id, transaction.transaction_id);
    assert_eq!(records[0].status, TransactionStatus::Approved);
}

#[tokio::test]
async fn generated_transactions_all_approved_when_faults_disabled() {
    let (terminal, store, _shutdown) = boot(FaultPolicy::disabled()).await;

    for _ in 0..5 {
        let (_, reply) = terminal.submit_random().await.expect("submit");
        assert!(matches!(reply, Some(ServerReply::Approved { .. })));
    }
    assert_eq!(store.len(), 5);
}

#[tokio::test]
async fn certain_bank_rejection_comes_back_declined() {
    let mut config = FaultConfig::disabled();
    config.bank_rejection = 1.0;
    let (terminal, store, _shutdown) = boot(FaultPolicy::seeded(config, 11)).await;

    let transaction = Transaction::new("5555555555554444", 120, "MERCHANT_003");
    let reply = terminal.submit(&transaction).await.expect("submit");

    assert!(matches!(reply, Some(ServerReply::Declined { .. })));
    let records = store.snapshot();
    assert_eq!(records.len(), 1);
    assert!(matches!(records[0].status, TransactionStatus::Declined(_)));
    assert!(records[0]
        .status
        .to_string()
        .starts_with("DECLINED_"));
}

#[tokio::test]
async fn certain_timeout_exhausts_retries() {
    let mut config = FaultConfig::disabled();
    config.timeout = 1.0;
    let (terminal, store, _shutdown) = boot(FaultPolicy::seeded(config, 12)).await;

    let transaction = Transaction::new("4111111111111111", 980, "MERCHANT_001");
    let err = terminal.submit(&transaction).await.unwrap_err();

    assert!(matches!(err, ProtocolError::Timeout));
    // Nothing persisted on the dropped path.
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn certain_service_unavailable_reported_as_error() {
    let mut config = FaultConfig::disabled();
    config.service_unavailable = 1.0;
    let (terminal, store, _shutdown) = boot(FaultPolicy::seeded(config, 13)).await;

    let transaction = Transaction::new("4242424242424242", 50, "MERCHANT_001");
    let reply = terminal.submit(&transaction).await.expect("submit");

    match reply {
        Some(ServerReply::Error { code, .. }) => assert_eq!(code, 0x05),
        other => panic!("expected error reply, got {other:?}"),
    }
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn client_times_out_when_no_server_is_listening() {
    // Bind then immediately shut down; the port stays closed.
    let (terminal, _store, shutdown) = boot(FaultPolicy::disabled()).await;
    shutdown.send(()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let transaction = Transaction::new("4111111111111111", 100, "MERCHANT_001");
    let result = terminal.submit(&transaction).await;
    assert!(result.is_err());
}
