//! Acquiring server binary.
//!
//! Usage:
//! ```text
//! acquiring-server [config.toml]
//! acquiring-server --write-keys <dir>
//! ```
//! Without a config file the configuration comes from defaults plus
//! `ACQUIRING_*` environment variables. `--write-keys` generates a fresh
//! RSA pair, writes both PEM files into the directory, and exits.

use std::sync::Arc;

use acquiring_protocol::config::AcquiringConfig;
use acquiring_protocol::error::Result;
use acquiring_protocol::protocol::{FaultPolicy, PacketProcessor};
use acquiring_protocol::service::{AcquiringServer, MemoryStore};
use acquiring_protocol::utils::{keys, logging, Envelope};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.get(1).map(String::as_str) == Some("--write-keys") {
        let dir = args
            .get(2)
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|| std::path::PathBuf::from("."));
        logging::init(&Default::default());
        let (private, _) = keys::generate_key_pair()?;
        keys::write_key_pair(&private, &dir)?;
        return Ok(());
    }

    let config = match args.get(1) {
        Some(path) => AcquiringConfig::from_file(path)?,
        None => AcquiringConfig::from_env()?,
    };
    logging::init(&config.logging);
    config.validate_strict()?;

    let private_key = keys::load_or_generate_private_key(config.keys.private_key_path.as_deref())?;
    let envelope = Envelope::for_acquirer(
        private_key,
        config.keys.hmac_secret.clone().into_bytes(),
    );

    let store = Arc::new(MemoryStore::new());
    let processor = PacketProcessor::new(
        envelope,
        FaultPolicy::new(config.faults.clone()),
        store.clone(),
    );

    let server =
        AcquiringServer::bind(&config.server.address, processor, config.server.max_workers).await?;
    let result = server.run().await;

    info!(transactions = store.len(), "server stopped");
    result
}
