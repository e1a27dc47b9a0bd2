//! POS terminal binary.
//!
//! Usage:
//! ```text
//! pos-terminal [config.toml] [count]
//! ```
//! Submits `count` randomly generated transactions (default 10), one fresh
//! connection each, and prints a tally at the end. The acquirer's public
//! key must be configured; there is no ephemeral fallback on this side
//! because the server would not be able to unwrap the session key.

use acquiring_protocol::config::AcquiringConfig;
use acquiring_protocol::core::response::ServerReply;
use acquiring_protocol::error::{ProtocolError, Result};
use acquiring_protocol::service::PosTerminal;
use acquiring_protocol::utils::{keys, logging, Envelope};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let config = match args.get(1) {
        Some(path) => AcquiringConfig::from_file(path)?,
        None => AcquiringConfig::from_env()?,
    };
    logging::init(&config.logging);
    config.validate_strict()?;

    let count: u32 = args
        .get(2)
        .map(|raw| {
            raw.parse()
                .map_err(|_| ProtocolError::ConfigError(format!("invalid count: {raw}")))
        })
        .transpose()?
        .unwrap_or(10);

    let public_key_path = config.keys.public_key_path.as_deref().ok_or_else(|| {
        ProtocolError::ConfigError("public_key_path must be configured for the terminal".into())
    })?;
    let public_key = keys::load_public_key(public_key_path)?;
    let envelope = Envelope::for_terminal(public_key, config.keys.hmac_secret.clone().into_bytes());

    let terminal = PosTerminal::new(config.client.clone(), envelope);

    let mut approved = 0u32;
    let mut declined = 0u32;
    let mut errors = 0u32;
    let mut no_reply = 0u32;

    for i in 1..=count {
        info!(submission = i, total = count, "starting authorization");
        match terminal.submit_random().await {
            Ok((_, Some(ServerReply::Approved { .. }))) => approved += 1,
            Ok((_, Some(ServerReply::Declined { .. }))) => declined += 1,
            Ok((_, Some(ServerReply::Error { .. }))) => errors += 1,
            Ok((_, None)) => no_reply += 1,
            Err(ProtocolError::Timeout) => {
                error!(submission = i, "no response after all attempts");
                no_reply += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(approved, declined, errors, no_reply, "terminal run complete");
    Ok(())
}
