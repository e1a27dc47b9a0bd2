//! # Configuration Management
//!
//! Centralized configuration for the acquiring network simulator.
//!
//! This module provides structured configuration for the acquiring server and
//! the POS terminal client: listen/target addresses, timeouts and retry
//! behavior, key material locations, the pre-shared HMAC secret, and the
//! fault-injection probability table.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-variable overrides via `from_env()`
//!
//! ## Security Considerations
//! - The HMAC secret is injected here and never hard-coded elsewhere
//! - Fault probabilities are validated into [0, 1] before use

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

use crate::error::{ProtocolError, Result};

/// Worker pool size of the original deployment.
pub const DEFAULT_WORKERS: usize = 10;

/// Client socket read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(3000);

/// Fixed delay between client retry attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(3000);

/// One initial attempt plus one retry.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Default fault rates (independent Bernoulli trials per request).
pub const DEFAULT_TIMEOUT_RATE: f64 = 0.05;
pub const DEFAULT_UNAVAILABLE_RATE: f64 = 0.02;
pub const DEFAULT_REJECTION_RATE: f64 = 0.03;
pub const DEFAULT_DB_FAILURE_RATE: f64 = 0.01;
pub const DEFAULT_CORRUPTION_RATE: f64 = 0.005;

/// Upper bound of the emulated network delay, in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 100;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AcquiringConfig {
    /// Acquiring-server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// POS-terminal configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Key material and pre-shared secret
    #[serde(default)]
    pub keys: KeyConfig,

    /// Fault-injection probability table
    #[serde(default)]
    pub faults: FaultConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AcquiringConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("ACQUIRING_SERVER_ADDRESS") {
            config.server.address = addr.clone();
            config.client.server_address = addr;
        }

        if let Ok(workers) = std::env::var("ACQUIRING_WORKERS") {
            if let Ok(val) = workers.parse::<usize>() {
                config.server.max_workers = val;
            }
        }

        if let Ok(secret) = std::env::var("ACQUIRING_HMAC_SECRET") {
            config.keys.hmac_secret = secret;
        }

        if let Ok(path) = std::env::var("ACQUIRING_PRIVATE_KEY") {
            config.keys.private_key_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("ACQUIRING_PUBLIC_KEY") {
            config.keys.public_key_path = Some(PathBuf::from(path));
        }

        if let Ok(timeout) = std::env::var("ACQUIRING_READ_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.client.read_timeout = Duration::from_millis(val);
            }
        }

        if let Ok(seed) = std::env::var("ACQUIRING_FAULT_SEED") {
            if let Ok(val) = seed.parse::<u64>() {
                config.faults.seed = Some(val);
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.client.validate());
        errors.extend(self.keys.validate());
        errors.extend(self.faults.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Acquiring-server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g., "127.0.0.1:9000")
    pub address: String,

    /// Bounded worker pool size; one worker per connection for its lifetime
    pub max_workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:9000"),
            max_workers: DEFAULT_WORKERS,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Server address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid server address format: '{}' (expected format: '0.0.0.0:9000')",
                self.address
            ));
        }

        if self.max_workers == 0 {
            errors.push("Worker pool size must be greater than 0".to_string());
        } else if self.max_workers > 1024 {
            errors.push(format!(
                "Worker pool very large: {} (each worker blocks on one connection)",
                self.max_workers
            ));
        }

        errors
    }
}

/// POS-terminal configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Acquiring server address to connect to
    pub server_address: String,

    /// Socket read timeout per attempt
    #[serde(with = "duration_serde")]
    pub read_timeout: Duration,

    /// Fixed delay before the retry attempt
    #[serde(with = "duration_serde")]
    pub retry_delay: Duration,

    /// Total attempts: the initial send plus retries (timeouts only)
    pub max_attempts: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: String::from("127.0.0.1:9000"),
            read_timeout: DEFAULT_READ_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ClientConfig {
    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.server_address.is_empty() {
            errors.push("Client server address cannot be empty".to_string());
        }

        if self.read_timeout.as_millis() < 10 {
            errors.push("Read timeout too short (minimum: 10ms)".to_string());
        } else if self.read_timeout.as_secs() > 60 {
            errors.push("Read timeout too long (maximum: 60s)".to_string());
        }

        if self.max_attempts == 0 {
            errors.push("Max attempts must be greater than 0".to_string());
        } else if self.max_attempts > 10 {
            errors.push(format!(
                "Max attempts very high: {} (each retry waits the full retry delay)",
                self.max_attempts
            ));
        }

        errors
    }
}

/// Key material locations and the pre-shared HMAC secret
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct KeyConfig {
    /// Acquirer private key (PKCS#8 PEM); server side only
    pub private_key_path: Option<PathBuf>,

    /// Acquirer public key (SPKI PEM); terminal side only
    pub public_key_path: Option<PathBuf>,

    /// Static pre-shared HMAC secret, shared by both sides
    #[serde(default)]
    pub hmac_secret: String,
}

impl KeyConfig {
    /// Validate key configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.hmac_secret.is_empty() {
            errors.push("HMAC secret must be configured (never hard-coded)".to_string());
        } else if self.hmac_secret.len() < 16 {
            errors.push(format!(
                "HMAC secret too short: {} bytes (minimum: 16)",
                self.hmac_secret.len()
            ));
        }

        errors
    }
}

/// Fault-injection probability table
///
/// Each probability is an independent Bernoulli trial per request; the
/// processor's ordering makes an earlier-triggered fault pre-empt later
/// ones. A fixed seed makes the whole trial sequence deterministic.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FaultConfig {
    /// Probability the server drops the request without responding
    pub timeout: f64,

    /// Probability of a SERVICE_UNAVAILABLE rejection
    pub service_unavailable: f64,

    /// Probability the issuing bank declines the transaction
    pub bank_rejection: f64,

    /// Probability persistence fails after authorization
    pub database_failure: f64,

    /// Probability of emulated data corruption after integrity passes
    pub data_corruption: f64,

    /// Upper bound (inclusive) of the uniform network delay, milliseconds
    pub max_delay_ms: u64,

    /// Fixed RNG seed for deterministic trials; None draws from the OS
    pub seed: Option<u64>,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_RATE,
            service_unavailable: DEFAULT_UNAVAILABLE_RATE,
            bank_rejection: DEFAULT_REJECTION_RATE,
            database_failure: DEFAULT_DB_FAILURE_RATE,
            data_corruption: DEFAULT_CORRUPTION_RATE,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            seed: None,
        }
    }
}

impl FaultConfig {
    /// All probabilities disabled; used by tests and fault-free deployments.
    pub fn disabled() -> Self {
        Self {
            timeout: 0.0,
            service_unavailable: 0.0,
            bank_rejection: 0.0,
            database_failure: 0.0,
            data_corruption: 0.0,
            max_delay_ms: 0,
            seed: None,
        }
    }

    /// Validate fault configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (name, p) in [
            ("timeout", self.timeout),
            ("service_unavailable", self.service_unavailable),
            ("bank_rejection", self.bank_rejection),
            ("database_failure", self.database_failure),
            ("data_corruption", self.data_corruption),
        ] {
            if !(0.0..=1.0).contains(&p) {
                errors.push(format!(
                    "Fault probability '{name}' out of range: {p} (valid range: 0.0-1.0)"
                ));
            }
        }

        if self.max_delay_ms > 10_000 {
            errors.push(format!(
                "Max emulated delay too long: {}ms (maximum: 10s)",
                self.max_delay_ms
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback log level when RUST_LOG is unset
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to include event targets in output
    pub log_targets: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            log_targets: false,
        }
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn defaults_match_original_deployment() {
        let config = AcquiringConfig::default();
        assert_eq!(config.server.max_workers, 10);
        assert_eq!(config.client.read_timeout, Duration::from_millis(3000));
        assert_eq!(config.client.max_attempts, 2);
        assert!((config.faults.timeout - 0.05).abs() < f64::EPSILON);
        assert!((config.faults.data_corruption - 0.005).abs() < f64::EPSILON);
    }

    #[test]
    fn defaults_validate_except_hmac_secret() {
        let errors = AcquiringConfig::default().validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("HMAC secret"));
    }

    #[test]
    fn toml_round_trip() {
        let config = AcquiringConfig::default_with_overrides(|c| {
            c.keys.hmac_secret = "integration-secret-01".into();
            c.faults.seed = Some(7);
        });

        let toml = toml::to_string(&config).unwrap();
        let parsed = AcquiringConfig::from_toml(&toml).unwrap();
        assert_eq!(parsed.keys.hmac_secret, "integration-secret-01");
        assert_eq!(parsed.faults.seed, Some(7));
        assert_eq!(parsed.client.retry_delay, Duration::from_millis(3000));
    }

    #[test]
    fn out_of_range_probability_rejected() {
        let config = AcquiringConfig::default_with_overrides(|c| {
            c.keys.hmac_secret = "integration-secret-01".into();
            c.faults.bank_rejection = 1.5;
        });

        assert!(config.validate_strict().is_err());
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let config = AcquiringConfig::default_with_overrides(|c| {
            c.server.max_workers = 32;
        });
        assert_eq!(config.server.max_workers, 32);
        assert_eq!(config.client.max_attempts, DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn bad_address_rejected() {
        let mut config = ServerConfig::default();
        config.address = "not-an-address".into();
        assert!(!config.validate().is_empty());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let parsed = AcquiringConfig::from_toml(
            r#"
            [keys]
            hmac_secret = "from-file-secret-123"

            [faults]
            timeout = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(parsed.keys.hmac_secret, "from-file-secret-123");
        assert!((parsed.faults.timeout - 0.5).abs() < f64::EPSILON);
        assert_eq!(parsed.server.max_workers, 10);
    }
}
