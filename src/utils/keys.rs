//! RSA key material handling.
//!
//! The acquirer's private key is PKCS#8 PEM (`BEGIN PRIVATE KEY`), the
//! terminal's copy of the public key is SPKI PEM (`BEGIN PUBLIC KEY`).
//! When no key file is configured the server may fall back to a freshly
//! generated ephemeral pair, which is also how the tooling seeds a new
//! deployment.

use rsa::pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding,
};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{ProtocolError, Result};

/// RSA modulus size; OAEP under this modulus wraps to exactly 256 bytes.
pub const RSA_KEY_BITS: usize = 2048;

/// Default file names written by [`write_key_pair`].
pub const PRIVATE_KEY_FILE: &str = "server-private.pem";
pub const PUBLIC_KEY_FILE: &str = "server-public.pem";

/// Generate a fresh 2048-bit key pair.
pub fn generate_key_pair() -> Result<(RsaPrivateKey, RsaPublicKey)> {
    let mut rng = rand_core::OsRng;
    let private = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
        .map_err(|e| ProtocolError::KeyMaterial(format!("key generation failed: {e}")))?;
    let public = RsaPublicKey::from(&private);
    Ok((private, public))
}

/// Parse a PKCS#8 PEM private key.
pub fn parse_private_key_pem(pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .map_err(|e| ProtocolError::KeyMaterial(format!("invalid private key PEM: {e}")))
}

/// Parse an SPKI PEM public key.
pub fn parse_public_key_pem(pem: &str) -> Result<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem)
        .map_err(|e| ProtocolError::KeyMaterial(format!("invalid public key PEM: {e}")))
}

/// Load a private key from a PEM file.
pub fn load_private_key<P: AsRef<Path>>(path: P) -> Result<RsaPrivateKey> {
    let pem = fs::read_to_string(&path).map_err(|e| {
        ProtocolError::KeyMaterial(format!(
            "cannot read private key {}: {e}",
            path.as_ref().display()
        ))
    })?;
    parse_private_key_pem(&pem)
}

/// Load a public key from a PEM file.
pub fn load_public_key<P: AsRef<Path>>(path: P) -> Result<RsaPublicKey> {
    let pem = fs::read_to_string(&path).map_err(|e| {
        ProtocolError::KeyMaterial(format!(
            "cannot read public key {}: {e}",
            path.as_ref().display()
        ))
    })?;
    parse_public_key_pem(&pem)
}

/// Load the server private key, falling back to an ephemeral pair when the
/// configured file is missing or unreadable.
pub fn load_or_generate_private_key(path: Option<&Path>) -> Result<RsaPrivateKey> {
    if let Some(path) = path {
        match load_private_key(path) {
            Ok(key) => {
                info!(path = %path.display(), "loaded server private key");
                return Ok(key);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "private key unavailable, generating ephemeral key pair");
            }
        }
    }
    let (private, _) = generate_key_pair()?;
    Ok(private)
}

/// Write both halves of a key pair as PEM files into `dir`.
pub fn write_key_pair(private: &RsaPrivateKey, dir: &Path) -> Result<()> {
    let private_pem = private
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| ProtocolError::KeyMaterial(format!("cannot encode private key: {e}")))?;
    let public_pem = RsaPublicKey::from(private)
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| ProtocolError::KeyMaterial(format!("cannot encode public key: {e}")))?;

    fs::create_dir_all(dir)?;
    let private_path = dir.join(PRIVATE_KEY_FILE);
    let public_path = dir.join(PUBLIC_KEY_FILE);
    fs::write(&private_path, private_pem.as_bytes())?;
    fs::write(&public_path, public_pem.as_bytes())?;

    info!(private = %private_path.display(), public = %public_path.display(), "RSA key pair written");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use rsa::traits::PublicKeyParts;

    #[test]
    fn pem_round_trip() {
        let (private, public) = generate_key_pair().unwrap();

        let private_pem = private.to_pkcs8_pem(LineEnding::LF).unwrap();
        let public_pem = public.to_public_key_pem(LineEnding::LF).unwrap();
        assert!(private_pem.contains("BEGIN PRIVATE KEY"));
        assert!(public_pem.contains("BEGIN PUBLIC KEY"));

        let reparsed_private = parse_private_key_pem(&private_pem).unwrap();
        let reparsed_public = parse_public_key_pem(&public_pem).unwrap();
        assert_eq!(reparsed_private, private);
        assert_eq!(reparsed_public, public);
    }

    #[test]
    fn missing_file_falls_back_to_ephemeral() {
        let key = load_or_generate_private_key(Some(Path::new("/nonexistent/key.pem"))).unwrap();
        assert_eq!(key.size() * 8, RSA_KEY_BITS);
    }
}
