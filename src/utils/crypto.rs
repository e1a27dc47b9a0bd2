//! # Crypto Envelope
//!
//! Hybrid encryption for authorization requests.
//!
//! Every request carries its own ephemeral 256-bit AES session key, wrapped
//! under the acquirer's 2048-bit RSA public key with OAEP (SHA-256 digest and
//! MGF1). The TLV payload is sealed with AES-256-GCM (12-byte nonce, 128-bit
//! tag appended to the ciphertext), and an HMAC-SHA256 integrity tag is
//! computed over the ciphertext with a static pre-shared secret.
//!
//! ## Security Notes
//! - The session key lives for one packet and is zeroized on drop.
//! - The integrity tag covers only the sealed payload; header fields are
//!   validated separately by the processor.
//! - The HMAC secret is injected configuration, not derived per session.
//!   Integrity verification uses a constant-time comparison.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use hmac::{Hmac, Mac};
use rand_core::{OsRng, RngCore};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{ProtocolError, Result};

/// Session key size in bytes (AES-256).
pub const SESSION_KEY_LEN: usize = 32;

/// RSA-2048 OAEP output size; the wrapped key is always this long.
pub const WRAPPED_KEY_LEN: usize = 256;

/// AES-GCM nonce size in bytes.
pub const IV_LEN: usize = 12;

/// HMAC-SHA256 output size in bytes.
pub const INTEGRITY_TAG_LEN: usize = 32;

/// AES-GCM authentication tag appended to every ciphertext.
pub const GCM_TAG_LEN: usize = 16;

type HmacSha256 = Hmac<Sha256>;

/// Generate a fresh 256-bit session key. Never reused across packets.
pub fn generate_session_key() -> Zeroizing<[u8; SESSION_KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; SESSION_KEY_LEN]);
    OsRng.fill_bytes(&mut *key);
    key
}

/// Generate a random 12-byte AES-GCM nonce.
pub fn generate_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Seal a payload with AES-256-GCM. The 16-byte authentication tag is
/// appended to the returned ciphertext.
pub fn seal_payload(
    plaintext: &[u8],
    key: &[u8; SESSION_KEY_LEN],
    iv: &[u8; IV_LEN],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|_| ProtocolError::SealFailure)
}

/// Open a sealed payload, verifying the appended AES-GCM tag.
///
/// # Errors
/// `AuthenticatedDecryption` on tag mismatch or malformed ciphertext.
pub fn open_payload(
    ciphertext: &[u8],
    key: &[u8; SESSION_KEY_LEN],
    iv: &[u8; IV_LEN],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| ProtocolError::AuthenticatedDecryption)
}

/// Key material for one side of the protocol.
///
/// The terminal holds the acquirer's public key; the acquirer holds the
/// private key. Both hold the pre-shared HMAC secret. Keys are injected so
/// tests can supply their own pair.
pub struct Envelope {
    public_key: Option<RsaPublicKey>,
    private_key: Option<RsaPrivateKey>,
    hmac_secret: Vec<u8>,
}

impl Envelope {
    /// Build an envelope from explicit key material.
    pub fn new(
        public_key: Option<RsaPublicKey>,
        private_key: Option<RsaPrivateKey>,
        hmac_secret: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            public_key,
            private_key,
            hmac_secret: hmac_secret.into(),
        }
    }

    /// Terminal-side envelope: wrap-only.
    pub fn for_terminal(public_key: RsaPublicKey, hmac_secret: impl Into<Vec<u8>>) -> Self {
        Self::new(Some(public_key), None, hmac_secret)
    }

    /// Acquirer-side envelope: unwrap-only.
    pub fn for_acquirer(private_key: RsaPrivateKey, hmac_secret: impl Into<Vec<u8>>) -> Self {
        Self::new(None, Some(private_key), hmac_secret)
    }

    /// Wrap a session key under the acquirer's public key.
    ///
    /// # Errors
    /// `KeyMaterial` when no public key is loaded, `KeyWrap` when OAEP
    /// encryption fails or produces an unexpected size.
    pub fn wrap_session_key(&self, key: &[u8; SESSION_KEY_LEN]) -> Result<Vec<u8>> {
        let public_key = self
            .public_key
            .as_ref()
            .ok_or_else(|| ProtocolError::KeyMaterial("no public key loaded".into()))?;

        let wrapped = public_key
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), key.as_slice())
            .map_err(|_| ProtocolError::KeyWrap)?;

        if wrapped.len() != WRAPPED_KEY_LEN {
            return Err(ProtocolError::KeyWrap);
        }
        Ok(wrapped)
    }

    /// Unwrap a session key with the acquirer's private key.
    ///
    /// # Errors
    /// `KeyMaterial` when no private key is loaded, `KeyUnwrap` on OAEP
    /// failure or when the plaintext is not a 256-bit key.
    pub fn unwrap_session_key(&self, wrapped: &[u8]) -> Result<Zeroizing<[u8; SESSION_KEY_LEN]>> {
        let private_key = self
            .private_key
            .as_ref()
            .ok_or_else(|| ProtocolError::KeyMaterial("no private key loaded".into()))?;

        let plain = Zeroizing::new(
            private_key
                .decrypt(Oaep::new::<Sha256>(), wrapped)
                .map_err(|_| ProtocolError::KeyUnwrap)?,
        );

        if plain.len() != SESSION_KEY_LEN {
            return Err(ProtocolError::KeyUnwrap);
        }
        let mut key = Zeroizing::new([0u8; SESSION_KEY_LEN]);
        key.copy_from_slice(&plain);
        Ok(key)
    }

    /// HMAC-SHA256 over the ciphertext with the pre-shared secret.
    pub fn compute_integrity_tag(&self, data: &[u8]) -> Result<[u8; INTEGRITY_TAG_LEN]> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.hmac_secret)
            .map_err(|_| ProtocolError::KeyMaterial("invalid HMAC secret".into()))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().into())
    }

    /// Constant-time verification of an integrity tag.
    pub fn verify_integrity_tag(&self, data: &[u8], tag: &[u8]) -> bool {
        let Ok(mut mac) = <HmacSha256 as Mac>::new_from_slice(&self.hmac_secret) else {
            return false;
        };
        mac.update(data);
        mac.verify_slice(tag).is_ok()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::utils::keys;
    use std::sync::OnceLock;

    fn test_key_pair() -> &'static (RsaPrivateKey, RsaPublicKey) {
        static PAIR: OnceLock<(RsaPrivateKey, RsaPublicKey)> = OnceLock::new();
        PAIR.get_or_init(|| keys::generate_key_pair().expect("key generation"))
    }

    fn both_sides() -> Envelope {
        let (private, public) = test_key_pair().clone();
        Envelope::new(Some(public), Some(private), b"test-hmac-secret".to_vec())
    }

    #[test]
    fn wrap_unwrap_round_trip() {
        let envelope = both_sides();
        let key = generate_session_key();

        let wrapped = envelope.wrap_session_key(&key).unwrap();
        assert_eq!(wrapped.len(), WRAPPED_KEY_LEN);

        let unwrapped = envelope.unwrap_session_key(&wrapped).unwrap();
        assert_eq!(&*unwrapped, &*key);
    }

    #[test]
    fn unwrap_garbage_fails() {
        let envelope = both_sides();
        let garbage = vec![0x5A; WRAPPED_KEY_LEN];
        assert!(matches!(
            envelope.unwrap_session_key(&garbage),
            Err(ProtocolError::KeyUnwrap)
        ));
    }

    #[test]
    fn wrap_without_public_key_fails() {
        let envelope = Envelope::new(None, None, b"secret".to_vec());
        let key = generate_session_key();
        assert!(matches!(
            envelope.wrap_session_key(&key),
            Err(ProtocolError::KeyMaterial(_))
        ));
    }

    #[test]
    fn seal_open_round_trip() {
        let key = generate_session_key();
        let iv = generate_iv();
        let plaintext = b"authorization payload";

        let sealed = seal_payload(plaintext, &key, &iv).unwrap();
        assert_eq!(sealed.len(), plaintext.len() + GCM_TAG_LEN);

        let opened = open_payload(&sealed, &key, &iv).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn any_flipped_ciphertext_byte_breaks_open() {
        let key = generate_session_key();
        let iv = generate_iv();
        let sealed = seal_payload(b"payload", &key, &iv).unwrap();

        for i in 0..sealed.len() {
            let mut tampered = sealed.clone();
            tampered[i] ^= 0x01;
            assert!(
                matches!(
                    open_payload(&tampered, &key, &iv),
                    Err(ProtocolError::AuthenticatedDecryption)
                ),
                "flip at byte {i} went undetected"
            );
        }
    }

    #[test]
    fn integrity_tag_round_trip_and_tamper() {
        let envelope = Envelope::new(None, None, b"psk".to_vec());
        let data = b"ciphertext bytes";
        let tag = envelope.compute_integrity_tag(data).unwrap();

        assert!(envelope.verify_integrity_tag(data, &tag));

        for i in 0..data.len() {
            let mut bad_data = data.to_vec();
            bad_data[i] ^= 0x80;
            assert!(!envelope.verify_integrity_tag(&bad_data, &tag));
        }
        for i in 0..tag.len() {
            let mut bad_tag = tag;
            bad_tag[i] ^= 0x80;
            assert!(!envelope.verify_integrity_tag(data, &bad_tag));
        }
    }

    #[test]
    fn integrity_tag_matches_rfc_4231_vector() {
        // RFC 4231 test case 2.
        let envelope = Envelope::new(None, None, b"Jefe".to_vec());
        let tag = envelope
            .compute_integrity_tag(b"what do ya want for nothing?")
            .unwrap();
        assert_eq!(
            hex::encode(tag),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn different_secrets_disagree() {
        let a = Envelope::new(None, None, b"secret-a".to_vec());
        let b = Envelope::new(None, None, b"secret-b".to_vec());
        let tag = a.compute_integrity_tag(b"data").unwrap();
        assert!(!b.verify_integrity_tag(b"data", &tag));
    }
}
