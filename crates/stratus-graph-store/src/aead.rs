//! Authenticated encryption for persisted graphs.

use aes_gcm::aead::{Aead as _, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::Rng;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Errors from sealing or opening payloads.
#[derive(Debug, thiserror::Error)]
pub enum AeadError {
  /// The key is the wrong size or encoding.
  #[error("invalid encryption key: {0}")]
  InvalidKey(String),

  /// Sealing failed.
  #[error("encryption failed")]
  Seal,

  /// The ciphertext is truncated, corrupted, or was sealed under another key.
  #[error("ciphertext failed authentication")]
  Authentication,
}

/// Authenticated sealing and opening of byte payloads.
///
/// Key material and its lifecycle belong to the implementation.
pub trait Aead: Send + Sync {
  fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, AeadError>;

  /// Returns [`AeadError::Authentication`] for any ciphertext that was not
  /// produced by `seal` under the same key, never altered plaintext.
  fn open(&self, ciphertext: &[u8]) -> Result<Vec<u8>, AeadError>;
}

/// AES-256-GCM sealing.
///
/// Ciphertext layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
/// A fresh random nonce is drawn for every seal.
pub struct AesGcmAead {
  cipher: Aes256Gcm,
}

impl AesGcmAead {
  pub fn new(key: [u8; 32]) -> Self {
    let key = Key::<Aes256Gcm>::from_slice(&key);
    Self {
      cipher: Aes256Gcm::new(key),
    }
  }

  /// Build from a base64-encoded 32-byte key.
  pub fn from_base64_key(key_base64: &str) -> Result<Self, AeadError> {
    let bytes = BASE64
      .decode(key_base64.trim())
      .map_err(|e| AeadError::InvalidKey(format!("invalid base64: {e}")))?;

    let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
      AeadError::InvalidKey(format!("key must be 32 bytes, got {}", bytes.len()))
    })?;

    Ok(Self::new(key))
  }

  /// Generate a random key, base64 encoded.
  pub fn generate_key() -> String {
    let mut key = [0u8; 32];
    rand::thread_rng().fill(&mut key);
    BASE64.encode(key)
  }
}

impl Aead for AesGcmAead {
  fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, AeadError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill(&mut nonce_bytes);

    let ciphertext = self
      .cipher
      .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
      .map_err(|_| AeadError::Seal)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
  }

  fn open(&self, ciphertext: &[u8]) -> Result<Vec<u8>, AeadError> {
    if ciphertext.len() < NONCE_LEN + TAG_LEN {
      return Err(AeadError::Authentication);
    }

    let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
    self
      .cipher
      .decrypt(Nonce::from_slice(nonce), sealed)
      .map_err(|_| AeadError::Authentication)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn test_aead() -> AesGcmAead {
    AesGcmAead::new([7u8; 32])
  }

  #[test]
  fn test_seal_open_roundtrip() {
    let aead = test_aead();
    let sealed = aead.seal(b"kubeadmin-password").unwrap();
    assert_eq!(sealed.len(), NONCE_LEN + 18 + TAG_LEN);
    assert_eq!(aead.open(&sealed).unwrap(), b"kubeadmin-password");
  }

  #[test]
  fn test_seal_uses_fresh_nonce() {
    let aead = test_aead();
    assert_ne!(aead.seal(b"same").unwrap(), aead.seal(b"same").unwrap());
  }

  #[test]
  fn test_every_single_byte_flip_fails_authentication() {
    let aead = test_aead();
    let sealed = aead.seal(b"{\"secret\":true}").unwrap();

    for i in 0..sealed.len() {
      let mut tampered = sealed.clone();
      tampered[i] ^= 0x01;
      assert!(
        matches!(aead.open(&tampered), Err(AeadError::Authentication)),
        "flip at byte {i} was not detected"
      );
    }
  }

  #[test]
  fn test_wrong_key_fails_authentication() {
    let sealed = test_aead().seal(b"payload").unwrap();
    let other = AesGcmAead::new([8u8; 32]);
    assert!(matches!(other.open(&sealed), Err(AeadError::Authentication)));
  }

  #[test]
  fn test_truncated_ciphertext_fails_authentication() {
    assert!(matches!(
      test_aead().open(&[0u8; 10]),
      Err(AeadError::Authentication)
    ));
  }

  #[test]
  fn test_base64_key_roundtrip() {
    let key = AesGcmAead::generate_key();
    let aead = AesGcmAead::from_base64_key(&key).unwrap();
    let sealed = aead.seal(b"x").unwrap();
    assert_eq!(
      AesGcmAead::from_base64_key(&key).unwrap().open(&sealed).unwrap(),
      b"x"
    );
  }

  #[test]
  fn test_invalid_keys_rejected() {
    assert!(matches!(
      AesGcmAead::from_base64_key("not base64!!"),
      Err(AeadError::InvalidKey(_))
    ));
    assert!(matches!(
      AesGcmAead::from_base64_key(&BASE64.encode([0u8; 16])),
      Err(AeadError::InvalidKey(_))
    ));
  }
}
