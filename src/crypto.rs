//! Token encryption module using AES-256-GCM
//!
//! This module provides encryption and decryption for the Shopify admin
//! access token stored on each tenant row, using AES-256-GCM with the shop
//! domain as additional authenticated data so ciphertext cannot be replayed
//! across tenants.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

const VERSION_ENCRYPTED: u8 = 0x01;
const VERSION_FIELD_LEN: usize = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const MIN_ENCRYPTED_LEN: usize = VERSION_FIELD_LEN + NONCE_LEN + TAG_LEN;

/// Crypto error types
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("invalid ciphertext format")]
    InvalidFormat,
    #[error("empty ciphertext")]
    EmptyCiphertext,
}

/// Secure wrapper for encryption keys with zeroization
#[derive(Debug, Clone, Zeroize, ZeroizeOnDrop)]
pub struct ZeroizingKey(Vec<u8>);

/// Type alias for crypto keys
pub type CryptoKey = ZeroizingKey;

impl CryptoKey {
    /// Create a new crypto key from bytes
    pub fn new(bytes: Vec<u8>) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::EncryptionFailed(
                "Invalid key length: expected 32 bytes".to_string(),
            ));
        }
        Ok(ZeroizingKey(bytes))
    }

    /// Get the key as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Encrypt bytes using AES-256-GCM
pub fn encrypt_bytes(
    key: &CryptoKey,
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher_key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
    let cipher = Aes256Gcm::new(cipher_key);

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    // Prepend version byte and nonce to ciphertext
    let mut result = Vec::with_capacity(VERSION_FIELD_LEN + NONCE_LEN + ciphertext.len());
    result.push(VERSION_ENCRYPTED);
    result.extend_from_slice(&nonce);
    result.append(&mut ciphertext);

    Ok(result)
}

/// Decrypt bytes using AES-256-GCM
pub fn decrypt_bytes(
    key: &CryptoKey,
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() {
        return Err(CryptoError::EmptyCiphertext);
    }

    // Detect legacy plaintext payloads (no version marker)
    if ciphertext[0] != VERSION_ENCRYPTED {
        return Ok(ciphertext.to_vec());
    }

    if ciphertext.len() < MIN_ENCRYPTED_LEN {
        return Err(CryptoError::InvalidFormat);
    }

    let nonce = Nonce::from_slice(&ciphertext[VERSION_FIELD_LEN..VERSION_FIELD_LEN + NONCE_LEN]);
    let tag_and_ct = &ciphertext[VERSION_FIELD_LEN + NONCE_LEN..];

    debug_assert!(tag_and_ct.len() >= TAG_LEN);

    let cipher_key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
    let cipher = Aes256Gcm::new(cipher_key);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: tag_and_ct,
                aad,
            },
        )
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

/// Determine if a payload is using the encrypted format
pub fn is_encrypted_payload(ciphertext: &[u8]) -> bool {
    ciphertext.len() >= MIN_ENCRYPTED_LEN && ciphertext[0] == VERSION_ENCRYPTED
}

/// Encrypt a tenant's Shopify access token, binding it to the shop domain
pub fn encrypt_access_token(
    key: &CryptoKey,
    shopify_domain: &str,
    access_token: &str,
) -> Result<Vec<u8>, CryptoError> {
    encrypt_bytes(key, shopify_domain.as_bytes(), access_token.as_bytes())
}

/// Encrypt an access token when a key is configured; local profiles without
/// a key store the token as legacy plaintext bytes.
pub fn seal_access_token(
    key_bytes: Option<&[u8]>,
    shopify_domain: &str,
    access_token: &str,
) -> Result<Vec<u8>, CryptoError> {
    match key_bytes {
        Some(bytes) => {
            let key = CryptoKey::new(bytes.to_vec())?;
            encrypt_access_token(&key, shopify_domain, access_token)
        }
        None => Ok(access_token.as_bytes().to_vec()),
    }
}

/// Recover the plaintext access token from whatever form is stored.
pub fn open_access_token(
    key_bytes: Option<&[u8]>,
    shopify_domain: &str,
    ciphertext: &[u8],
) -> Result<String, CryptoError> {
    match key_bytes {
        Some(bytes) => {
            let key = CryptoKey::new(bytes.to_vec())?;
            decrypt_access_token(&key, shopify_domain, ciphertext)
        }
        None if is_encrypted_payload(ciphertext) => Err(CryptoError::DecryptionFailed(
            "ciphertext present but no crypto key configured".to_string(),
        )),
        None => String::from_utf8(ciphertext.to_vec())
            .map_err(|e| CryptoError::DecryptionFailed(format!("Invalid UTF-8: {}", e))),
    }
}

/// Decrypt a tenant's Shopify access token
pub fn decrypt_access_token(
    key: &CryptoKey,
    shopify_domain: &str,
    ciphertext: &[u8],
) -> Result<String, CryptoError> {
    let bytes = decrypt_bytes(key, shopify_domain.as_bytes(), ciphertext)?;
    String::from_utf8(bytes)
        .map_err(|e| CryptoError::DecryptionFailed(format!("Invalid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> CryptoKey {
        CryptoKey::new(vec![0u8; 32]).expect("valid test key")
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key();
        let aad = b"test-aad";
        let plaintext = b"secret message";

        let encrypted = encrypt_bytes(&key, aad, plaintext).expect("encryption succeeds");
        let decrypted = decrypt_bytes(&key, aad, &encrypted).expect("decryption succeeds");

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_different_aad_fails() {
        let key = test_key();
        let plaintext = b"secret message";

        let encrypted = encrypt_bytes(&key, b"aad-1", plaintext).expect("encryption succeeds");
        let result = decrypt_bytes(&key, b"aad-2", &encrypted);

        assert!(matches!(result, Err(CryptoError::DecryptionFailed(_))));
    }

    #[test]
    fn test_invalid_key_length_rejected() {
        assert!(CryptoKey::new(vec![0u8; 16]).is_err());
        assert!(CryptoKey::new(vec![0u8; 32]).is_ok());
    }

    #[test]
    fn test_access_token_domain_binding() {
        let key = test_key();
        let token = "shpat_0123456789abcdef";

        let ciphertext = encrypt_access_token(&key, "alpha.myshopify.com", token).unwrap();
        assert!(is_encrypted_payload(&ciphertext));

        let decrypted =
            decrypt_access_token(&key, "alpha.myshopify.com", &ciphertext).unwrap();
        assert_eq!(decrypted, token);

        // Ciphertext bound to one shop must not decrypt for another
        let cross_tenant = decrypt_access_token(&key, "beta.myshopify.com", &ciphertext);
        assert!(cross_tenant.is_err());
    }

    #[test]
    fn test_legacy_plaintext_passthrough() {
        let key = test_key();
        let legacy = b"plaintext-token".to_vec();

        assert!(!is_encrypted_payload(&legacy));
        let decrypted = decrypt_access_token(&key, "alpha.myshopify.com", &legacy).unwrap();
        assert_eq!(decrypted, "plaintext-token");
    }

    #[test]
    fn test_seal_open_with_and_without_key() {
        let key_bytes = vec![7u8; 32];
        let sealed =
            seal_access_token(Some(&key_bytes), "alpha.myshopify.com", "shpat_secret").unwrap();
        assert!(is_encrypted_payload(&sealed));
        assert_eq!(
            open_access_token(Some(&key_bytes), "alpha.myshopify.com", &sealed).unwrap(),
            "shpat_secret"
        );

        let plain = seal_access_token(None, "alpha.myshopify.com", "shpat_secret").unwrap();
        assert_eq!(plain, b"shpat_secret");
        assert_eq!(
            open_access_token(None, "alpha.myshopify.com", &plain).unwrap(),
            "shpat_secret"
        );

        // Encrypted bytes without a configured key cannot be recovered
        assert!(open_access_token(None, "alpha.myshopify.com", &sealed).is_err());
    }

    #[test]
    fn test_empty_ciphertext_rejected() {
        let key = test_key();
        let result = decrypt_bytes(&key, b"aad", &[]);
        assert!(matches!(result, Err(CryptoError::EmptyCiphertext)));
    }
}
