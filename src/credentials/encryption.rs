//! AES-256-GCM encryption for credential tokens.
//!
//! Each token is encrypted separately with a unique nonce for maximum security.
//! The master key must be 32 bytes (256 bits) and is provided from an environment variable.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Size of the encryption key in bytes (256 bits)
const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits, standard for GCM)
const NONCE_SIZE: usize = 12;

/// Validates that the master key is exactly 32 bytes when base64 decoded.
///
/// # Arguments
/// * `key_base64` - Base64-encoded master key
///
/// # Returns
/// * `Ok(Vec<u8>)` - Decoded key bytes (32 bytes)
/// * `Err` - If key is invalid length or invalid base64
pub fn validate_key(key_base64: &str) -> Result<Vec<u8>> {
    let key_bytes = BASE64
        .decode(key_base64)
        .context("Failed to decode base64 encryption key")?;

    if key_bytes.len() != KEY_SIZE {
        return Err(anyhow!(
            "Encryption key must be {} bytes (256 bits), got {} bytes",
            KEY_SIZE,
            key_bytes.len()
        ));
    }

    Ok(key_bytes)
}

/// Encrypts plaintext using AES-256-GCM with a random nonce.
///
/// # Arguments
/// * `plaintext` - Data to encrypt (e.g., access token)
/// * `key` - 32-byte encryption key
///
/// # Returns
/// * `Ok((ciphertext, nonce))` - Encrypted data and the nonce used (both base64-encoded)
/// * `Err` - If encryption fails
///
/// # Security
/// - Uses a cryptographically secure random nonce (never reuse)
/// - Authenticated encryption (tampering detected)
/// - Key must be kept secret and never stored on disk
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<(String, String)> {
    if key.len() != KEY_SIZE {
        return Err(anyhow!("Encryption key must be {} bytes", KEY_SIZE));
    }

    // Create cipher instance
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| anyhow!("Failed to create cipher: {}", e))?;

    // Generate random nonce (never reuse!)
    let nonce_bytes = Aes256Gcm::generate_nonce(&mut OsRng);

    // Encrypt
    let ciphertext_bytes = cipher
        .encrypt(&nonce_bytes, plaintext.as_bytes())
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    // Encode to base64 for storage
    let ciphertext = BASE64.encode(&ciphertext_bytes);
    let nonce = BASE64.encode(&nonce_bytes);

    Ok((ciphertext, nonce))
}

/// Decrypts ciphertext using AES-256-GCM.
///
/// # Arguments
/// * `ciphertext` - Base64-encoded encrypted data
/// * `nonce` - Base64-encoded nonce (must match the one used during encryption)
/// * `key` - 32-byte encryption key (must match the one used during encryption)
///
/// # Returns
/// * `Ok(String)` - Decrypted plaintext
/// * `Err` - If decryption fails (wrong key, corrupted data, or tampered)
pub fn decrypt(ciphertext: &str, nonce: &str, key: &[u8]) -> Result<String> {
    if key.len() != KEY_SIZE {
        return Err(anyhow!("Encryption key must be {} bytes", KEY_SIZE));
    }

    // Decode from base64
    let ciphertext_bytes = BASE64
        .decode(ciphertext)
        .context("Failed to decode ciphertext")?;
    let nonce_bytes = BASE64.decode(nonce).context("Failed to decode nonce")?;

    if nonce_bytes.len() != NONCE_SIZE {
        return Err(anyhow!("Invalid nonce size: expected {}, got {}", NONCE_SIZE, nonce_bytes.len()));
    }

    // Create cipher instance
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| anyhow!("Failed to create cipher: {}", e))?;

    let nonce = Nonce::from_slice(&nonce_bytes);

    // Decrypt
    let plaintext_bytes = cipher
        .decrypt(nonce, ciphertext_bytes.as_ref())
        .map_err(|e| anyhow!("Decryption failed (wrong key or corrupted data): {}", e))?;

    // Convert to string
    String::from_utf8(plaintext_bytes).context("Decrypted data is not valid UTF-8")
}
