// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/kapsel

//! Authenticated payload encryption.
//!
//! Text payloads are sealed with AES-256-GCM-SIV into a self-describing token:
//!
//! ```text
//! [4 bytes ] magic "KPSL"
//! [1 byte  ] format version (currently 1)
//! [12 bytes] nonce
//! [N bytes ] ciphertext (plaintext length + 16-byte auth tag)
//! ```
//!
//! AES-256-GCM-SIV is chosen over AES-256-GCM for its nonce-misuse
//! resistance: the nonce is randomly generated per token and travels inside
//! the token, so an accidental nonce reuse degrades gracefully instead of
//! catastrophically.
//!
//! Decryption never produces best-guess plaintext. A malformed token is
//! [`CipherError::InvalidToken`]; any bit flip in nonce, ciphertext, or tag is
//! caught by the authentication tag and reported as [`CipherError::Integrity`].

use aes_gcm_siv::aead::Aead;
use aes_gcm_siv::{Aes256GcmSiv, KeyInit, Nonce};

use crate::keys::KeyStore;

/// Token magic bytes.
pub const TOKEN_MAGIC: &[u8; 4] = b"KPSL";
/// Current token format version.
pub const TOKEN_VERSION: u8 = 1;
/// AES-GCM-SIV nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// AES-GCM-SIV authentication tag length in bytes.
pub const TAG_LEN: usize = 16;
/// Fixed token overhead: magic(4) + version(1) + nonce(12) + tag(16) = 33.
/// Total token size = 33 + plaintext length.
pub const TOKEN_OVERHEAD: usize = 4 + 1 + NONCE_LEN + TAG_LEN;

/// Errors that can occur while decrypting a token.
#[derive(Debug, PartialEq, Eq)]
pub enum CipherError {
    /// Wrong magic, unsupported version, or token too short to be valid.
    InvalidToken,
    /// Authentication failed: the token was tampered with or sealed under a
    /// different key.
    Integrity,
    /// The authenticated plaintext is not valid UTF-8.
    InvalidUtf8,
}

impl core::fmt::Display for CipherError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidToken => write!(f, "not a valid capsule token"),
            Self::Integrity => write!(f, "token failed integrity check"),
            Self::InvalidUtf8 => write!(f, "decrypted payload is not valid UTF-8"),
        }
    }
}

impl std::error::Error for CipherError {}

/// Authenticated symmetric cipher over capsule tokens.
///
/// Holds the process-wide key; construct once from the [`KeyStore`] and share.
pub struct Cipher {
    aead: Aes256GcmSiv,
}

impl Cipher {
    /// Build a cipher from loaded key material.
    pub fn new(keys: &KeyStore) -> Self {
        let aead = Aes256GcmSiv::new_from_slice(keys.cipher_key()).expect("valid key length");
        Self { aead }
    }

    /// Seal `plaintext` into a token.
    ///
    /// Each call draws a fresh random nonce, so sealing the same text twice
    /// yields different tokens.
    pub fn encrypt(&self, plaintext: &str) -> Vec<u8> {
        use rand::RngCore;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .aead
            .encrypt(nonce, plaintext.as_bytes())
            .expect("AES-GCM-SIV encrypt should not fail");

        let mut token = Vec::with_capacity(TOKEN_OVERHEAD + plaintext.len());
        token.extend_from_slice(TOKEN_MAGIC);
        token.push(TOKEN_VERSION);
        token.extend_from_slice(&nonce_bytes);
        token.extend_from_slice(&ciphertext);
        token
    }

    /// Open a token and return the plaintext.
    ///
    /// # Errors
    /// - [`CipherError::InvalidToken`] if the token is structurally invalid.
    /// - [`CipherError::Integrity`] if authentication fails.
    /// - [`CipherError::InvalidUtf8`] if the plaintext is not UTF-8.
    pub fn decrypt(&self, token: &[u8]) -> Result<String, CipherError> {
        if token.len() < TOKEN_OVERHEAD {
            return Err(CipherError::InvalidToken);
        }
        if &token[..4] != TOKEN_MAGIC {
            return Err(CipherError::InvalidToken);
        }
        if token[4] != TOKEN_VERSION {
            return Err(CipherError::InvalidToken);
        }

        let nonce = Nonce::from_slice(&token[5..5 + NONCE_LEN]);
        let ciphertext = &token[5 + NONCE_LEN..];

        let plaintext = self
            .aead
            .decrypt(nonce, ciphertext)
            .map_err(|_| CipherError::Integrity)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
    }
}
