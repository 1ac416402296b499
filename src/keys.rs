// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/kapsel

//! Process-wide key material.
//!
//! The secret is read from a key file exactly once, at startup; a missing file
//! is a fatal, typed error so the process refuses to start rather than running
//! with no key. The file may hold a secret of any length — the 256-bit cipher
//! key is derived from it with Argon2id and a fixed domain salt, so both sides
//! of a capsule's lifetime (possibly different process runs) derive the same
//! key from the same file.
//!
//! Key bytes live in [`Zeroizing`] buffers and are wiped on drop. They are
//! never logged and never written next to capsule data.

use argon2::Argon2;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Fixed salt for cipher key derivation.
/// Intentionally constant: the same key file must yield the same AES key
/// across process restarts, or previously sealed capsules become unreadable.
const CIPHER_SALT: &[u8; 16] = b"kapsel-cipher-v1";

/// Errors raised while loading key material.
#[derive(Debug)]
pub enum KeyError {
    /// The key file does not exist.
    Missing(PathBuf),
    /// The key file exists but is empty.
    Empty(PathBuf),
    /// The key file could not be read.
    Io(std::io::Error),
}

impl core::fmt::Display for KeyError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Missing(p) => write!(f, "key file {} is missing", p.display()),
            Self::Empty(p) => write!(f, "key file {} is empty", p.display()),
            Self::Io(e) => write!(f, "key file unreadable: {e}"),
        }
    }
}

impl std::error::Error for KeyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KeyError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Immutable key material, loaded once at startup.
pub struct KeyStore {
    cipher_key: Zeroizing<[u8; 32]>,
}

impl KeyStore {
    /// Load the secret from `path` and derive the cipher key.
    ///
    /// # Errors
    /// - [`KeyError::Missing`] if the file does not exist.
    /// - [`KeyError::Empty`] if the file holds zero bytes.
    /// - [`KeyError::Io`] if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self, KeyError> {
        if !path.exists() {
            return Err(KeyError::Missing(path.to_path_buf()));
        }
        let secret = Zeroizing::new(std::fs::read(path)?);
        if secret.is_empty() {
            return Err(KeyError::Empty(path.to_path_buf()));
        }
        Ok(Self::from_secret(&secret))
    }

    /// Derive a key store directly from secret bytes.
    ///
    /// Useful when the secret arrives from somewhere other than a file
    /// (tests, embedding applications).
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut key = Zeroizing::new([0u8; 32]);
        Argon2::default()
            .hash_password_into(secret, CIPHER_SALT, &mut *key)
            .expect("Argon2 cipher key derivation should not fail");
        Self { cipher_key: key }
    }

    /// The derived 256-bit cipher key.
    pub fn cipher_key(&self) -> &[u8; 32] {
        &self.cipher_key
    }
}

// Deliberately no Debug derive: key material must not leak through logs.
impl core::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("KeyStore(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_deterministic() {
        let a = KeyStore::from_secret(b"some secret bytes");
        let b = KeyStore::from_secret(b"some secret bytes");
        assert_eq!(a.cipher_key(), b.cipher_key());
    }

    #[test]
    fn derivation_differs_by_secret() {
        let a = KeyStore::from_secret(b"secret one");
        let b = KeyStore::from_secret(b"secret two");
        assert_ne!(a.cipher_key(), b.cipher_key());
    }

    #[test]
    fn missing_file_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let result = KeyStore::load(&dir.path().join("no-such.key"));
        assert!(matches!(result, Err(KeyError::Missing(_))));
    }

    #[test]
    fn empty_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");
        std::fs::write(&path, b"").unwrap();
        assert!(matches!(KeyStore::load(&path), Err(KeyError::Empty(_))));
    }

    #[test]
    fn file_and_direct_derivation_agree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");
        std::fs::write(&path, b"hunter2").unwrap();
        let from_file = KeyStore::load(&path).unwrap();
        let direct = KeyStore::from_secret(b"hunter2");
        assert_eq!(from_file.cipher_key(), direct.cipher_key());
    }

    #[test]
    fn debug_does_not_leak_key() {
        let ks = KeyStore::from_secret(b"top secret");
        let rendered = format!("{ks:?}");
        assert_eq!(rendered, "KeyStore(..)");
    }
}
