// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/kapsel

//! Startup configuration.
//!
//! One immutable value, constructed at startup and passed into the
//! components that need it. There is no hidden global state: the key path
//! feeds the [`crate::KeyStore`], the data directory receives hidden
//! carriers, the store path backs the [`crate::CapsuleStore`].

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a capsule service instance.
#[derive(Debug, Clone)]
pub struct CapsuleConfig {
    /// File holding the process-wide secret. Refusing to start without it is
    /// the key store's job.
    pub key_path: PathBuf,
    /// Directory where hidden carriers are written.
    pub data_dir: PathBuf,
    /// JSON file backing the capsule store.
    pub store_path: PathBuf,
    /// External multiplexer binary.
    pub ffmpeg_bin: PathBuf,
    /// Bound on every external tool invocation.
    pub mux_timeout: Duration,
}

impl CapsuleConfig {
    /// Conventional layout under a single root directory:
    /// `<root>/secret.key`, `<root>/uploads/`, `<root>/capsules.json`,
    /// `ffmpeg` from `PATH`, 60 second tool bound.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            key_path: root.join("secret.key"),
            data_dir: root.join("uploads"),
            store_path: root.join("capsules.json"),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            mux_timeout: Duration::from_secs(60),
        }
    }
}
