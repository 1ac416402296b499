// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/kapsel

//! Capsule upload and open orchestration.
//!
//! Upload is one logical atomic unit: validate, encrypt, embed, persist —
//! persist strictly last. A failure while encrypting or embedding aborts
//! before the store is touched, so no record ever points at a missing
//! carrier; a failure while persisting removes the freshly written carrier,
//! so no carrier outlives its missing record.
//!
//! Open never mutates anything: find the record, evaluate the lock state
//! against the clock, and only then extract and decrypt. A locked capsule is
//! a normal outcome, not an error, and short-circuits before any extraction
//! work.
//!
//! Hidden carriers get generated, collision-resistant names — caller-supplied
//! filenames are never trusted as identities — which also means concurrent
//! uploads cannot contend on an output path.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use rand::RngCore;
use tracing::{debug, info, warn};

use crate::cipher::{Cipher, CipherError};
use crate::config::CapsuleConfig;
use crate::keys::{KeyError, KeyStore};
use crate::stego::{ImageCodec, StegoError};
use crate::store::{CapsuleStore, LockState, StoreError};
use crate::video::{StreamInfo, VideoCodec, VideoError};

/// Expected unlock date format.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Successful upload: where the hidden carrier lives and when it unlocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub hidden_path: String,
    pub future_date: NaiveDate,
}

/// Outcome of opening a capsule. Locked is not an error — it is the
/// expected answer until the unlock date passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Locked { future_date: NaiveDate },
    Revealed { text: String },
}

/// Errors raised by the capsule service.
#[derive(Debug)]
pub enum ServiceError {
    /// Missing or malformed input (empty text, absent carrier, bad date,
    /// date not strictly in the future).
    Validation(String),
    /// No capsule is stored under this carrier path.
    NotFound(String),
    /// The carrier holds no hidden message.
    NoHiddenMessage,
    /// The hidden token failed its integrity check.
    DecryptionFailed,
    /// Key material could not be loaded at startup.
    Key(KeyError),
    /// Embedding or extraction failed.
    Stego(StegoError),
    /// Video marking or remuxing failed.
    Video(VideoError),
    /// The record store failed.
    Store(StoreError),
    /// Filesystem work outside the codecs failed.
    Io(std::io::Error),
}

impl core::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "invalid request: {msg}"),
            Self::NotFound(path) => write!(f, "no capsule found for {path}"),
            Self::NoHiddenMessage => write!(f, "no hidden message found in carrier"),
            Self::DecryptionFailed => write!(f, "hidden message failed to decrypt"),
            Self::Key(e) => write!(f, "{e}"),
            Self::Stego(e) => write!(f, "{e}"),
            Self::Video(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Key(e) => Some(e),
            Self::Stego(e) => Some(e),
            Self::Video(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<KeyError> for ServiceError {
    fn from(e: KeyError) -> Self {
        Self::Key(e)
    }
}

impl From<StegoError> for ServiceError {
    fn from(e: StegoError) -> Self {
        Self::Stego(e)
    }
}

impl From<VideoError> for ServiceError {
    fn from(e: VideoError) -> Self {
        Self::Video(e)
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Orchestrates the capsule lifecycle over cipher, image codec, and store.
pub struct CapsuleService {
    cipher: Cipher,
    codec: ImageCodec,
    video: VideoCodec,
    store: CapsuleStore,
    data_dir: PathBuf,
}

impl CapsuleService {
    /// Wire up a service from configuration. Fails fast when the key file is
    /// missing or the store cannot be opened.
    pub fn new(config: &CapsuleConfig) -> Result<Self, ServiceError> {
        let keys = KeyStore::load(&config.key_path)?;
        let store = CapsuleStore::open(&config.store_path)?;
        std::fs::create_dir_all(&config.data_dir)?;
        Ok(Self {
            cipher: Cipher::new(&keys),
            codec: ImageCodec::new(),
            video: VideoCodec::with_ffmpeg(config.ffmpeg_bin.clone(), config.mux_timeout),
            store,
            data_dir: config.data_dir.clone(),
        })
    }

    /// Seal `text` into a copy of `carrier` and persist the capsule.
    ///
    /// Step order is load-bearing: encrypt, embed, persist. The store is only
    /// touched once the hidden carrier exists, and the carrier is removed
    /// again if persisting fails.
    pub fn upload(
        &self,
        text: &str,
        carrier: &Path,
        future_date: &str,
    ) -> Result<UploadReceipt, ServiceError> {
        if text.is_empty() {
            return Err(ServiceError::Validation("text must not be empty".into()));
        }
        if !carrier.exists() {
            return Err(ServiceError::Validation(format!(
                "carrier file {} does not exist",
                carrier.display()
            )));
        }
        let future_date = NaiveDate::parse_from_str(future_date, DATE_FORMAT).map_err(|_| {
            ServiceError::Validation(format!("invalid date {future_date:?}, expected YYYY-MM-DD"))
        })?;
        if future_date <= Utc::now().date_naive() {
            return Err(ServiceError::Validation(format!(
                "unlock date {future_date} must be in the future"
            )));
        }

        let token = self.cipher.encrypt(text);
        debug!("sealed {} bytes of text into a {} byte token", text.len(), token.len());

        let hidden_path = self.data_dir.join(generated_carrier_name());
        self.codec.embed(carrier, &token, &hidden_path)?;

        let hidden = hidden_path.to_string_lossy().into_owned();
        match self.store.create(&hidden, future_date) {
            Ok(_) => {
                info!("capsule uploaded: {hidden} unlocks {future_date}");
                Ok(UploadReceipt { hidden_path: hidden, future_date })
            }
            Err(e) => {
                // The record never made it to disk; the carrier must not
                // outlive it.
                if let Err(cleanup) = std::fs::remove_file(&hidden_path) {
                    warn!("failed to remove orphaned carrier {hidden}: {cleanup}");
                }
                Err(e.into())
            }
        }
    }

    /// Open the capsule stored under `image_path`.
    ///
    /// Locked capsules return [`OpenOutcome::Locked`] without any extraction
    /// attempt; the payload is revealed only when every step succeeds.
    pub fn open(&self, image_path: &str) -> Result<OpenOutcome, ServiceError> {
        let capsule = self
            .store
            .find(image_path)
            .ok_or_else(|| ServiceError::NotFound(image_path.to_string()))?;

        if capsule.lock_state(Utc::now()) == LockState::Locked {
            debug!("capsule {image_path} still locked until {}", capsule.future_date);
            return Ok(OpenOutcome::Locked { future_date: capsule.future_date });
        }

        let token = self
            .codec
            .extract(Path::new(image_path))?
            .ok_or(ServiceError::NoHiddenMessage)?;

        let text = self.cipher.decrypt(&token).map_err(|e| match e {
            // A structurally invalid blob means the carrier held no real
            // token; tampering and key mismatch are integrity failures.
            CipherError::InvalidToken => ServiceError::NoHiddenMessage,
            CipherError::Integrity | CipherError::InvalidUtf8 => ServiceError::DecryptionFailed,
        })?;

        info!("capsule opened: {image_path}");
        Ok(OpenOutcome::Revealed { text })
    }

    /// Mark `input` with a visible `marker_text` on its target frame and
    /// remux the original audio into `output`.
    ///
    /// Video carriers are not time-locked records; the marker is plainly
    /// visible, so there is nothing to persist or release later. The codec's
    /// all-or-nothing output contract applies.
    pub fn mark_video(
        &self,
        input: &Path,
        output: &Path,
        marker_text: &str,
    ) -> Result<StreamInfo, ServiceError> {
        Ok(self.video.encode(input, output, marker_text)?)
    }
}

/// Collision-resistant hidden-carrier filename: 64 random bits, hex-encoded.
fn generated_carrier_name() -> String {
    let mut id = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut id);
    format!("capsule_{}.png", hex::encode(id))
}
