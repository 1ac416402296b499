// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/kapsel

//! # kapsel-core
//!
//! Time-locked capsule engine. A capsule pairs a carrier image containing a
//! hidden encrypted message with a future unlock date; the payload is released
//! only once that date has passed.
//!
//! The pipeline:
//!
//! - **upload**: encrypt the text (AES-256-GCM-SIV), embed the token into the
//!   least-significant bits of a lossless carrier image (`stego` module),
//!   persist the capsule record. The record is written only after the hidden
//!   carrier exists on disk; a persistence failure removes the carrier again.
//! - **open**: look up the record, evaluate the lock state against the clock
//!   (never stored, always derived), extract and decrypt only when unlocked.
//!
//! Video carriers get a weaker, *visible* treatment (`video` module): a text
//! marker is composited onto one fixed frame of a YUV4MPEG2 stream and the
//! original audio is remuxed back in by an external multiplexer.
//!
//! All processing is synchronous and blocking; every type is safe to drive
//! from a worker thread. The only process-wide state is the immutable key
//! material ([`KeyStore`]) and the store handle.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use kapsel_core::{CapsuleConfig, CapsuleService, OpenOutcome};
//!
//! let config = CapsuleConfig::new("/var/lib/kapsel");
//! let service = CapsuleService::new(&config).unwrap();
//!
//! let receipt = service.upload("see you in 2030", "photo.png".as_ref(), "2030-01-01").unwrap();
//! match service.open(&receipt.hidden_path).unwrap() {
//!     OpenOutcome::Locked { future_date } => println!("locked until {future_date}"),
//!     OpenOutcome::Revealed { text } => println!("{text}"),
//! }
//! ```

pub mod cipher;
pub mod config;
pub mod keys;
pub mod service;
pub mod stego;
pub mod store;
pub mod video;

pub use cipher::{Cipher, CipherError};
pub use config::CapsuleConfig;
pub use keys::{KeyError, KeyStore};
pub use service::{CapsuleService, OpenOutcome, ServiceError, UploadReceipt};
pub use stego::{ImageCodec, StegoError};
pub use store::{Capsule, CapsuleStore, LockState, StoreError};
pub use video::{ExitResult, FfmpegRunner, MediaRunner, VideoCodec, VideoError};
