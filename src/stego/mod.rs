// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/kapsel

//! Invisible LSB steganography for image carriers.
//!
//! The payload (an encrypted capsule token) is written into the
//! least-significant bit of successive RGB channel bytes in raster order,
//! behind a fixed-width big-endian length prefix:
//!
//! ```text
//! capacity(bits)  = width * height * 3
//! capacity(bytes) = capacity(bits) / 8 - 4 (length prefix)
//! ```
//!
//! Embedding always produces a new PNG — LSB planes only survive lossless
//! encodings. Extraction that finds nothing plausible returns `None`, a valid
//! outcome distinct from a decoding failure.

pub mod error;
pub mod image;
pub mod lsb;

pub use error::StegoError;
pub use image::ImageCodec;
pub use lsb::{payload_capacity, LEN_PREFIX_BYTES};
