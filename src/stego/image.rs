// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/kapsel

//! Carrier image embedding and extraction.
//!
//! Carriers are decoded through the `image` crate (any supported input
//! format), flattened to 8-bit RGB, and the payload is written into the
//! least-significant bit of successive color-channel bytes in raster order —
//! see [`crate::stego::lsb`] for the exact bit layout. The alpha channel is
//! excluded so the payload survives alpha-premultiplying pipelines.
//!
//! Output is always PNG. LSB data does not survive lossy re-encoding, so any
//! other output extension is rejected rather than silently corrupted. The
//! source carrier is never modified; embedding writes a new file.

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::debug;

use crate::stego::error::StegoError;
use crate::stego::lsb;

/// LSB codec over lossless carrier images.
#[derive(Debug, Default)]
pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        Self
    }

    /// Payload capacity of `carrier` in bytes (length prefix already
    /// subtracted): `width * height * 3 / 8 - 4`.
    pub fn capacity(&self, carrier: &Path) -> Result<usize, StegoError> {
        let img = image::open(carrier)?.to_rgb8();
        Ok(lsb::payload_capacity(img.as_raw().len()))
    }

    /// Embed `payload` into a copy of `carrier`, written to `output` as PNG.
    ///
    /// # Errors
    /// - [`StegoError::InvalidCarrier`] if the carrier cannot be decoded.
    /// - [`StegoError::LossyOutput`] if `output` is not a `.png` target.
    /// - [`StegoError::InPlaceOutput`] if `output` names the source carrier.
    /// - [`StegoError::CapacityExceeded`] if the payload does not fit.
    pub fn embed(&self, carrier: &Path, payload: &[u8], output: &Path) -> Result<PathBuf, StegoError> {
        if !is_png(output) {
            return Err(StegoError::LossyOutput(output.to_path_buf()));
        }
        if output == carrier {
            return Err(StegoError::InPlaceOutput(output.to_path_buf()));
        }

        let img = image::open(carrier)?.to_rgb8();
        let (width, height) = img.dimensions();
        let mut channels = img.into_raw();

        lsb::embed_bytes(&mut channels, payload)?;
        debug!(
            "embedded {} payload bytes into {}x{} carrier",
            payload.len(),
            width,
            height
        );

        let stego = RgbImage::from_raw(width, height, channels)
            .expect("raw buffer length matches dimensions");
        stego.save(output)?;
        Ok(output.to_path_buf())
    }

    /// Extract a payload from `carrier`.
    ///
    /// Returns `Ok(None)` when the image carries no plausibly hidden payload;
    /// only undecodable or unreadable carriers are errors.
    pub fn extract(&self, carrier: &Path) -> Result<Option<Vec<u8>>, StegoError> {
        let img = image::open(carrier)?.to_rgb8();
        Ok(lsb::extract_bytes(img.as_raw()))
    }
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}
