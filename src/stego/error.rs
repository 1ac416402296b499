// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/kapsel

//! Error types for the image steganography pipeline.

use core::fmt;
use std::path::PathBuf;

/// Errors that can occur during LSB embedding or extraction.
#[derive(Debug)]
pub enum StegoError {
    /// The carrier could not be decoded as an image.
    InvalidCarrier(image::ImageError),
    /// The requested output format is lossy and would destroy LSB data.
    LossyOutput(PathBuf),
    /// Embedding would overwrite the source carrier in place.
    InPlaceOutput(PathBuf),
    /// Length prefix plus payload exceed the carrier's bit capacity.
    CapacityExceeded {
        /// Bytes the encoding needs (prefix + payload).
        needed: usize,
        /// Bytes the carrier can hold.
        capacity: usize,
    },
    /// Reading or writing a carrier file failed.
    Io(std::io::Error),
}

impl fmt::Display for StegoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCarrier(e) => write!(f, "invalid carrier image: {e}"),
            Self::LossyOutput(p) => {
                write!(f, "lossy output target {} would destroy hidden data", p.display())
            }
            Self::InPlaceOutput(p) => {
                write!(f, "output {} would overwrite the source carrier", p.display())
            }
            Self::CapacityExceeded { needed, capacity } => {
                write!(f, "payload needs {needed} bytes but carrier holds {capacity}")
            }
            Self::Io(e) => write!(f, "carrier I/O failed: {e}"),
        }
    }
}

impl std::error::Error for StegoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidCarrier(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for StegoError {
    fn from(e: image::ImageError) -> Self {
        Self::InvalidCarrier(e)
    }
}

impl From<std::io::Error> for StegoError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
