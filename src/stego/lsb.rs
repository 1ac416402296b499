// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/kapsel

//! Bit-level LSB encoding.
//!
//! The on-carrier layout is a fixed-width length prefix followed by the
//! payload, one bit per color-channel byte in raster order:
//!
//! ```text
//! [32 bits] payload length in bytes (big-endian u32)
//! [N*8 bits] payload bytes, MSB first within each byte
//! ```
//!
//! Capacity in bits is simply the number of channel bytes; capacity in bytes
//! divides by 8. Payloads that would not fit are rejected whole — never
//! truncated. Extraction is deterministic: the same channel bytes always
//! yield the same payload.

use crate::stego::error::StegoError;

/// Width of the length prefix in bytes.
pub const LEN_PREFIX_BYTES: usize = 4;
/// Width of the length prefix in bits.
pub const LEN_PREFIX_BITS: usize = LEN_PREFIX_BYTES * 8;

/// Payload capacity in bytes for a channel buffer of `channel_count` bytes,
/// after subtracting the length prefix.
pub fn payload_capacity(channel_count: usize) -> usize {
    (channel_count / 8).saturating_sub(LEN_PREFIX_BYTES)
}

/// Write `payload` (prefixed with its length) into the LSBs of `channels`.
///
/// # Errors
/// [`StegoError::CapacityExceeded`] if prefix + payload bits exceed
/// `channels.len()`. The buffer is untouched on failure.
pub fn embed_bytes(channels: &mut [u8], payload: &[u8]) -> Result<(), StegoError> {
    let needed_bits = LEN_PREFIX_BITS + payload.len() * 8;
    if needed_bits > channels.len() {
        return Err(StegoError::CapacityExceeded {
            needed: LEN_PREFIX_BYTES + payload.len(),
            capacity: channels.len() / 8,
        });
    }

    let prefix = (payload.len() as u32).to_be_bytes();
    let mut bits = bytes_to_bits(&prefix);
    bits.extend(bytes_to_bits(payload));

    for (channel, bit) in channels.iter_mut().zip(bits) {
        *channel = (*channel & !1) | bit;
    }
    Ok(())
}

/// Read a length-prefixed payload back out of the LSBs of `channels`.
///
/// Returns `None` when the prefix implies a length exceeding the remaining
/// capacity — including the case of an image that was never a carrier, whose
/// noise LSBs almost surely encode an impossible length. Absence is a valid
/// outcome, not an error.
pub fn extract_bytes(channels: &[u8]) -> Option<Vec<u8>> {
    if channels.len() < LEN_PREFIX_BITS {
        return None;
    }

    let prefix_bits: Vec<u8> = channels[..LEN_PREFIX_BITS].iter().map(|b| b & 1).collect();
    let prefix = bits_to_bytes(&prefix_bits);
    let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;

    let remaining = (channels.len() - LEN_PREFIX_BITS) / 8;
    if len > remaining {
        return None;
    }

    let payload_bits: Vec<u8> = channels[LEN_PREFIX_BITS..LEN_PREFIX_BITS + len * 8]
        .iter()
        .map(|b| b & 1)
        .collect();
    Some(bits_to_bytes(&payload_bits))
}

/// Convert bytes to a bit vector (MSB first within each byte).
fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for bit_pos in (0..8).rev() {
            bits.push((byte >> bit_pos) & 1);
        }
    }
    bits
}

/// Convert a bit vector (MSB first) back to bytes. Must be a whole number of
/// bytes — callers only slice in multiples of 8.
fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(bits.len() / 8);
    for chunk in bits.chunks_exact(8) {
        let mut byte = 0u8;
        for (i, &bit) in chunk.iter().enumerate() {
            byte |= (bit & 1) << (7 - i);
        }
        bytes.push(byte);
    }
    bytes
}
