// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/kapsel

//! Error types for the video marking pipeline.

use core::fmt;

/// Errors that can occur while marking a video capsule.
#[derive(Debug)]
pub enum VideoError {
    /// The YUV4MPEG2 stream is malformed (bad magic, header, or truncated
    /// frame data).
    InvalidStream(String),
    /// The media cannot be processed: the input could not be decoded, uses an
    /// unsupported colorspace, or has fewer frames than the marker frame
    /// index requires.
    UnsupportedMedia(String),
    /// The external multiplexer failed: non-zero exit status or timeout.
    /// Partial output has already been removed when this is returned.
    MuxFailure {
        /// Exit code, if the process exited on its own.
        status: Option<i32>,
        /// True when the bounded timeout expired and the process was killed.
        timed_out: bool,
        /// Captured diagnostic output from the tool's error stream.
        stderr: String,
    },
    /// Reading or writing stream files failed.
    Io(std::io::Error),
}

impl fmt::Display for VideoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStream(msg) => write!(f, "invalid YUV4MPEG2 stream: {msg}"),
            Self::UnsupportedMedia(msg) => write!(f, "unsupported media: {msg}"),
            Self::MuxFailure { status, timed_out, stderr } => {
                if *timed_out {
                    write!(f, "multiplexer timed out")?;
                } else {
                    match status {
                        Some(code) => write!(f, "multiplexer exited with status {code}")?,
                        None => write!(f, "multiplexer killed by signal")?,
                    }
                }
                if !stderr.trim().is_empty() {
                    write!(f, ": {}", stderr.trim())?;
                }
                Ok(())
            }
            Self::Io(e) => write!(f, "video I/O failed: {e}"),
        }
    }
}

impl std::error::Error for VideoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for VideoError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
