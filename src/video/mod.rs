// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/kapsel

//! Video capsule marking.
//!
//! The video path composites a *visible* red text marker onto one fixed frame
//! of the stream — frame index [`MARKER_FRAME_INDEX`] — then hands the marked,
//! silent stream to an external multiplexer that re-encodes it and remuxes the
//! original audio track. Unlike the image path's invisible LSB embedding, the
//! marker is plainly watchable; the video scheme trades stealth for surviving
//! the lossy re-encode.
//!
//! Workflow of [`VideoCodec::encode`]:
//!
//! 1. external tool decodes the input container to a temporary Y4M stream;
//! 2. the stream is probed (dimensions, fps, frame count) — fewer frames than
//!    the marker index needs is `UnsupportedMedia`;
//! 3. a second temporary Y4M is written, frame-for-frame identical except for
//!    the marker on the target frame;
//! 4. the external tool muxes the marked stream with the original audio into
//!    the final output.
//!
//! Both temporaries are scoped and removed on every exit path. A mux failure
//! (non-zero exit or timeout) deletes any partially written output: when
//! `encode` returns, either a fully valid output file exists or none does.

pub mod error;
pub mod mux;
pub mod overlay;
pub mod y4m;

pub use error::VideoError;
pub use mux::{ExitResult, FfmpegRunner, MediaRunner};
pub use y4m::{StreamHeader, StreamInfo};

use std::ffi::OsString;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

/// Zero-based index of the frame that carries the visible marker (the tenth
/// frame, matching the capsule format in the wild).
pub const MARKER_FRAME_INDEX: usize = 9;

/// Frame-marking codec over an external demux/remux tool.
pub struct VideoCodec {
    runner: Box<dyn MediaRunner>,
    timeout: Duration,
}

impl VideoCodec {
    /// Build a codec over an arbitrary [`MediaRunner`] (tests pass a fake).
    pub fn new(runner: Box<dyn MediaRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Build a codec over a real ffmpeg binary.
    pub fn with_ffmpeg(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self::new(Box::new(FfmpegRunner::new(binary.into())), timeout)
    }

    /// Mark `input` with `marker_text` and write the remuxed result to
    /// `output`.
    ///
    /// # Errors
    /// - [`VideoError::UnsupportedMedia`] if the input cannot be decoded or
    ///   has no frame at [`MARKER_FRAME_INDEX`].
    /// - [`VideoError::InvalidStream`] if the decoded Y4M is malformed.
    /// - [`VideoError::MuxFailure`] if the multiplexer fails or times out; no
    ///   output file exists afterwards.
    pub fn encode(&self, input: &Path, output: &Path, marker_text: &str) -> Result<StreamInfo, VideoError> {
        let work_dir = scratch_dir(output);

        let decoded = tempfile::Builder::new()
            .prefix("kapsel-decode-")
            .suffix(".y4m")
            .tempfile_in(work_dir)?;
        let result = self.runner.run(&decode_args(input, decoded.path()), self.timeout)?;
        if !result.success() {
            return Err(VideoError::UnsupportedMedia(format!(
                "{} could not be decoded ({}): {}",
                input.display(),
                result.describe(),
                result.stderr.trim()
            )));
        }

        let marked = tempfile::Builder::new()
            .prefix("kapsel-marked-")
            .suffix(".y4m")
            .tempfile_in(work_dir)?;
        let info = self.mark_stream(decoded.path(), marked.path(), marker_text)?;
        drop(decoded);

        let result = self.runner.run(&mux_args(marked.path(), input, output), self.timeout)?;
        if !result.success() {
            // The multiplexer may have left a half-written file behind; the
            // filesystem must never observe a partial result.
            if output.exists() {
                if let Err(e) = std::fs::remove_file(output) {
                    warn!("failed to remove partial output {}: {e}", output.display());
                }
            }
            return Err(VideoError::MuxFailure {
                status: result.status,
                timed_out: result.timed_out,
                stderr: result.stderr,
            });
        }

        info!(
            "video capsule encoded: {} frames at {:.2} fps -> {}",
            info.frame_count,
            info.header.fps(),
            output.display()
        );
        Ok(info)
    }

    /// Pure-Rust marking pass: probe `input` and rewrite it to `output` with
    /// the marker composited onto frame [`MARKER_FRAME_INDEX`].
    ///
    /// Exposed separately so the frame work can be exercised without any
    /// external tool.
    pub fn mark_stream(&self, input: &Path, output: &Path, marker_text: &str) -> Result<StreamInfo, VideoError> {
        let info = y4m::probe(input)?;
        if info.frame_count <= MARKER_FRAME_INDEX {
            return Err(VideoError::UnsupportedMedia(format!(
                "stream has {} frames but the marker needs frame {}",
                info.frame_count,
                MARKER_FRAME_INDEX + 1
            )));
        }
        debug!(
            "marking {}x{} stream, {} frames",
            info.header.width, info.header.height, info.frame_count
        );

        let mut reader = BufReader::new(std::fs::File::open(input)?);
        let header = y4m::read_stream_header(&mut reader)?;

        let mut writer = BufWriter::new(std::fs::File::create(output)?);
        y4m::write_stream_header(&mut writer, &header)?;

        let mut frame = Vec::new();
        let mut index = 0usize;
        while let Some(params) = y4m::read_frame_into(&mut reader, &header, &mut frame)? {
            if index == MARKER_FRAME_INDEX {
                overlay::draw_marker(&mut frame, &header, marker_text);
            }
            y4m::write_frame(&mut writer, &params, &frame)?;
            index += 1;
        }

        use std::io::Write;
        writer.flush()?;
        Ok(info)
    }
}

/// Directory for scoped temporaries: next to the output, so the final rename
/// distance stays short and cleanup tests can watch one place.
fn scratch_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Argument template for decoding any input container to silent Y4M.
fn decode_args(input: &Path, y4m_out: &Path) -> Vec<OsString> {
    vec![
        OsString::from("-y"),
        OsString::from("-i"),
        input.as_os_str().to_os_string(),
        OsString::from("-f"),
        OsString::from("yuv4mpegpipe"),
        OsString::from("-pix_fmt"),
        OsString::from("yuv420p"),
        OsString::from("-an"),
        y4m_out.as_os_str().to_os_string(),
    ]
}

/// Fixed argument template for the final remux: marked silent stream in,
/// original media in for its audio track (if any), output path out.
fn mux_args(marked: &Path, original: &Path, output: &Path) -> Vec<OsString> {
    vec![
        OsString::from("-y"),
        OsString::from("-i"),
        marked.as_os_str().to_os_string(),
        OsString::from("-i"),
        original.as_os_str().to_os_string(),
        OsString::from("-c:v"),
        OsString::from("libx264"),
        OsString::from("-c:a"),
        OsString::from("aac"),
        OsString::from("-map"),
        OsString::from("0:v:0"),
        OsString::from("-map"),
        OsString::from("1:a:0?"),
        OsString::from("-movflags"),
        OsString::from("+faststart"),
        output.as_os_str().to_os_string(),
    ]
}
