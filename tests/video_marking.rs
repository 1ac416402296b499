// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/kapsel

//! Integration tests for the video marking workflow, driven through the
//! public [`MediaRunner`] seam so no real ffmpeg binary is needed.

use std::ffi::OsString;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kapsel_core::video::{y4m, MARKER_FRAME_INDEX};
use kapsel_core::{ExitResult, MediaRunner, VideoCodec, VideoError};

/// A flat gray 4:2:0 stream with the given number of frames.
fn gray_y4m(width: usize, height: usize, frames: usize) -> Vec<u8> {
    let mut out = format!("YUV4MPEG2 W{width} H{height} F25:1 C420\n").into_bytes();
    let frame_size = width * height * 3 / 2;
    for _ in 0..frames {
        out.extend_from_slice(b"FRAME\n");
        out.extend(std::iter::repeat(0x80).take(frame_size));
    }
    out
}

/// Scripted stand-in for ffmpeg: serves a canned stream on decode and either
/// completes or sabotages the mux.
struct ScriptedRunner {
    decoded: Vec<u8>,
    mux_succeeds: bool,
}

impl MediaRunner for ScriptedRunner {
    fn run(&self, args: &[OsString], _timeout: Duration) -> std::io::Result<ExitResult> {
        let out_path = PathBuf::from(args.last().unwrap());
        if args.iter().any(|a| a.to_string_lossy() == "yuv4mpegpipe") {
            std::fs::write(&out_path, &self.decoded)?;
            Ok(ExitResult { status: Some(0), timed_out: false, stderr: String::new() })
        } else if self.mux_succeeds {
            std::fs::write(&out_path, b"muxed video bytes")?;
            Ok(ExitResult { status: Some(0), timed_out: false, stderr: String::new() })
        } else {
            std::fs::write(&out_path, b"partial")?;
            Ok(ExitResult { status: Some(1), timed_out: false, stderr: "mux failed".into() })
        }
    }
}

fn codec(decoded: Vec<u8>, mux_succeeds: bool) -> VideoCodec {
    VideoCodec::new(
        Box::new(ScriptedRunner { decoded, mux_succeeds }),
        Duration::from_secs(5),
    )
}

fn non_output_files(dir: &Path, output: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p != output && p.file_name().unwrap() != "in.mp4")
        .collect()
}

#[test]
fn encode_produces_output_and_cleans_temporaries() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.mp4");
    std::fs::write(&input, b"container bytes").unwrap();
    let output = dir.path().join("out.mp4");

    let info = codec(gray_y4m(64, 48, 25), true)
        .encode(&input, &output, "for the future")
        .unwrap();

    assert_eq!(info.frame_count, 25);
    assert_eq!(info.header.width, 64);
    assert!(output.exists());
    assert!(
        non_output_files(dir.path(), &output).is_empty(),
        "no temporary may survive a successful encode"
    );
}

#[test]
fn mux_failure_leaves_no_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.mp4");
    std::fs::write(&input, b"container bytes").unwrap();
    let output = dir.path().join("out.mp4");

    let result = codec(gray_y4m(64, 48, 25), false).encode(&input, &output, "marker");

    assert!(matches!(result, Err(VideoError::MuxFailure { .. })));
    assert!(!output.exists(), "partial output must be deleted");
    assert!(
        non_output_files(dir.path(), &output).is_empty(),
        "no temporary may survive a failed encode"
    );
}

#[test]
fn too_few_frames_is_unsupported_media() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.mp4");
    std::fs::write(&input, b"container bytes").unwrap();
    let output = dir.path().join("out.mp4");

    let result = codec(gray_y4m(64, 48, MARKER_FRAME_INDEX), true).encode(&input, &output, "m");

    assert!(matches!(result, Err(VideoError::UnsupportedMedia(_))));
    assert!(!output.exists());
}

#[test]
fn marker_lands_on_exactly_one_frame() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("clip.y4m");
    std::fs::write(&input, gray_y4m(96, 96, 15)).unwrap();
    let marked_path = dir.path().join("marked.y4m");

    codec(Vec::new(), true)
        .mark_stream(&input, &marked_path, "hello")
        .unwrap();

    let marked = std::fs::read(&marked_path).unwrap();
    let mut reader = Cursor::new(marked.as_slice());
    let header = y4m::read_stream_header(&mut reader).unwrap();
    let mut frame = Vec::new();
    let mut touched_frames = Vec::new();
    let mut index = 0;
    while y4m::read_frame_into(&mut reader, &header, &mut frame).unwrap().is_some() {
        if frame.iter().any(|&b| b != 0x80) {
            touched_frames.push(index);
        }
        index += 1;
    }
    assert_eq!(index, 15, "frame count must be preserved");
    assert_eq!(touched_frames, vec![MARKER_FRAME_INDEX]);
}
