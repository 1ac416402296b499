// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/kapsel

//! Minimal YUV4MPEG2 (Y4M) stream codec (std only).
//!
//! Y4M is the uncompressed YCbCr interchange format the external tooling
//! speaks on its way in and out of the marking pass. The format is a single
//! text header line followed by frames, each a `FRAME` line plus raw planes:
//!
//! ```text
//! YUV4MPEG2 W<width> H<height> F<num>:<den> [I..] [A..] [C<colorspace>] [X..]\n
//! FRAME[ <params>]\n
//! <Y plane><Cb plane><Cr plane>
//! ...
//! ```
//!
//! Supports 4:2:0 (all chroma-siting subvariants share one plane layout),
//! 4:2:2, and 4:4:4. Everything else — mono, 16-bit depths, alpha — is
//! rejected at parse time. Header tokens we do not interpret are preserved
//! verbatim so a rewritten stream stays faithful to its source.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use crate::video::error::VideoError;

/// Upper bound on a header or FRAME line; anything longer is not a Y4M file.
const MAX_LINE_LEN: usize = 2048;

/// Chroma subsampling layout of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colorspace {
    /// 4:2:0 — chroma halved in both directions.
    C420,
    /// 4:2:2 — chroma halved horizontally.
    C422,
    /// 4:4:4 — full-resolution chroma.
    C444,
}

impl Colorspace {
    /// Chroma plane dimensions for a `width`×`height` frame.
    pub fn chroma_dims(&self, width: usize, height: usize) -> (usize, usize) {
        match self {
            Self::C420 => ((width + 1) / 2, (height + 1) / 2),
            Self::C422 => ((width + 1) / 2, height),
            Self::C444 => (width, height),
        }
    }

    /// Right-shift amounts mapping luma coordinates to chroma coordinates.
    pub fn chroma_shift(&self) -> (usize, usize) {
        match self {
            Self::C420 => (1, 1),
            Self::C422 => (1, 0),
            Self::C444 => (0, 0),
        }
    }
}

/// Parsed Y4M stream header.
#[derive(Debug, Clone)]
pub struct StreamHeader {
    pub width: usize,
    pub height: usize,
    pub fps_num: u32,
    pub fps_den: u32,
    pub colorspace: Colorspace,
    /// The raw `C` token as it appeared (e.g. `C420mpeg2`), or `None` if the
    /// stream relied on the 4:2:0 default. Preserved on rewrite.
    colorspace_tag: Option<String>,
    /// Uninterpreted header tokens (`I..`, `A..`, `X..`), preserved in order.
    extra: Vec<String>,
}

impl StreamHeader {
    /// Frames per second as a float, for diagnostics.
    pub fn fps(&self) -> f64 {
        self.fps_num as f64 / self.fps_den as f64
    }

    /// Total byte size of one frame's plane data.
    pub fn frame_size(&self) -> usize {
        let (cw, ch) = self.colorspace.chroma_dims(self.width, self.height);
        self.width * self.height + 2 * cw * ch
    }

    /// Byte offset of the Cb plane within a frame buffer.
    pub fn cb_offset(&self) -> usize {
        self.width * self.height
    }

    /// Byte offset of the Cr plane within a frame buffer.
    pub fn cr_offset(&self) -> usize {
        let (cw, ch) = self.colorspace.chroma_dims(self.width, self.height);
        self.width * self.height + cw * ch
    }
}

/// Header plus frame count, as produced by [`probe`].
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub header: StreamHeader,
    pub frame_count: usize,
}

/// Read one `\n`-terminated line, bounded by [`MAX_LINE_LEN`].
///
/// Returns `None` on clean EOF (zero bytes read).
fn read_line(reader: &mut impl BufRead) -> Result<Option<String>, VideoError> {
    let mut raw = Vec::new();
    let n = reader
        .by_ref()
        .take(MAX_LINE_LEN as u64)
        .read_until(b'\n', &mut raw)?;
    if n == 0 {
        return Ok(None);
    }
    if raw.last() != Some(&b'\n') {
        return Err(VideoError::InvalidStream("unterminated header line".into()));
    }
    raw.pop();
    String::from_utf8(raw)
        .map(Some)
        .map_err(|_| VideoError::InvalidStream("header is not ASCII".into()))
}

/// Parse the stream header line.
pub fn read_stream_header(reader: &mut impl BufRead) -> Result<StreamHeader, VideoError> {
    let line = read_line(reader)?
        .ok_or_else(|| VideoError::InvalidStream("empty stream".into()))?;

    let mut tokens = line.split(' ');
    if tokens.next() != Some("YUV4MPEG2") {
        return Err(VideoError::InvalidStream("missing YUV4MPEG2 magic".into()));
    }

    let mut width = None;
    let mut height = None;
    let mut fps = None;
    let mut colorspace = Colorspace::C420; // format default when no C token
    let mut colorspace_tag = None;
    let mut extra = Vec::new();

    for token in tokens {
        match token.as_bytes().first() {
            Some(b'W') => width = token[1..].parse::<usize>().ok(),
            Some(b'H') => height = token[1..].parse::<usize>().ok(),
            Some(b'F') => {
                let (num, den) = token[1..]
                    .split_once(':')
                    .ok_or_else(|| VideoError::InvalidStream(format!("bad frame rate {token}")))?;
                let num: u32 = num
                    .parse()
                    .map_err(|_| VideoError::InvalidStream(format!("bad frame rate {token}")))?;
                let den: u32 = den
                    .parse()
                    .map_err(|_| VideoError::InvalidStream(format!("bad frame rate {token}")))?;
                if num == 0 || den == 0 {
                    return Err(VideoError::InvalidStream(format!("bad frame rate {token}")));
                }
                fps = Some((num, den));
            }
            Some(b'C') => {
                colorspace = match &token[1..] {
                    "420" | "420jpeg" | "420mpeg2" | "420paldv" => Colorspace::C420,
                    "422" => Colorspace::C422,
                    "444" => Colorspace::C444,
                    other => {
                        return Err(VideoError::UnsupportedMedia(format!(
                            "colorspace {other} is not supported"
                        )))
                    }
                };
                colorspace_tag = Some(token[1..].to_string());
            }
            Some(_) => extra.push(token.to_string()),
            None => {}
        }
    }

    let width = width.ok_or_else(|| VideoError::InvalidStream("missing width".into()))?;
    let height = height.ok_or_else(|| VideoError::InvalidStream("missing height".into()))?;
    let (fps_num, fps_den) =
        fps.ok_or_else(|| VideoError::InvalidStream("missing frame rate".into()))?;
    if width == 0 || height == 0 {
        return Err(VideoError::InvalidStream("zero frame dimension".into()));
    }

    Ok(StreamHeader {
        width,
        height,
        fps_num,
        fps_den,
        colorspace,
        colorspace_tag,
        extra,
    })
}

/// Write a stream header line equivalent to the one that was parsed.
pub fn write_stream_header(writer: &mut impl Write, header: &StreamHeader) -> std::io::Result<()> {
    write!(
        writer,
        "YUV4MPEG2 W{} H{} F{}:{}",
        header.width, header.height, header.fps_num, header.fps_den
    )?;
    for token in &header.extra {
        write!(writer, " {token}")?;
    }
    if let Some(tag) = &header.colorspace_tag {
        write!(writer, " C{tag}")?;
    }
    writer.write_all(b"\n")
}

/// Read the next frame into `buf` (resized to the frame size).
///
/// Returns the frame's parameter string (usually empty), or `None` on clean
/// end of stream. A `FRAME` line followed by truncated plane data is an error.
pub fn read_frame_into(
    reader: &mut impl BufRead,
    header: &StreamHeader,
    buf: &mut Vec<u8>,
) -> Result<Option<String>, VideoError> {
    let line = match read_line(reader)? {
        None => return Ok(None),
        Some(line) => line,
    };
    let params = line
        .strip_prefix("FRAME")
        .ok_or_else(|| VideoError::InvalidStream("expected FRAME marker".into()))?;

    buf.resize(header.frame_size(), 0);
    reader
        .read_exact(buf)
        .map_err(|_| VideoError::InvalidStream("truncated frame data".into()))?;
    Ok(Some(params.to_string()))
}

/// Write one frame: `FRAME<params>\n` plus plane data.
pub fn write_frame(writer: &mut impl Write, params: &str, data: &[u8]) -> std::io::Result<()> {
    write!(writer, "FRAME{params}\n")?;
    writer.write_all(data)
}

/// Scan a Y4M file: parse the header and count its frames.
pub fn probe(path: &Path) -> Result<StreamInfo, VideoError> {
    let mut reader = BufReader::new(std::fs::File::open(path)?);
    let header = read_stream_header(&mut reader)?;
    let mut buf = Vec::new();
    let mut frame_count = 0;
    while read_frame_into(&mut reader, &header, &mut buf)?.is_some() {
        frame_count += 1;
    }
    Ok(StreamInfo { header, frame_count })
}

/// Test fixture: an in-memory stream of flat gray (0x80) frames.
#[cfg(test)]
pub(crate) fn gray_stream(width: usize, height: usize, frames: usize, c_tag: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(
        format!("YUV4MPEG2 W{width} H{height} F25:1 Ip A1:1 C{c_tag}\n").as_bytes(),
    );
    let header = StreamHeader {
        width,
        height,
        fps_num: 25,
        fps_den: 1,
        colorspace: match c_tag {
            "422" => Colorspace::C422,
            "444" => Colorspace::C444,
            _ => Colorspace::C420,
        },
        colorspace_tag: Some(c_tag.to_string()),
        extra: vec![],
    };
    for _ in 0..frames {
        out.extend_from_slice(b"FRAME\n");
        out.extend(std::iter::repeat(0x80).take(header.frame_size()));
    }
    out
}
