// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/kapsel

//! Visible text marker compositing.
//!
//! Draws the marker text directly onto a frame's YCbCr planes in red, near
//! the bottom-left corner, scaled to the frame size. This is deliberately a
//! *visible* overlay — the capsule's video path marks one frame a viewer can
//! find, which is a much weaker hiding scheme than the image path's
//! invisible LSB embedding.
//!
//! Glyphs come from a built-in 5×7 bitmap font covering printable ASCII;
//! anything outside that range renders as `?`. Each glyph is stored as five
//! column bytes, least-significant bit at the top row.

use crate::video::y4m::StreamHeader;

/// Glyph cell width in pixels (before scaling).
pub const GLYPH_W: usize = 5;
/// Glyph cell height in pixels (before scaling).
pub const GLYPH_H: usize = 7;
/// Horizontal advance per character: glyph plus one column of spacing.
const GLYPH_ADVANCE: usize = GLYPH_W + 1;

/// Marker color in BT.601 YCbCr: pure red (R=255, G=0, B=0).
const RED_Y: u8 = 76;
const RED_CB: u8 = 85;
const RED_CR: u8 = 255;

/// Classic 5×7 ASCII font, characters 0x20..=0x7F.
/// Column-major: `FONT5X7[c - 0x20][col]`, bit `row` set = pixel on.
const FONT5X7: [[u8; 5]; 96] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5F, 0x00, 0x00], // '!'
    [0x00, 0x07, 0x00, 0x07, 0x00], // '"'
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // '#'
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // '$'
    [0x23, 0x13, 0x08, 0x64, 0x62], // '%'
    [0x36, 0x49, 0x55, 0x22, 0x50], // '&'
    [0x00, 0x05, 0x03, 0x00, 0x00], // '\''
    [0x00, 0x1C, 0x22, 0x41, 0x00], // '('
    [0x00, 0x41, 0x22, 0x1C, 0x00], // ')'
    [0x08, 0x2A, 0x1C, 0x2A, 0x08], // '*'
    [0x08, 0x08, 0x3E, 0x08, 0x08], // '+'
    [0x00, 0x50, 0x30, 0x00, 0x00], // ','
    [0x08, 0x08, 0x08, 0x08, 0x08], // '-'
    [0x00, 0x60, 0x60, 0x00, 0x00], // '.'
    [0x20, 0x10, 0x08, 0x04, 0x02], // '/'
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // '0'
    [0x00, 0x42, 0x7F, 0x40, 0x00], // '1'
    [0x42, 0x61, 0x51, 0x49, 0x46], // '2'
    [0x21, 0x41, 0x45, 0x4B, 0x31], // '3'
    [0x18, 0x14, 0x12, 0x7F, 0x10], // '4'
    [0x27, 0x45, 0x45, 0x45, 0x39], // '5'
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // '6'
    [0x01, 0x71, 0x09, 0x05, 0x03], // '7'
    [0x36, 0x49, 0x49, 0x49, 0x36], // '8'
    [0x06, 0x49, 0x49, 0x29, 0x1E], // '9'
    [0x00, 0x36, 0x36, 0x00, 0x00], // ':'
    [0x00, 0x56, 0x36, 0x00, 0x00], // ';'
    [0x00, 0x08, 0x14, 0x22, 0x41], // '<'
    [0x14, 0x14, 0x14, 0x14, 0x14], // '='
    [0x41, 0x22, 0x14, 0x08, 0x00], // '>'
    [0x02, 0x01, 0x51, 0x09, 0x06], // '?'
    [0x32, 0x49, 0x79, 0x41, 0x3E], // '@'
    [0x7E, 0x11, 0x11, 0x11, 0x7E], // 'A'
    [0x7F, 0x49, 0x49, 0x49, 0x36], // 'B'
    [0x3E, 0x41, 0x41, 0x41, 0x22], // 'C'
    [0x7F, 0x41, 0x41, 0x22, 0x1C], // 'D'
    [0x7F, 0x49, 0x49, 0x49, 0x41], // 'E'
    [0x7F, 0x09, 0x09, 0x01, 0x01], // 'F'
    [0x3E, 0x41, 0x41, 0x51, 0x32], // 'G'
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // 'H'
    [0x00, 0x41, 0x7F, 0x41, 0x00], // 'I'
    [0x20, 0x40, 0x41, 0x3F, 0x01], // 'J'
    [0x7F, 0x08, 0x14, 0x22, 0x41], // 'K'
    [0x7F, 0x40, 0x40, 0x40, 0x40], // 'L'
    [0x7F, 0x02, 0x04, 0x02, 0x7F], // 'M'
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // 'N'
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // 'O'
    [0x7F, 0x09, 0x09, 0x09, 0x06], // 'P'
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // 'Q'
    [0x7F, 0x09, 0x19, 0x29, 0x46], // 'R'
    [0x46, 0x49, 0x49, 0x49, 0x31], // 'S'
    [0x01, 0x01, 0x7F, 0x01, 0x01], // 'T'
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // 'U'
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // 'V'
    [0x7F, 0x20, 0x18, 0x20, 0x7F], // 'W'
    [0x63, 0x14, 0x08, 0x14, 0x63], // 'X'
    [0x03, 0x04, 0x78, 0x04, 0x03], // 'Y'
    [0x61, 0x51, 0x49, 0x45, 0x43], // 'Z'
    [0x00, 0x00, 0x7F, 0x41, 0x41], // '['
    [0x02, 0x04, 0x08, 0x10, 0x20], // '\\'
    [0x41, 0x41, 0x7F, 0x00, 0x00], // ']'
    [0x04, 0x02, 0x01, 0x02, 0x04], // '^'
    [0x40, 0x40, 0x40, 0x40, 0x40], // '_'
    [0x00, 0x01, 0x02, 0x04, 0x00], // '`'
    [0x20, 0x54, 0x54, 0x54, 0x78], // 'a'
    [0x7F, 0x48, 0x44, 0x44, 0x38], // 'b'
    [0x38, 0x44, 0x44, 0x44, 0x20], // 'c'
    [0x38, 0x44, 0x44, 0x48, 0x7F], // 'd'
    [0x38, 0x54, 0x54, 0x54, 0x18], // 'e'
    [0x08, 0x7E, 0x09, 0x01, 0x02], // 'f'
    [0x0C, 0x52, 0x52, 0x52, 0x3E], // 'g'
    [0x7F, 0x08, 0x04, 0x04, 0x78], // 'h'
    [0x00, 0x44, 0x7D, 0x40, 0x00], // 'i'
    [0x20, 0x40, 0x44, 0x3D, 0x00], // 'j'
    [0x00, 0x7F, 0x10, 0x28, 0x44], // 'k'
    [0x00, 0x41, 0x7F, 0x40, 0x00], // 'l'
    [0x7C, 0x04, 0x18, 0x04, 0x78], // 'm'
    [0x7C, 0x08, 0x04, 0x04, 0x78], // 'n'
    [0x38, 0x44, 0x44, 0x44, 0x38], // 'o'
    [0x7C, 0x14, 0x14, 0x14, 0x08], // 'p'
    [0x08, 0x14, 0x14, 0x18, 0x7C], // 'q'
    [0x7C, 0x08, 0x04, 0x04, 0x08], // 'r'
    [0x48, 0x54, 0x54, 0x54, 0x20], // 's'
    [0x04, 0x3F, 0x44, 0x40, 0x20], // 't'
    [0x3C, 0x40, 0x40, 0x20, 0x7C], // 'u'
    [0x1C, 0x20, 0x40, 0x20, 0x1C], // 'v'
    [0x3C, 0x40, 0x30, 0x40, 0x3C], // 'w'
    [0x44, 0x28, 0x10, 0x28, 0x44], // 'x'
    [0x0C, 0x50, 0x50, 0x50, 0x3C], // 'y'
    [0x44, 0x64, 0x54, 0x4C, 0x44], // 'z'
    [0x00, 0x08, 0x36, 0x41, 0x00], // '{'
    [0x00, 0x00, 0x7F, 0x00, 0x00], // '|'
    [0x00, 0x41, 0x36, 0x08, 0x00], // '}'
    [0x08, 0x08, 0x2A, 0x1C, 0x08], // '~'
    [0x00, 0x00, 0x00, 0x00, 0x00], // DEL
];

/// Integer scale factor for a `width`×`height` frame.
///
/// Mirrors the carrier-relative sizing of the original overlay: roughly one
/// glyph-height per 3% of the short side, never below 1.
fn scale_for(width: usize, height: usize) -> usize {
    (width.min(height) / 200).max(1)
}

/// Composite `text` in red onto the frame's planes, bottom-left.
///
/// Pixels outside the frame are clipped, so an over-long marker is cut off
/// at the right edge rather than wrapping or panicking.
pub fn draw_marker(frame: &mut [u8], header: &StreamHeader, text: &str) {
    let width = header.width;
    let height = header.height;
    let scale = scale_for(width, height);

    let origin_x = width / 20;
    let baseline = height * 95 / 100;
    let origin_y = baseline.saturating_sub(GLYPH_H * scale);

    let (cb_off, cr_off) = (header.cb_offset(), header.cr_offset());
    let (sx, sy) = header.colorspace.chroma_shift();
    let (cw, _) = header.colorspace.chroma_dims(width, height);

    for (i, ch) in text.chars().enumerate() {
        let glyph_index = if ch.is_ascii() && (ch as usize) >= 0x20 && (ch as usize) < 0x80 {
            ch as usize - 0x20
        } else {
            b'?' as usize - 0x20
        };
        let glyph = &FONT5X7[glyph_index];
        let char_x = origin_x + i * GLYPH_ADVANCE * scale;

        for (col, bits) in glyph.iter().enumerate() {
            for row in 0..GLYPH_H {
                if bits >> row & 1 == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let x = char_x + col * scale + dx;
                        let y = origin_y + row * scale + dy;
                        if x >= width || y >= height {
                            continue;
                        }
                        frame[y * width + x] = RED_Y;
                        let c = (y >> sy) * cw + (x >> sx);
                        frame[cb_off + c] = RED_CB;
                        frame[cr_off + c] = RED_CR;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::y4m::{read_stream_header, StreamHeader};
    use std::io::Cursor;

    fn header(c_tag: &str, width: usize, height: usize) -> StreamHeader {
        let line = format!("YUV4MPEG2 W{width} H{height} F25:1 C{c_tag}\n");
        read_stream_header(&mut Cursor::new(line.as_bytes())).unwrap()
    }

    #[test]
    fn marker_changes_pixels() {
        let h = header("420", 320, 240);
        let mut frame = vec![0x80u8; h.frame_size()];
        draw_marker(&mut frame, &h, "secret");
        assert!(frame.iter().any(|&b| b != 0x80), "overlay must touch pixels");
    }

    #[test]
    fn marker_paints_red() {
        let h = header("444", 320, 240);
        let mut frame = vec![0x80u8; h.frame_size()];
        draw_marker(&mut frame, &h, "A");

        let luma = &frame[..h.cb_offset()];
        let lit: Vec<usize> = luma
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0x80)
            .map(|(i, _)| i)
            .collect();
        assert!(!lit.is_empty());
        for i in lit {
            assert_eq!(frame[i], RED_Y);
            assert_eq!(frame[h.cb_offset() + i], RED_CB, "4:4:4 chroma maps 1:1");
            assert_eq!(frame[h.cr_offset() + i], RED_CR);
        }
    }

    #[test]
    fn marker_stays_in_bottom_left_region() {
        let h = header("420", 640, 480);
        let mut frame = vec![0x10u8; h.frame_size()];
        draw_marker(&mut frame, &h, "hi");

        for y in 0..h.height {
            for x in 0..h.width {
                if frame[y * h.width + x] != 0x10 {
                    assert!(y > h.height / 2, "pixel ({x},{y}) above lower half");
                    assert!(x < h.width / 2, "pixel ({x},{y}) right of left half");
                }
            }
        }
    }

    #[test]
    fn overlong_marker_clips_without_panic() {
        let h = header("420", 64, 48);
        let mut frame = vec![0x80u8; h.frame_size()];
        draw_marker(&mut frame, &h, &"x".repeat(500));
    }

    #[test]
    fn non_ascii_renders_as_question_mark() {
        let h = header("444", 128, 96);
        let mut with_unicode = vec![0x80u8; h.frame_size()];
        let mut with_question = vec![0x80u8; h.frame_size()];
        draw_marker(&mut with_unicode, &h, "ü");
        draw_marker(&mut with_question, &h, "?");
        assert_eq!(with_unicode, with_question);
    }

    #[test]
    fn scale_grows_with_frame() {
        assert_eq!(scale_for(320, 240), 1);
        assert_eq!(scale_for(1920, 1080), 5);
    }
}
