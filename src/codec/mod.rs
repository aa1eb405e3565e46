//! Byte <-> text conversion for the output view and the command line.
//!
//! Display encoding turns received bytes into fixed-width text lines under one
//! of the [`Mode`]s; input decoding turns a typed command back into the bytes
//! put on the wire.

mod decode;
mod rtu;

pub use decode::{decode, CodecError};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::eol::{Eol, Segment, Segmenter};

/// Columns taken by the hexdump address plus its separators.
pub const HEXDUMP_OVERHEAD: usize = 10;
const HEXDUMP_GROUP: usize = 8;

/// Encoding used both to render received bytes and to parse typed commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Printable ASCII as-is, everything else as `\xHH`
    #[default]
    Text,
    /// One `HH` token per byte
    Raw,
    /// Address, hex bytes and ASCII gutter
    Hexdump,
    /// Raw tokens; commands are framed with a Modbus CRC
    RtuRaw,
    /// Hexdump view; commands are hex with a Modbus CRC
    RtuHex,
}

impl Mode {
    pub const ALL: [Mode; 5] = [Mode::Text, Mode::Raw, Mode::Hexdump, Mode::RtuRaw, Mode::RtuHex];

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Text => "TEXT",
            Mode::Raw => "RAW",
            Mode::Hexdump => "HEX",
            Mode::RtuRaw => "RTU RAW",
            Mode::RtuHex => "RTU HEX",
        }
    }

    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|m| m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// The layout received bytes are rendered with.
    fn layout(&self) -> Layout {
        match self {
            Mode::Text => Layout::Text,
            Mode::Raw | Mode::RtuRaw => Layout::Raw,
            Mode::Hexdump | Mode::RtuHex => Layout::Hexdump,
        }
    }

    pub fn appends_eol(&self) -> bool {
        matches!(self, Mode::Text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Text,
    Raw,
    Hexdump,
}

/// Output of [`encode`]: runs of rendered text and line boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    LineEnd,
}

/// Per-line encoder state carried between calls to [`encode`].
#[derive(Debug, Clone)]
pub struct LineCursor {
    mode: Mode,
    width: usize,
    column: usize,
    wrapped: bool,
    segmenter: Segmenter,
    row: Vec<u8>,
    address: usize,
}

impl LineCursor {
    pub fn new(mode: Mode, width: usize, eol: Eol) -> Self {
        Self {
            mode,
            width: width.max(1),
            column: 0,
            wrapped: false,
            segmenter: Segmenter::new(eol),
            row: Vec::new(),
            address: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Bytes per line in RAW layout.
    pub fn raw_per_line(&self) -> usize {
        (self.width / 3).max(1)
    }

    /// Bytes per row in HEXDUMP layout.
    pub fn hexdump_per_row(&self) -> usize {
        hexdump_bytes_per_row(self.width)
    }

    /// The hexdump row still being filled, rendered for display.
    pub fn pending_row(&self) -> Option<String> {
        if self.mode.layout() != Layout::Hexdump || self.row.is_empty() {
            return None;
        }
        Some(hexdump_row(self.address, &self.row, self.hexdump_per_row()))
    }
}

/// Largest multiple of 8 bytes whose hexdump row fits in `width` columns.
pub fn hexdump_bytes_per_row(width: usize) -> usize {
    let n = (width.saturating_sub(HEXDUMP_OVERHEAD) * HEXDUMP_GROUP / 33) & !(HEXDUMP_GROUP - 1);
    n.max(HEXDUMP_GROUP)
}

/// One hexdump row: address, hex bytes in groups of 8 padded to `per_row`,
/// and the ASCII gutter.
pub fn hexdump_row(address: usize, bytes: &[u8], per_row: usize) -> String {
    let mut out = String::with_capacity(HEXDUMP_OVERHEAD + per_row * 4 + per_row / HEXDUMP_GROUP);
    let _ = write!(out, "{:08X}  ", address);
    for i in 0..per_row {
        match bytes.get(i) {
            Some(b) => {
                let _ = write!(out, "{:02X} ", b);
            }
            None => out.push_str("   "),
        }
        if i % HEXDUMP_GROUP == HEXDUMP_GROUP - 1 && i + 1 < per_row {
            out.push(' ');
        }
    }
    out.push(' ');
    for &b in bytes {
        out.push(if is_printable(b) { b as char } else { '.' });
    }
    out
}

fn is_printable(b: u8) -> bool {
    (0x20..0x7f).contains(&b)
}

/// Render `bytes` under the cursor's mode, continuing the current line.
pub fn encode(bytes: &[u8], cursor: &mut LineCursor) -> Vec<Fragment> {
    let mut out = Emitter::default();
    match cursor.mode.layout() {
        Layout::Text => encode_text(bytes, cursor, &mut out),
        Layout::Raw => encode_raw(bytes, cursor, &mut out),
        Layout::Hexdump => encode_hexdump(bytes, cursor, &mut out),
    }
    out.finish()
}

#[derive(Default)]
struct Emitter {
    fragments: Vec<Fragment>,
    run: String,
}

impl Emitter {
    fn text(&mut self, s: &str) {
        self.run.push_str(s);
    }

    fn line_end(&mut self) {
        if !self.run.is_empty() {
            self.fragments.push(Fragment::Text(std::mem::take(&mut self.run)));
        }
        self.fragments.push(Fragment::LineEnd);
    }

    fn finish(mut self) -> Vec<Fragment> {
        if !self.run.is_empty() {
            self.fragments.push(Fragment::Text(self.run));
        }
        self.fragments
    }
}

fn encode_text(bytes: &[u8], cursor: &mut LineCursor, out: &mut Emitter) {
    let width = cursor.width;
    let segmenter = &mut cursor.segmenter;
    let mut column = cursor.column;
    let mut wrapped = cursor.wrapped;

    for &b in bytes {
        segmenter.feed(b, &mut |seg| match seg {
            Segment::Break => {
                // A terminator right after a width wrap closes the same line.
                if !(wrapped && column == 0) {
                    out.line_end();
                }
                column = 0;
                wrapped = false;
            }
            Segment::Byte(b) => {
                let mut token = [0u8; 4];
                let token = text_token(b, &mut token);
                if column > 0 && column + token.len() > width {
                    out.line_end();
                    column = 0;
                }
                out.text(token);
                column += token.len();
                wrapped = false;
                if column >= width {
                    out.line_end();
                    column = 0;
                    wrapped = true;
                }
            }
        });
    }

    cursor.column = column;
    cursor.wrapped = wrapped;
}

fn text_token(b: u8, buf: &mut [u8; 4]) -> &str {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let len = if b == b'\\' {
        buf[0] = b'\\';
        buf[1] = b'\\';
        2
    } else if is_printable(b) {
        buf[0] = b;
        1
    } else {
        buf[0] = b'\\';
        buf[1] = b'x';
        buf[2] = HEX[(b >> 4) as usize];
        buf[3] = HEX[(b & 0x0f) as usize];
        4
    };
    // Every token is ASCII.
    std::str::from_utf8(&buf[..len]).unwrap_or("?")
}

fn encode_raw(bytes: &[u8], cursor: &mut LineCursor, out: &mut Emitter) {
    let per_line = cursor.raw_per_line();
    for &b in bytes {
        out.text(&format!("{:02X} ", b));
        cursor.column += 3;
        if cursor.column >= per_line * 3 {
            out.line_end();
            cursor.column = 0;
        }
    }
}

fn encode_hexdump(bytes: &[u8], cursor: &mut LineCursor, out: &mut Emitter) {
    let per_row = cursor.hexdump_per_row();
    for &b in bytes {
        cursor.row.push(b);
        if cursor.row.len() == per_row {
            out.text(&hexdump_row(cursor.address, &cursor.row, per_row));
            out.line_end();
            cursor.address += per_row;
            cursor.row.clear();
        }
    }
}

/// Visual role of a span within a rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Escape,
    Address,
    Gutter,
}

/// Split a rendered line into styled spans for the renderer.
pub fn style_line(line: &str, mode: Mode) -> Vec<(Tone, &str)> {
    match mode.layout() {
        Layout::Raw => vec![(Tone::Plain, line)],
        Layout::Hexdump => style_hexdump(line),
        Layout::Text => style_text(line),
    }
}

fn style_hexdump(line: &str) -> Vec<(Tone, &str)> {
    if line.len() < HEXDUMP_OVERHEAD || !line.is_ascii() {
        return vec![(Tone::Plain, line)];
    }
    // The gutter holds one character per hex cell, so counting the leading
    // cells tells where it starts even when it contains spaces.
    let body = &line.as_bytes()[HEXDUMP_OVERHEAD..];
    let mut cells = 0;
    let mut pos = 0;
    while body.len() - pos > cells + 1 && pos + 3 <= body.len() {
        let cell = &body[pos..pos + 3];
        if !(cell[0].is_ascii_hexdigit() && cell[1].is_ascii_hexdigit() && cell[2] == b' ') {
            break;
        }
        cells += 1;
        pos += 3;
        if cells % HEXDUMP_GROUP == 0 && body.get(pos) == Some(&b' ') {
            pos += 1;
        }
    }

    let (address, rest) = line.split_at(8);
    if cells == 0 {
        return vec![(Tone::Address, address), (Tone::Plain, rest)];
    }
    let (hex, gutter) = rest.split_at(rest.len() - cells);
    vec![(Tone::Address, address), (Tone::Plain, hex), (Tone::Gutter, gutter)]
}

fn style_text(line: &str) -> Vec<(Tone, &str)> {
    let bytes = line.as_bytes();
    let mut spans = Vec::new();
    let mut plain_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let esc_len = if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'x') && i + 4 <= bytes.len() {
            4
        } else if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'\\') {
            2
        } else {
            0
        };
        if esc_len == 0 {
            i += 1;
            continue;
        }
        if plain_start < i {
            spans.push((Tone::Plain, &line[plain_start..i]));
        }
        spans.push((Tone::Escape, &line[i..i + esc_len]));
        i += esc_len;
        plain_start = i;
    }
    if plain_start < bytes.len() {
        spans.push((Tone::Plain, &line[plain_start..]));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_of(fragments: &[Fragment]) -> (Vec<String>, String) {
        let mut done = Vec::new();
        let mut current = String::new();
        for f in fragments {
            match f {
                Fragment::Text(t) => current.push_str(t),
                Fragment::LineEnd => done.push(std::mem::take(&mut current)),
            }
        }
        (done, current)
    }

    fn joined(fragments: &[Fragment]) -> String {
        fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::Text(t) => Some(t.as_str()),
                Fragment::LineEnd => None,
            })
            .collect()
    }

    #[test]
    fn test_text_escapes_non_printable() {
        let mut cursor = LineCursor::new(Mode::Text, 80, Eol::Lf);
        let out = encode(b"A\x01\xff\\z", &mut cursor);
        assert_eq!(joined(&out), "A\\x01\\xFF\\\\z");
    }

    #[test]
    fn test_text_newline_ends_line() {
        let mut cursor = LineCursor::new(Mode::Text, 80, Eol::Lf);
        let (done, pending) = lines_of(&encode(b"one\ntwo", &mut cursor));
        assert_eq!(done, vec!["one"]);
        assert_eq!(pending, "two");
    }

    #[test]
    fn test_text_crlf_scenario() {
        let mut cursor = LineCursor::new(Mode::Text, 80, Eol::CrLf);
        let (done, pending) = lines_of(&encode(b"AB\r\nCD", &mut cursor));
        assert_eq!(done, vec!["AB"]);
        assert_eq!(pending, "CD");
    }

    #[test]
    fn test_text_wraps_at_width_without_splitting_escapes() {
        let mut cursor = LineCursor::new(Mode::Text, 6, Eol::Lf);
        let (done, pending) = lines_of(&encode(b"abc\x01d", &mut cursor));
        assert_eq!(done, vec!["abc"]);
        assert_eq!(pending, "\\x01d");
    }

    #[test]
    fn test_text_terminator_after_full_line_adds_no_blank_line() {
        let mut cursor = LineCursor::new(Mode::Text, 4, Eol::Lf);
        let (done, pending) = lines_of(&encode(b"abcd\nef", &mut cursor));
        assert_eq!(done, vec!["abcd"]);
        assert_eq!(pending, "ef");
    }

    #[test]
    fn test_raw_line_width() {
        let mut cursor = LineCursor::new(Mode::Raw, 12, Eol::Lf);
        let (done, pending) = lines_of(&encode(&[0x41, 0x0a, 0x7f, 0x00, 0x10], &mut cursor));
        assert_eq!(done, vec!["41 0A 7F 00 "]);
        assert_eq!(pending, "10 ");
    }

    #[test]
    fn test_raw_exact_fill_finalizes_once() {
        let mut cursor = LineCursor::new(Mode::RtuRaw, 12, Eol::Lf);
        let out = encode(&[1, 2, 3, 4], &mut cursor);
        assert_eq!(out.iter().filter(|f| **f == Fragment::LineEnd).count(), 1);
        assert_eq!(out.last(), Some(&Fragment::LineEnd));
    }

    #[test]
    fn test_hexdump_row_scenario() {
        let row = hexdump_row(0, &[0x41, 0x0a, 0x7f], 8);
        assert!(row.starts_with("00000000  41 0A 7F "));
        assert!(row.ends_with(" A.."));
        // Padding keeps the gutter where a full row would put it.
        let full = hexdump_row(0, &[0x41; 8], 8);
        assert_eq!(row.len() - 3, full.len() - 8);
    }

    #[test]
    fn test_hexdump_groups_of_eight() {
        let bytes: Vec<u8> = (0..16).collect();
        let row = hexdump_row(0x10, &bytes, 16);
        assert!(row.starts_with("00000010  00 01 02 03 04 05 06 07  08 09"));
    }

    #[test]
    fn test_hexdump_bytes_per_row() {
        assert_eq!(hexdump_bytes_per_row(80), 16);
        assert_eq!(hexdump_bytes_per_row(20), 8);
        assert_eq!(hexdump_bytes_per_row(160), 32);
    }

    #[test]
    fn test_hexdump_pending_row_and_addresses() {
        let mut cursor = LineCursor::new(Mode::Hexdump, 20, Eol::Lf);
        let data: Vec<u8> = (0..11).collect();
        let (done, pending) = lines_of(&encode(&data, &mut cursor));
        assert_eq!(done.len(), 1);
        assert!(done[0].starts_with("00000000  00 01"));
        assert!(pending.is_empty());
        let row = cursor.pending_row().unwrap();
        assert!(row.starts_with("00000008  08 09 0A "));
    }

    #[test]
    fn test_style_text_marks_escapes() {
        let spans = style_line("a\\x01b", Mode::Text);
        assert_eq!(
            spans,
            vec![(Tone::Plain, "a"), (Tone::Escape, "\\x01"), (Tone::Plain, "b")]
        );
    }

    #[test]
    fn test_style_hexdump_columns() {
        let row = hexdump_row(0, &[0x41, 0x42], 8);
        let spans = style_line(&row, Mode::Hexdump);
        assert_eq!(spans[0], (Tone::Address, "00000000"));
        assert_eq!(spans.last(), Some(&(Tone::Gutter, "AB")));

        let spaced = hexdump_row(0, b"A  B", 8);
        let spans = style_line(&spaced, Mode::Hexdump);
        assert_eq!(spans.last(), Some(&(Tone::Gutter, "A  B")));

        let full: Vec<u8> = (0x41..0x51).collect();
        let row = hexdump_row(0, &full, 16);
        let spans = style_line(&row, Mode::Hexdump);
        assert_eq!(spans.last(), Some(&(Tone::Gutter, "ABCDEFGHIJKLMNOP")));
    }

    #[test]
    fn test_mode_cycle_wraps() {
        assert_eq!(Mode::Text.next(), Mode::Raw);
        assert_eq!(Mode::RtuHex.next(), Mode::Text);
    }
}
