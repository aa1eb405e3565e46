//! Received-data history and its rendered form.
//!
//! Three co-indexed regions: the raw bytes exactly as received, the text those
//! bytes render to under the current mode and width, and the start offset of
//! every rendered line. Finalized lines are followed by a `\n` marker in the
//! rendered text; the line still being filled sits at the tail unterminated.

use std::borrow::Cow;
use thiserror::Error;

use crate::codec::{encode, Fragment, LineCursor, Mode};
use crate::eol::Eol;

const MIN_GROWTH: usize = 4096;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScrollbackError {
    #[error("out of memory growing the scrollback")]
    OutOfMemory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

pub struct Scrollback {
    raw: Vec<u8>,
    formatted: String,
    line_starts: Vec<usize>,
    cursor: LineCursor,
    eol: Eol,
    height: usize,
    first_visible: usize,
}

impl Scrollback {
    pub fn new(mode: Mode, width: usize, height: usize, eol: Eol) -> Self {
        Self {
            raw: Vec::with_capacity(MIN_GROWTH),
            formatted: String::with_capacity(MIN_GROWTH),
            line_starts: vec![0],
            cursor: LineCursor::new(mode, width, eol),
            eol,
            height: height.max(1),
            first_visible: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.cursor.mode()
    }

    pub fn width(&self) -> usize {
        self.cursor.width()
    }

    pub fn first_visible(&self) -> usize {
        self.first_visible
    }

    fn finalized_lines(&self) -> usize {
        self.line_starts.len() - 1
    }

    fn has_pending(&self) -> bool {
        self.line_starts.last().is_some_and(|&start| start < self.formatted.len())
            || self.cursor.pending_row().is_some()
    }

    /// Finalized lines plus the one being filled, if it has content.
    pub fn total_lines(&self) -> usize {
        self.finalized_lines() + usize::from(self.has_pending())
    }

    /// First-visible position that shows the newest line at the bottom.
    fn tail_position(&self) -> usize {
        self.total_lines().saturating_sub(self.height)
    }

    /// Furthest the view may scroll: half a screen of content stays visible.
    fn max_first_visible(&self) -> usize {
        self.total_lines()
            .saturating_sub(self.height / 2)
            .max(self.tail_position())
    }

    pub fn is_at_tail(&self) -> bool {
        self.first_visible >= self.tail_position()
    }

    /// Store `bytes` and render them, keeping the view on the tail if it was there.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), ScrollbackError> {
        if bytes.is_empty() {
            return Ok(());
        }
        let following = self.is_at_tail();
        grow(&mut self.raw, bytes.len())?;
        self.raw.extend_from_slice(bytes);
        self.render(bytes)?;
        if following {
            self.first_visible = self.tail_position();
        }
        Ok(())
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), ScrollbackError> {
        self.rebuild(mode, self.width())
    }

    /// Re-render for a new width; a no-op if it did not change.
    pub fn set_width(&mut self, width: usize) -> Result<(), ScrollbackError> {
        if width.max(1) == self.width() {
            return Ok(());
        }
        self.rebuild(self.mode(), width)
    }

    /// New viewport size. A width change re-renders; a height change keeps
    /// the view on the tail if it was there.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), ScrollbackError> {
        let following = self.is_at_tail();
        self.height = height.max(1);
        if width.max(1) != self.width() {
            return self.set_width(width);
        }
        self.first_visible = if following {
            self.tail_position()
        } else {
            self.first_visible.min(self.max_first_visible())
        };
        Ok(())
    }

    /// Move the view by `lines`; 0 jumps to the start or the end.
    pub fn scroll(&mut self, lines: usize, direction: ScrollDirection) {
        self.first_visible = match (direction, lines) {
            (ScrollDirection::Up, 0) => 0,
            (ScrollDirection::Down, 0) => self.tail_position(),
            (ScrollDirection::Up, n) => self.first_visible.saturating_sub(n),
            (ScrollDirection::Down, n) => (self.first_visible + n).min(self.max_first_visible()),
        };
    }

    /// The lines currently in the viewport, top to bottom.
    pub fn visible(&self) -> Vec<Cow<'_, str>> {
        let end = (self.first_visible + self.height).min(self.total_lines());
        (self.first_visible..end).filter_map(|i| self.line(i)).collect()
    }

    /// Rendered line `index`, without its terminator marker.
    pub fn line(&self, index: usize) -> Option<Cow<'_, str>> {
        if index < self.finalized_lines() {
            let start = self.line_starts[index];
            let end = self.line_starts[index + 1] - 1;
            return Some(Cow::Borrowed(&self.formatted[start..end]));
        }
        if index != self.finalized_lines() || !self.has_pending() {
            return None;
        }
        match self.cursor.pending_row() {
            Some(row) => Some(Cow::Owned(row)),
            None => Some(Cow::Borrowed(&self.formatted[self.line_starts[index]..])),
        }
    }

    fn rebuild(&mut self, mode: Mode, width: usize) -> Result<(), ScrollbackError> {
        self.cursor = LineCursor::new(mode, width, self.eol);
        self.formatted.clear();
        self.line_starts.clear();
        self.line_starts.push(0);
        let raw = std::mem::take(&mut self.raw);
        let rendered = self.render(&raw);
        self.raw = raw;
        rendered?;
        self.first_visible = self.tail_position();
        Ok(())
    }

    fn render(&mut self, bytes: &[u8]) -> Result<(), ScrollbackError> {
        grow(&mut self.line_starts, bytes.len() + 1)?;
        for fragment in encode(bytes, &mut self.cursor) {
            match fragment {
                Fragment::Text(text) => push_text(&mut self.formatted, &text)?,
                Fragment::LineEnd => {
                    push_text(&mut self.formatted, "\n")?;
                    self.line_starts.push(self.formatted.len());
                }
            }
        }
        Ok(())
    }
}

/// Next capacity: double, but at least enough for `needed` plus a chunk.
fn next_capacity(capacity: usize, len: usize, needed: usize) -> usize {
    (capacity * 2).max(len + needed + MIN_GROWTH)
}

fn grow<T>(buf: &mut Vec<T>, needed: usize) -> Result<(), ScrollbackError> {
    if buf.capacity() - buf.len() >= needed {
        return Ok(());
    }
    let target = next_capacity(buf.capacity(), buf.len(), needed);
    buf.try_reserve_exact(target - buf.len())
        .map_err(|_| ScrollbackError::OutOfMemory)
}

/// Append `text`, growing through the fallible path first.
fn push_text(buf: &mut String, text: &str) -> Result<(), ScrollbackError> {
    if buf.capacity() - buf.len() < text.len() {
        let target = next_capacity(buf.capacity(), buf.len(), text.len());
        buf.try_reserve_exact(target - buf.len())
            .map_err(|_| ScrollbackError::OutOfMemory)?;
    }
    buf.push_str(text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(sb: &Scrollback) -> Vec<String> {
        (0..sb.total_lines())
            .filter_map(|i| sb.line(i).map(|l| l.into_owned()))
            .collect()
    }

    #[test]
    fn test_text_lines_and_pending() {
        let mut sb = Scrollback::new(Mode::Text, 80, 10, Eol::CrLf);
        sb.append(b"AB\r\nC").unwrap();
        sb.append(b"D").unwrap();
        assert_eq!(lines(&sb), vec!["AB", "CD"]);
        assert_eq!(sb.raw, b"AB\r\nCD");
    }

    #[test]
    fn test_line_starts_strictly_increase() {
        let mut sb = Scrollback::new(Mode::Text, 80, 10, Eol::Lf);
        sb.append(b"\n\nx\n").unwrap();
        assert!(sb.line_starts.windows(2).all(|w| w[0] < w[1]));
        assert!(sb.formatted.len() >= *sb.line_starts.last().unwrap());
        assert_eq!(lines(&sb), vec!["", "", "x"]);
    }

    #[test]
    fn test_exact_fill_finalizes_once() {
        let mut sb = Scrollback::new(Mode::Raw, 12, 10, Eol::Lf);
        sb.append(&[1, 2, 3, 4]).unwrap();
        assert_eq!(sb.finalized_lines(), 1);
        assert!(!sb.has_pending());
        assert_eq!(sb.total_lines(), 1);
    }

    #[test]
    fn test_set_mode_is_idempotent() {
        let mut sb = Scrollback::new(Mode::Text, 20, 5, Eol::Lf);
        sb.append(b"hello\nworld\x01\x02 and more text\n").unwrap();
        sb.set_mode(Mode::Hexdump).unwrap();
        let once = (sb.formatted.clone(), sb.line_starts.clone());
        sb.set_mode(Mode::Hexdump).unwrap();
        assert_eq!((sb.formatted.clone(), sb.line_starts.clone()), once);
    }

    #[test]
    fn test_mode_switch_rebuilds_from_raw() {
        let mut sb = Scrollback::new(Mode::Text, 80, 5, Eol::Lf);
        sb.append(b"A\n").unwrap();
        sb.set_mode(Mode::Raw).unwrap();
        assert_eq!(lines(&sb), vec!["41 0A "]);
        sb.set_mode(Mode::Text).unwrap();
        assert_eq!(lines(&sb), vec!["A"]);
    }

    #[test]
    fn test_hexdump_shows_pending_row() {
        let mut sb = Scrollback::new(Mode::Hexdump, 20, 5, Eol::Lf);
        sb.append(&[0x41, 0x0A, 0x7F]).unwrap();
        let visible = sb.visible();
        assert_eq!(visible.len(), 1);
        assert!(visible[0].starts_with("00000000  41 0A 7F "));
        assert!(visible[0].ends_with("A.."));
    }

    #[test]
    fn test_follows_tail_only_when_at_tail() {
        let mut sb = Scrollback::new(Mode::Text, 80, 4, Eol::Lf);
        for i in 0..10 {
            sb.append(format!("line{}\n", i).as_bytes()).unwrap();
        }
        assert_eq!(sb.first_visible(), 6);
        assert_eq!(sb.visible().last().map(|l| l.to_string()), Some("line9".to_string()));

        sb.scroll(3, ScrollDirection::Up);
        assert_eq!(sb.first_visible(), 3);
        sb.append(b"line10\n").unwrap();
        assert_eq!(sb.first_visible(), 3);
    }

    #[test]
    fn test_scroll_clamps() {
        let mut sb = Scrollback::new(Mode::Text, 80, 4, Eol::Lf);
        for i in 0..10 {
            sb.append(format!("{}\n", i).as_bytes()).unwrap();
        }
        sb.scroll(100, ScrollDirection::Up);
        assert_eq!(sb.first_visible(), 0);
        sb.scroll(100, ScrollDirection::Down);
        assert_eq!(sb.first_visible(), 8);
        assert_eq!(sb.visible().len(), 2);
        sb.scroll(0, ScrollDirection::Up);
        assert_eq!(sb.first_visible(), 0);
        sb.scroll(0, ScrollDirection::Down);
        assert_eq!(sb.first_visible(), 6);
    }

    #[test]
    fn test_width_change_rewraps() {
        let mut sb = Scrollback::new(Mode::Raw, 30, 10, Eol::Lf);
        sb.append(&[0u8; 20]).unwrap();
        assert_eq!(sb.total_lines(), 2);
        sb.set_width(15).unwrap();
        assert_eq!(sb.total_lines(), 4);
        assert!(sb.is_at_tail());
    }

    #[test]
    fn test_taller_view_stays_on_tail() {
        let mut sb = Scrollback::new(Mode::Text, 80, 4, Eol::Lf);
        for i in 0..10 {
            sb.append(format!("line{}\n", i).as_bytes()).unwrap();
        }
        sb.resize(80, 8).unwrap();
        assert_eq!(sb.first_visible(), 2);
        assert_eq!(sb.visible().len(), 8);

        sb.scroll(1, ScrollDirection::Up);
        sb.resize(80, 4).unwrap();
        assert_eq!(sb.first_visible(), 1);
    }

    #[test]
    fn test_resize_to_new_width_rewraps() {
        let mut sb = Scrollback::new(Mode::Raw, 30, 10, Eol::Lf);
        sb.append(&[0u8; 20]).unwrap();
        sb.resize(15, 10).unwrap();
        assert_eq!(sb.total_lines(), 4);
    }

    #[test]
    fn test_rendered_text_grows_by_policy() {
        let mut buf = String::new();
        let row = "x".repeat(44);
        push_text(&mut buf, &row).unwrap();
        assert_eq!(buf, row);
        assert!(buf.capacity() >= 44 + MIN_GROWTH);

        let mut sb = Scrollback::new(Mode::Hexdump, 43, 5, Eol::Lf);
        for b in 0..64u8 {
            sb.append(&[b]).unwrap();
        }
        assert_eq!(sb.total_lines(), 8);
        assert!(sb.formatted.capacity() >= sb.formatted.len());
    }

    #[test]
    fn test_growth_policy() {
        assert_eq!(next_capacity(0, 0, 10), 10 + MIN_GROWTH);
        assert_eq!(next_capacity(100_000, 99_000, 10), 200_000);
        let mut sb = Scrollback::new(Mode::Text, 80, 10, Eol::Lf);
        sb.append(&vec![b'x'; 3 * MIN_GROWTH]).unwrap();
        assert!(sb.raw.capacity() >= 3 * MIN_GROWTH);
    }
}
