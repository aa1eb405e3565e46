use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// Line terminator used to split inbound text and to finish outbound commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Eol {
    #[default]
    Lf,
    Cr,
    CrLf,
    LfCr,
}

impl Eol {
    pub const ALL: [Eol; 4] = [Eol::Lf, Eol::Cr, Eol::CrLf, Eol::LfCr];

    /// Resolve a configuration token (`n`, `r`, `rn`, `nr`, any case).
    pub fn resolve(token: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|eol| eol.token().eq_ignore_ascii_case(token))
            .ok_or_else(|| ConfigError::InvalidEol(token.to_string()))
    }

    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Eol::Lf => b"\n",
            Eol::Cr => b"\r",
            Eol::CrLf => b"\r\n",
            Eol::LfCr => b"\n\r",
        }
    }

    /// Escaped form for the status bar.
    pub fn display_form(&self) -> &'static str {
        match self {
            Eol::Lf => "\\n",
            Eol::Cr => "\\r",
            Eol::CrLf => "\\r\\n",
            Eol::LfCr => "\\n\\r",
        }
    }

    /// Configuration token, as accepted by [`Eol::resolve`].
    pub fn token(&self) -> &'static str {
        match self {
            Eol::Lf => "n",
            Eol::Cr => "r",
            Eol::CrLf => "rn",
            Eol::LfCr => "nr",
        }
    }
}

impl FromStr for Eol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Eol::resolve(s)
    }
}

impl fmt::Display for Eol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_form())
    }
}

/// Split `buf` on every occurrence of the terminator. The read path uses the
/// streaming [`Segmenter`]; this one-shot form backs its tests.
///
/// A stream of N lines joined by the terminator yields exactly N spans, and
/// joining the spans with the terminator gives back the original bytes.
#[cfg(test)]
pub fn segment(buf: &[u8], eol: Eol) -> Vec<&[u8]> {
    let term = eol.as_bytes();
    let mut spans = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + term.len() <= buf.len() {
        if &buf[i..i + term.len()] == term {
            spans.push(&buf[start..i]);
            i += term.len();
            start = i;
        } else {
            i += 1;
        }
    }
    spans.push(&buf[start..]);
    spans
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Byte(u8),
    Break,
}

/// Streaming line detector.
///
/// Recognizes the configured terminator even when it is split across reads.
/// A bare `\n` always breaks the line; when the terminator starts with `\n`
/// the break is reported at once and the rest of the terminator is swallowed.
#[derive(Debug, Clone)]
pub struct Segmenter {
    eol: Eol,
    held: usize,
    tail: usize,
}

impl Segmenter {
    pub fn new(eol: Eol) -> Self {
        Self { eol, held: 0, tail: 0 }
    }

    pub fn feed(&mut self, b: u8, out: &mut impl FnMut(Segment)) {
        let term = self.eol.as_bytes();

        if self.tail > 0 {
            if b == term[self.tail] {
                self.tail += 1;
                if self.tail == term.len() {
                    self.tail = 0;
                }
                return;
            }
            self.tail = 0;
        }

        if self.held > 0 {
            if b == term[self.held] {
                self.held += 1;
                if self.held == term.len() {
                    self.held = 0;
                    out(Segment::Break);
                }
                return;
            }
            for &h in &term[..self.held] {
                if h == b'\n' {
                    out(Segment::Break);
                } else {
                    out(Segment::Byte(h));
                }
            }
            self.held = 0;
        }

        if b == b'\n' {
            out(Segment::Break);
            if term[0] == b'\n' && term.len() > 1 {
                self.tail = 1;
            }
            return;
        }

        if b == term[0] {
            if term.len() == 1 {
                out(Segment::Break);
            } else {
                self.held = 1;
            }
            return;
        }

        out(Segment::Byte(b));
    }
}
