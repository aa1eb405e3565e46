use thiserror::Error;

use super::{rtu, Mode};
use crate::eol::Eol;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid input `{token}`: {reason}")]
    InvalidInput { token: String, reason: &'static str },
}

impl CodecError {
    fn invalid(token: impl Into<String>, reason: &'static str) -> Self {
        CodecError::InvalidInput {
            token: token.into(),
            reason,
        }
    }
}

/// Turn a typed command into the bytes to send.
///
/// Nothing is returned unless every token parses.
pub fn decode(line: &str, mode: Mode, eol: Eol) -> Result<Vec<u8>, CodecError> {
    let mut out = match mode {
        Mode::Text => decode_text(line)?,
        Mode::Raw => decode_raw(line)?,
        Mode::Hexdump => decode_hex(line)?,
        Mode::RtuRaw => decode_rtu(decode_raw(line)?, line)?,
        Mode::RtuHex => decode_rtu(decode_hex(line)?, line)?,
    };
    if mode.appends_eol() {
        out.extend_from_slice(eol.as_bytes());
    }
    Ok(out)
}

fn decode_rtu(frame: Vec<u8>, line: &str) -> Result<Vec<u8>, CodecError> {
    if frame.len() < 2 {
        return Err(CodecError::invalid(line.trim(), "RTU frame needs address and function bytes"));
    }
    Ok(rtu::seal(frame))
}

fn decode_text(line: &str) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            if !c.is_control() {
                let mut utf8 = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            }
            continue;
        }
        let Some(s) = chars.next() else {
            return Err(CodecError::invalid("\\", "dangling escape"));
        };
        let byte = match s {
            'a' => 0x07,
            'b' => 0x08,
            'e' => 0x1b,
            'f' => 0x0c,
            'n' => b'\n',
            'r' => b'\r',
            't' => b'\t',
            'v' => 0x0b,
            'x' => {
                let digits = take_while_max(&mut chars, 2, |c| c.is_ascii_hexdigit());
                if digits.is_empty() {
                    return Err(CodecError::invalid("\\x", "expected hex digits"));
                }
                parse_radix(&digits, 16, "\\x")?
            }
            '0'..='7' => {
                let mut digits = String::from(s);
                digits.push_str(&take_while_max(&mut chars, 2, |c| ('0'..='7').contains(&c)));
                parse_radix(&digits, 8, "\\")?
            }
            c if c.is_ascii() && !c.is_ascii_control() => c as u8,
            c => return Err(CodecError::invalid(format!("\\{}", c), "unknown escape")),
        };
        out.push(byte);
    }
    Ok(out)
}

fn take_while_max(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    max: usize,
    accept: impl Fn(char) -> bool,
) -> String {
    let mut taken = String::new();
    while taken.len() < max {
        match chars.peek() {
            Some(&c) if accept(c) => {
                taken.push(c);
                chars.next();
            }
            _ => break,
        }
    }
    taken
}

fn parse_radix(digits: &str, radix: u32, prefix: &str) -> Result<u8, CodecError> {
    u8::from_str_radix(digits, radix)
        .map_err(|_| CodecError::invalid(format!("{}{}", prefix, digits), "value does not fit in a byte"))
}

fn decode_raw(line: &str) -> Result<Vec<u8>, CodecError> {
    line.split_whitespace().map(raw_token).collect()
}

fn raw_token(token: &str) -> Result<u8, CodecError> {
    let bad = |reason| CodecError::invalid(token, reason);
    let mut chars = token.chars();
    let (Some(first), rest) = (chars.next(), chars.as_str()) else {
        return Err(bad("empty token"));
    };

    if rest.is_empty() && !first.is_ascii_digit() {
        return if first.is_ascii() { Ok(first as u8) } else { Err(bad("not a single byte")) };
    }

    let (digits, radix, max_len) = match (first, rest.chars().next()) {
        ('0', None) => return Ok(0),
        ('0', Some('x' | 'X')) => (&rest[1..], 16, 2),
        ('0', Some('b' | 'B')) => (&rest[1..], 2, 8),
        ('0', Some(_)) => (rest, 8, 3),
        ('1'..='9', _) => (token, 10, 3),
        _ => return Err(bad("expected a number or a single character")),
    };
    if digits.is_empty() || digits.len() > max_len || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(bad("malformed number"));
    }
    u8::from_str_radix(digits, radix).map_err(|_| bad("value does not fit in a byte"))
}

fn decode_hex(line: &str) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    for token in line.split_whitespace() {
        if !token.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CodecError::invalid(token, "expected hex digits"));
        }
        // A trailing odd digit stands for a single byte.
        for pair in token.as_bytes().chunks(2) {
            let digits = std::str::from_utf8(pair).map_err(|_| CodecError::invalid(token, "expected hex digits"))?;
            out.push(parse_radix(digits, 16, "")?);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode, Fragment, LineCursor};

    fn rendered(bytes: &[u8], mode: Mode) -> String {
        let mut cursor = LineCursor::new(mode, 4096, Eol::Lf);
        encode(bytes, &mut cursor)
            .into_iter()
            .map(|f| match f {
                Fragment::Text(t) => t,
                Fragment::LineEnd => String::new(),
            })
            .collect()
    }

    #[test]
    fn test_text_tab_scenario() {
        let out = decode("hello\\tworld", Mode::Text, Eol::CrLf).unwrap();
        assert_eq!(
            out,
            vec![0x68, 0x65, 0x6C, 0x6C, 0x6F, 0x09, 0x77, 0x6F, 0x72, 0x6C, 0x64, b'\r', b'\n']
        );
    }

    #[test]
    fn test_text_escapes() {
        let out = decode("\\a\\e\\x4\\x41\\101\\7\\q\\\\", Mode::Text, Eol::Lf).unwrap();
        assert_eq!(out, vec![0x07, 0x1b, 0x04, 0x41, 0x41, 0x07, b'q', b'\\', b'\n']);
    }

    #[test]
    fn test_text_rejects_bad_escapes() {
        assert!(decode("abc\\", Mode::Text, Eol::Lf).is_err());
        assert!(decode("\\xZZ", Mode::Text, Eol::Lf).is_err());
        assert!(decode("\\777", Mode::Text, Eol::Lf).is_err());
    }

    #[test]
    fn test_text_keeps_utf8_and_drops_controls() {
        let out = decode("é\u{1}", Mode::Text, Eol::Cr).unwrap();
        assert_eq!(out, vec![0xC3, 0xA9, b'\r']);
    }

    #[test]
    fn test_raw_scenario() {
        let out = decode("0x41 66 0b01000010", Mode::Raw, Eol::Lf).unwrap();
        assert_eq!(out, vec![0x41, 0x42, 0x42]);
    }

    #[test]
    fn test_raw_token_forms() {
        let out = decode("0 017 0XfF A 7 ~", Mode::Raw, Eol::Lf).unwrap();
        assert_eq!(out, vec![0, 0o17, 0xFF, b'A', 7, b'~']);
    }

    #[test]
    fn test_raw_never_partially_succeeds() {
        for bad in ["1 2 256", "0x123", "0b123", "09", "hello", "0x", "1000", "é"] {
            let err = decode(bad, Mode::Raw, Eol::Lf).unwrap_err();
            assert!(matches!(err, CodecError::InvalidInput { .. }), "{}", bad);
        }
    }

    #[test]
    fn test_hex_pairs_with_optional_spaces() {
        assert_eq!(decode("410A7f", Mode::Hexdump, Eol::Lf).unwrap(), vec![0x41, 0x0A, 0x7F]);
        assert_eq!(decode("41 0A 7F", Mode::Hexdump, Eol::Lf).unwrap(), vec![0x41, 0x0A, 0x7F]);
        assert_eq!(decode("abc", Mode::Hexdump, Eol::Lf).unwrap(), vec![0xAB, 0x0C]);
        assert!(decode("4G", Mode::Hexdump, Eol::Lf).is_err());
    }

    #[test]
    fn test_rtu_appends_crc() {
        let out = decode("01 03 00 00 00 0A", Mode::RtuHex, Eol::Lf).unwrap();
        assert_eq!(out, vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCD]);
        let out = decode("1 3 0 0 0 10", Mode::RtuRaw, Eol::Lf).unwrap();
        assert_eq!(&out[6..], &[0xC5, 0xCD]);
        assert!(decode("01", Mode::RtuHex, Eol::Lf).is_err());
    }

    #[test]
    fn test_text_round_trip_without_newlines() {
        let bytes: Vec<u8> = (0u8..=255).filter(|&b| b != b'\n').collect();
        let typed = rendered(&bytes, Mode::Text);
        let mut back = decode(&typed, Mode::Text, Eol::Lf).unwrap();
        back.pop();
        assert_eq!(back, bytes);
    }

    #[test]
    fn test_raw_and_hexdump_round_trip() {
        let bytes: Vec<u8> = (0u8..=255).rev().collect();
        let typed = rendered(&bytes, Mode::Raw);
        assert_eq!(decode(&typed, Mode::Hexdump, Eol::Lf).unwrap(), bytes);

        let mut cursor = LineCursor::new(Mode::Hexdump, 80, Eol::Lf);
        let hex: String = encode(&bytes, &mut cursor)
            .into_iter()
            .filter_map(|f| match f {
                Fragment::Text(t) => Some(t[10..10 + 16 * 3 + 1].to_string()),
                Fragment::LineEnd => None,
            })
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(decode(&hex, Mode::Hexdump, Eol::Lf).unwrap(), bytes);
    }
}
