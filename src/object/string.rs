//! Literal and hexadecimal strings.

use crate::crypto;
use crate::error::Error;
use crate::reader::Reader;
use crate::trivia::{hex_digit, is_octal_digit, is_white_space_character};
use encoding_rs::{UTF_16BE, UTF_16LE};

/// Parse a literal string starting at the opening parenthesis.
///
/// The string runs until the matching unescaped closing parenthesis.
/// Escapes follow the PDF rules: `\n \r \t \b \f \( \) \\`, one to three
/// octal digits, a backslash before an end-of-line marker joins the lines,
/// and any other escaped byte stands for itself.
pub(crate) fn parse_literal(
    r: &mut Reader<'_>,
    key: Option<&[u8]>,
) -> Result<Vec<u8>, Error> {
    let start = r.offset();
    r.forward_tag(b"(").ok_or(Error::Syntax {
        pos: start,
        detail: "expected literal string",
    })?;

    let mut out = Vec::new();
    let mut depth = 1u32;

    loop {
        let byte = r.read_byte().ok_or(Error::Syntax {
            pos: start,
            detail: "unterminated literal string",
        })?;

        match byte {
            b'(' => {
                depth += 1;
                out.push(byte);
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                out.push(byte);
            }
            b'\\' => {
                let next = r.read_byte().ok_or(Error::Syntax {
                    pos: start,
                    detail: "unterminated literal string",
                })?;

                if is_octal_digit(next) {
                    let mut value = u16::from(next - b'0');
                    for _ in 0..2 {
                        match r.eat(is_octal_digit) {
                            Some(digit) => value = value * 8 + u16::from(digit - b'0'),
                            None => break,
                        }
                    }
                    out.push(value as u8);
                } else {
                    match next {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'(' | b')' | b'\\' => out.push(next),
                        b'\r' => {
                            // Line continuation; `\r\n` counts as one marker.
                            r.eat(|b| b == b'\n');
                        }
                        b'\n' => {}
                        other => out.push(other),
                    }
                }
            }
            other => out.push(other),
        }
    }

    Ok(finish(out, key))
}

/// Parse a hex string starting at the opening angle bracket.
///
/// White space between digits is ignored; a trailing unpaired digit is
/// padded with `0`.
pub(crate) fn parse_hex(r: &mut Reader<'_>, key: Option<&[u8]>) -> Result<Vec<u8>, Error> {
    let start = r.offset();
    r.forward_tag(b"<").ok_or(Error::Syntax {
        pos: start,
        detail: "expected hex string",
    })?;

    let mut nibbles = Vec::new();

    loop {
        let byte = r.read_byte().ok_or(Error::Syntax {
            pos: start,
            detail: "unterminated hex string",
        })?;

        if byte == b'>' {
            break;
        }
        if is_white_space_character(byte) {
            continue;
        }

        match hex_digit(byte) {
            Some(digit) => nibbles.push(digit),
            None => {
                return Err(Error::Syntax {
                    pos: r.offset() - 1,
                    detail: "invalid character in hex string",
                });
            }
        }
    }

    if nibbles.len() % 2 != 0 {
        nibbles.push(0);
    }

    let out = nibbles.chunks_exact(2).map(|p| p[0] << 4 | p[1]).collect();

    Ok(finish(out, key))
}

/// Decrypt the string with the per-object key (when one is present) and
/// decode UTF-16 text tagged with a byte order mark.
fn finish(bytes: Vec<u8>, key: Option<&[u8]>) -> Vec<u8> {
    let bytes = match key {
        Some(key) if !key.is_empty() => crypto::decrypt(key, &bytes),
        _ => bytes,
    };

    decode_text(bytes)
}

/// Convert UTF-16 string content (recognized by its BOM) to UTF-8 bytes.
///
/// Strings without a BOM are returned unchanged; callers treat those as
/// PDFDocEncoding.
pub(crate) fn decode_text(bytes: Vec<u8>) -> Vec<u8> {
    if bytes.starts_with(&[0xfe, 0xff]) {
        let (text, _) = UTF_16BE.decode_without_bom_handling(&bytes[2..]);
        text.into_owned().into_bytes()
    } else if bytes.starts_with(&[0xff, 0xfe]) {
        let (text, _) = UTF_16LE.decode_without_bom_handling(&bytes[2..]);
        text.into_owned().into_bytes()
    } else {
        bytes
    }
}
