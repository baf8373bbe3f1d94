//! Decoding raw expression bytes.
//!
//! Labels are resolved the way browsers resolve a `charset` parameter, so
//! `latin1`, `windows-1252`, `shift_jis`, `utf-16` and friends all work. A
//! byte order mark takes precedence over the label and is stripped.

use std::borrow::Cow;

use encoding_rs::{DecoderResult, Encoding};

use crate::error::{FilterError, LexError};

fn invalid(position: usize, label: &str) -> FilterError {
    FilterError::Lex(LexError {
        position,
        expected: format!("valid {} text", label),
        found: None,
    })
}

/// Byte offset of the first malformed sequence in `body`.
fn malformed_at(encoding: &'static Encoding, body: &[u8]) -> Option<usize> {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut out = String::with_capacity(
        decoder
            .max_utf8_buffer_length_without_replacement(body.len())
            .unwrap_or(body.len()),
    );
    let mut read = 0;
    loop {
        let (result, consumed) = decoder.decode_to_string_without_replacement(&body[read..], &mut out, true);
        read += consumed;
        match result {
            DecoderResult::InputEmpty => return None,
            DecoderResult::Malformed(bad, after) => {
                return Some(read - usize::from(after) - usize::from(bad));
            }
            DecoderResult::OutputFull => out.reserve(body.len() - read + 16),
        }
    }
}

/// Decode expression bytes. `None` means UTF-8.
///
/// Unknown labels are [`FilterError::UnsupportedEncoding`]; malformed input
/// is a [`LexError`] at the offending byte offset.
pub fn decode<'a>(bytes: &'a [u8], encoding: Option<&str>) -> Result<Cow<'a, str>, FilterError> {
    let label = encoding.unwrap_or("utf-8").trim();
    let labelled = match Encoding::for_label(label.as_bytes()) {
        Some(enc) if enc != encoding_rs::REPLACEMENT => enc,
        _ => return Err(FilterError::UnsupportedEncoding(label.to_string())),
    };
    let (enc, bom_len) = Encoding::for_bom(bytes).unwrap_or((labelled, 0));
    let body = &bytes[bom_len..];

    // The WHATWG table maps ASCII onto windows-1252; keep ASCII strict.
    if bom_len == 0 && (label.eq_ignore_ascii_case("us-ascii") || label.eq_ignore_ascii_case("ascii")) {
        if let Some(pos) = body.iter().position(|b| !b.is_ascii()) {
            return Err(invalid(pos, label));
        }
    }

    match enc.decode_without_bom_handling_and_without_replacement(body) {
        Some(text) => Ok(text),
        None => {
            let pos = malformed_at(enc, body).unwrap_or(0);
            Err(invalid(bom_len + pos, enc.name()))
        }
    }
}
