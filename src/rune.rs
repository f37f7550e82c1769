//! Single code point UTF-8 decoding.
//!
//! Only the structure of a sequence is checked. Overlong encodings,
//! surrogates, and values above U+10FFFF decode without complaint.

use thiserror::Error;

/// A decoded code point.
pub type Rune = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("byte 0x{0:02x} cannot start a UTF-8 sequence")]
    InvalidLead(u8),
    #[error("byte 0x{0:02x} is not a UTF-8 continuation byte")]
    BadContinuation(u8),
    #[error("sequence needs {needed} bytes, only {remaining} remain")]
    Truncated { needed: usize, remaining: usize },
}

const CONTINUATION_MASK: u8 = 0b1100_0000;
const CONTINUATION_TAG: u8 = 0b1000_0000;

/// Sequence length announced by a leading byte, with the mask of its payload bits.
fn sequence_of(lead: u8) -> Option<(usize, u8)> {
    match lead {
        0x00..=0x7f => Some((1, 0b0111_1111)),
        _ if lead & 0b1110_0000 == 0b1100_0000 => Some((2, 0b0001_1111)),
        _ if lead & 0b1111_0000 == 0b1110_0000 => Some((3, 0b0000_1111)),
        _ if lead & 0b1111_1000 == 0b1111_0000 => Some((4, 0b0000_0111)),
        _ => None,
    }
}

/// Decodes the code point at the start of `bytes`.
///
/// Returns the rune and the number of bytes it occupies. On failure nothing
/// is consumed.
pub fn decode(bytes: &[u8]) -> Result<(Rune, usize), DecodeError> {
    let Some(&lead) = bytes.first() else {
        return Err(DecodeError::Truncated {
            needed: 1,
            remaining: 0,
        });
    };
    let (len, mask) = sequence_of(lead).ok_or(DecodeError::InvalidLead(lead))?;
    if bytes.len() < len {
        return Err(DecodeError::Truncated {
            needed: len,
            remaining: bytes.len(),
        });
    }

    let mut rune = Rune::from(lead & mask);
    for &byte in &bytes[1..len] {
        if byte & CONTINUATION_MASK != CONTINUATION_TAG {
            return Err(DecodeError::BadContinuation(byte));
        }
        rune = (rune << 6) | Rune::from(byte & !CONTINUATION_MASK);
    }
    Ok((rune, len))
}
