//! Opaque continuation token codec.
//!
//! # Responsibility
//! - Map a pagination position (sort-key parts + optional total) to a
//!   URL-safe string and back.
//! - Own the token shape; no other module builds or parses tokens.
//!
//! # Invariants
//! - `decode(encode(parts, total))` yields exactly `parts` and `total`.
//! - Decoding either fully succeeds or fails; there is no partial position.
//! - Any part value round-trips, including ones that carry
//!   [`CURSOR_DELIMITER`] or [`ESCAPE_CHAR`].
//! - Only tokens minted by [`encode`]/[`encode_position`] decode; there is
//!   no whitespace or case leniency beyond what hex itself accepts.
//!
//! Token layout before hex transform:
//! `part_0 US part_1 US ... part_n US total`, where `US` is the ASCII unit
//! separator and an empty final segment means the total is unknown. Inside
//! a part, `\` is written as `\\` and `US` as `\u`.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Reserved separator between cursor segments.
pub const CURSOR_DELIMITER: char = '\u{1f}';

/// Escape prefix for reserved characters inside a part.
pub const ESCAPE_CHAR: char = '\\';

const ESCAPED_DELIMITER: char = 'u';

/// Result of decoding a cursor token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedCursor {
    /// Resume position without a cached total; callers must re-count.
    Position { parts: Vec<String> },
    /// Resume position with the total captured when the token was minted.
    Snapshot { parts: Vec<String>, total: u64 },
}

impl DecodedCursor {
    pub fn parts(&self) -> &[String] {
        match self {
            Self::Position { parts } | Self::Snapshot { parts, .. } => parts,
        }
    }

    pub fn total(&self) -> Option<u64> {
        match self {
            Self::Position { .. } => None,
            Self::Snapshot { total, .. } => Some(*total),
        }
    }

    pub fn into_parts(self) -> (Vec<String>, Option<u64>) {
        match self {
            Self::Position { parts } => (parts, None),
            Self::Snapshot { parts, total } => (parts, Some(total)),
        }
    }
}

/// Cursor decode failures. All of them are client-input errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    /// Token is not valid hex, is not UTF-8, or has a bad escape.
    InvalidEncoding,
    /// Decoded payload has no segment separator.
    MissingDelimiter,
    /// Total segment is present but not a non-negative integer.
    InvalidTotal(String),
    /// Sort-key parts do not describe a position for this catalog.
    InvalidPosition(String),
}

impl Display for CursorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEncoding => write!(f, "cursor is not a valid encoded token"),
            Self::MissingDelimiter => write!(f, "cursor payload has no segment delimiter"),
            Self::InvalidTotal(value) => write!(f, "cursor total `{value}` is not a count"),
            Self::InvalidPosition(message) => write!(f, "cursor position is invalid: {message}"),
        }
    }
}

impl Error for CursorError {}

/// Encodes sort-key parts and a known total into an opaque token.
pub fn encode(parts: &[String], total: u64) -> String {
    encode_segments(parts, &total.to_string())
}

/// Encodes sort-key parts without a total.
///
/// A catalog receiving such a token counts its rows again.
pub fn encode_position(parts: &[String]) -> String {
    encode_segments(parts, "")
}

/// Decodes an opaque token produced by [`encode`] or [`encode_position`].
///
/// # Errors
/// - [`CursorError::InvalidEncoding`] when the hex transform cannot be
///   reversed.
/// - [`CursorError::MissingDelimiter`] when no separator is present.
/// - [`CursorError::InvalidTotal`] when the total segment is not a `u64`.
pub fn decode(cursor: &str) -> Result<DecodedCursor, CursorError> {
    let bytes = hex::decode(cursor).map_err(|_| CursorError::InvalidEncoding)?;
    let payload = String::from_utf8(bytes).map_err(|_| CursorError::InvalidEncoding)?;

    let (head, total_segment) = payload
        .rsplit_once(CURSOR_DELIMITER)
        .ok_or(CursorError::MissingDelimiter)?;
    let parts = head
        .split(CURSOR_DELIMITER)
        .map(unescape_part)
        .collect::<Result<Vec<_>, _>>()?;

    if total_segment.is_empty() {
        return Ok(DecodedCursor::Position { parts });
    }

    let total = parse_total(total_segment)?;
    Ok(DecodedCursor::Snapshot { parts, total })
}

fn encode_segments(parts: &[String], total_segment: &str) -> String {
    let mut payload = String::new();
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            payload.push(CURSOR_DELIMITER);
        }
        escape_part_into(part, &mut payload);
    }
    payload.push(CURSOR_DELIMITER);
    payload.push_str(total_segment);
    hex::encode(payload.as_bytes())
}

fn escape_part_into(part: &str, payload: &mut String) {
    for ch in part.chars() {
        match ch {
            ESCAPE_CHAR => {
                payload.push(ESCAPE_CHAR);
                payload.push(ESCAPE_CHAR);
            }
            CURSOR_DELIMITER => {
                payload.push(ESCAPE_CHAR);
                payload.push(ESCAPED_DELIMITER);
            }
            other => payload.push(other),
        }
    }
}

fn unescape_part(segment: &str) -> Result<String, CursorError> {
    let mut part = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(ch) = chars.next() {
        if ch != ESCAPE_CHAR {
            part.push(ch);
            continue;
        }
        match chars.next() {
            Some(ESCAPE_CHAR) => part.push(ESCAPE_CHAR),
            Some(ESCAPED_DELIMITER) => part.push(CURSOR_DELIMITER),
            _ => return Err(CursorError::InvalidEncoding),
        }
    }
    Ok(part)
}

// `u64::from_str` accepts a leading `+`; tokens never carry one.
fn parse_total(segment: &str) -> Result<u64, CursorError> {
    if !segment.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(CursorError::InvalidTotal(segment.to_string()));
    }
    segment
        .parse::<u64>()
        .map_err(|_| CursorError::InvalidTotal(segment.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{decode, encode, encode_position, CursorError, DecodedCursor, CURSOR_DELIMITER};

    fn parts(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn round_trip_preserves_parts_and_total() {
        let cases = [
            (parts(&["42", "Flow Gages"]), 0),
            (parts(&["7"]), 1),
            (parts(&["1", "", "x.y-z"]), u64::MAX),
            (parts(&["12", "Stage|Elev;Flow"]), 250),
        ];
        for (key, total) in cases {
            let token = encode(&key, total);
            let decoded = decode(&token).expect("encoded token should decode");
            assert_eq!(decoded, DecodedCursor::Snapshot { parts: key, total });
        }
    }

    #[test]
    fn encode_is_deterministic_and_transport_safe() {
        let key = parts(&["3", "Reservoir Elevations"]);
        let first = encode(&key, 9);
        let second = encode(&key, 9);
        assert_eq!(first, second);
        assert!(first.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn position_only_token_decodes_without_total() {
        let key = parts(&["5", "grp"]);
        let decoded = decode(&encode_position(&key)).expect("position token should decode");
        assert_eq!(decoded.total(), None);
        assert_eq!(decoded.parts(), key.as_slice());
    }

    #[test]
    fn decode_rejects_non_hex_and_truncated_tokens() {
        assert_eq!(decode("zz-not-hex"), Err(CursorError::InvalidEncoding));

        let token = encode(&parts(&["5", "grp"]), 10);
        let truncated = &token[..token.len() - 1];
        assert_eq!(decode(truncated), Err(CursorError::InvalidEncoding));
    }

    #[test]
    fn decode_rejects_payload_without_delimiter() {
        let token = hex::encode("5,grp,10");
        assert_eq!(decode(&token), Err(CursorError::MissingDelimiter));
    }

    #[test]
    fn decode_rejects_non_numeric_or_negative_total() {
        let bad = hex::encode(format!("5{CURSOR_DELIMITER}grp{CURSOR_DELIMITER}ten"));
        assert!(matches!(decode(&bad), Err(CursorError::InvalidTotal(_))));

        let negative = hex::encode(format!("5{CURSOR_DELIMITER}-3"));
        assert!(matches!(decode(&negative), Err(CursorError::InvalidTotal(_))));

        let signed = hex::encode(format!("5{CURSOR_DELIMITER}+3"));
        assert!(matches!(decode(&signed), Err(CursorError::InvalidTotal(_))));
    }

    #[test]
    fn parts_carrying_delimiter_or_escape_round_trip() {
        let key = parts(&["a\u{1f}b", "\\", "tail\\u", "\u{1f}"]);
        let token = encode(&key, 3);
        let decoded = decode(&token).expect("escaped token should decode");
        assert_eq!(decoded, DecodedCursor::Snapshot { parts: key, total: 3 });

        let position = parts(&["x\u{1f}", "y"]);
        let decoded = decode(&encode_position(&position)).expect("position should decode");
        assert_eq!(decoded.parts(), position.as_slice());
        assert_eq!(decoded.total(), None);
    }

    #[test]
    fn decode_rejects_dangling_or_unknown_escapes() {
        let dangling = hex::encode(format!("5\\{CURSOR_DELIMITER}7"));
        assert_eq!(decode(&dangling), Err(CursorError::InvalidEncoding));

        let unknown = hex::encode(format!("5\\q{CURSOR_DELIMITER}7"));
        assert_eq!(decode(&unknown), Err(CursorError::InvalidEncoding));
    }

    #[test]
    fn decode_rejects_surrounding_whitespace() {
        let token = encode(&parts(&["5", "grp"]), 10);
        assert_eq!(decode(&format!(" {token} ")), Err(CursorError::InvalidEncoding));
        assert!(decode(&token).is_ok());
    }

    #[test]
    fn decode_rejects_invalid_utf8_payload() {
        let token = hex::encode([0xff, 0xfe, 0x1f, b'1']);
        assert_eq!(decode(&token), Err(CursorError::InvalidEncoding));
    }
}
