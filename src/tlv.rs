//! TLV codec for Tagnet name and help segments.
//!
//! Every segment on the wire is `[kind:1][length:1][payload:length]`, with
//! kind `1` for strings and kind `2` for integers. A path is a plain
//! concatenation of segments with no outer header.

use std::fmt;

/// Kind tag for string segments
pub const TLV_STRING: u8 = 1;

/// Kind tag for integer segments
pub const TLV_INTEGER: u8 = 2;

/// Header size (kind + length)
const TLV_HEADER_LEN: usize = 2;

/// One path component or help string.
///
/// Equality is by kind and value, never by encoded width.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NameSegment {
    String(Vec<u8>),
    Integer(u8),
}

impl NameSegment {
    /// Build a string segment from anything byte-like
    pub fn string(value: impl AsRef<[u8]>) -> Self {
        NameSegment::String(value.as_ref().to_vec())
    }

    pub fn is_string(&self) -> bool {
        matches!(self, NameSegment::String(_))
    }

    /// Kind tag this segment encodes with
    pub fn kind(&self) -> u8 {
        match self {
            NameSegment::String(_) => TLV_STRING,
            NameSegment::Integer(_) => TLV_INTEGER,
        }
    }

    /// Number of bytes `encode` will produce
    pub fn encoded_len(&self) -> usize {
        match self {
            NameSegment::String(bytes) => TLV_HEADER_LEN + bytes.len(),
            NameSegment::Integer(_) => TLV_HEADER_LEN + 1,
        }
    }
}

impl fmt::Display for NameSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameSegment::String(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            NameSegment::Integer(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for NameSegment {
    fn from(s: &str) -> Self {
        NameSegment::string(s)
    }
}

impl From<u8> for NameSegment {
    fn from(v: u8) -> Self {
        NameSegment::Integer(v)
    }
}

/// Why a buffer failed to decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Malformation {
    /// Fewer than two header bytes left
    Truncated,
    /// Declared length runs past the end of the buffer
    Overrun { declared: usize, remaining: usize },
    UnknownKind(u8),
    /// Integer payload that does not fit the schema's one-byte integers
    IntegerWidth(usize),
}

impl fmt::Display for Malformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Malformation::Truncated => write!(f, "truncated header"),
            Malformation::Overrun {
                declared,
                remaining,
            } => write!(
                f,
                "declared length {} exceeds {} remaining bytes",
                declared, remaining
            ),
            Malformation::UnknownKind(kind) => write!(f, "unknown kind tag {}", kind),
            Malformation::IntegerWidth(width) => {
                write!(f, "unsupported integer width {}", width)
            }
        }
    }
}

/// Codec errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TlvError {
    #[error("malformed TLV at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: Malformation },
    #[error("string segment of {0} bytes does not fit a one-byte length")]
    TooLong(usize),
}

impl TlvError {
    fn malformed(offset: usize, reason: Malformation) -> Self {
        TlvError::Malformed { offset, reason }
    }

    /// Re-base the offset of an error found inside a sub-slice
    fn shifted(self, by: usize) -> Self {
        match self {
            TlvError::Malformed { offset, reason } => TlvError::Malformed {
                offset: offset + by,
                reason,
            },
            other => other,
        }
    }
}

/// Decode one segment from the front of `bytes`.
///
/// Returns the segment and the number of bytes consumed.
pub fn decode(bytes: &[u8]) -> Result<(NameSegment, usize), TlvError> {
    if bytes.len() < TLV_HEADER_LEN {
        return Err(TlvError::malformed(0, Malformation::Truncated));
    }

    let kind = bytes[0];
    let declared = bytes[1] as usize;
    let remaining = bytes.len() - TLV_HEADER_LEN;
    if declared > remaining {
        return Err(TlvError::malformed(
            1,
            Malformation::Overrun {
                declared,
                remaining,
            },
        ));
    }

    let payload = &bytes[TLV_HEADER_LEN..TLV_HEADER_LEN + declared];
    let segment = match kind {
        TLV_STRING => NameSegment::String(payload.to_vec()),
        TLV_INTEGER => match payload {
            [v] => NameSegment::Integer(*v),
            _ => {
                return Err(TlvError::malformed(
                    TLV_HEADER_LEN,
                    Malformation::IntegerWidth(declared),
                ))
            }
        },
        other => return Err(TlvError::malformed(0, Malformation::UnknownKind(other))),
    };

    Ok((segment, TLV_HEADER_LEN + declared))
}

/// Append the encoding of `segment` to `out`
pub fn encode_into(segment: &NameSegment, out: &mut Vec<u8>) -> Result<(), TlvError> {
    let payload: &[u8] = match segment {
        NameSegment::String(bytes) => bytes,
        NameSegment::Integer(v) => std::slice::from_ref(v),
    };
    let len = u8::try_from(payload.len()).map_err(|_| TlvError::TooLong(payload.len()))?;
    out.push(segment.kind());
    out.push(len);
    out.extend_from_slice(payload);
    Ok(())
}

/// Encode a single segment
pub fn encode(segment: &NameSegment) -> Result<Vec<u8>, TlvError> {
    let mut out = Vec::with_capacity(segment.encoded_len());
    encode_into(segment, &mut out)?;
    Ok(out)
}

/// Decode a whole path: segments back to back until the buffer is exhausted.
pub fn decode_path(bytes: &[u8]) -> Result<Vec<NameSegment>, TlvError> {
    let mut segments = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let (segment, used) = decode(&bytes[offset..]).map_err(|e| e.shifted(offset))?;
        segments.push(segment);
        offset += used;
    }
    Ok(segments)
}

/// Encode a path as concatenated segments
pub fn encode_path(segments: &[NameSegment]) -> Result<Vec<u8>, TlvError> {
    let mut out = Vec::with_capacity(segments.iter().map(NameSegment::encoded_len).sum());
    for segment in segments {
        encode_into(segment, &mut out)?;
    }
    Ok(out)
}
