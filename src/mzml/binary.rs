//! Binary data decoding for mzML
//!
//! Peak arrays are stored as Base64 text, optionally zlib-compressed, holding
//! little-endian 32- or 64-bit floats. Decoding runs those steps in reverse.

use std::io::Read;

use base64::prelude::*;
use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;

/// Compression applied before Base64 encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionType {
    /// Raw bytes
    #[default]
    None,
    /// zlib
    Zlib,
}

/// Numeric precision of the stored values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryEncoding {
    /// 32-bit float (MS:1000521)
    Float32,
    /// 64-bit float (MS:1000523)
    #[default]
    Float64,
}

impl BinaryEncoding {
    fn byte_size(self) -> usize {
        match self {
            BinaryEncoding::Float32 => 4,
            BinaryEncoding::Float64 => 8,
        }
    }
}

/// Errors that can occur during binary decoding
#[derive(Debug, thiserror::Error)]
pub enum BinaryDecodeError {
    /// Text was not valid Base64
    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    /// zlib stream was damaged
    #[error("Decompression error: {0}")]
    DecompressionError(#[from] std::io::Error),

    /// Decoded value count or byte count does not fit
    #[error("Invalid data length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected count
        expected: usize,
        /// Actual count
        actual: usize,
    },
}

/// Decode one `<binary>` payload into f64 values.
///
/// `expected_length` comes from the spectrum's `defaultArrayLength`; a
/// mismatch means the file is truncated or corrupt.
pub fn decode_array(
    text: &str,
    encoding: BinaryEncoding,
    compression: CompressionType,
    expected_length: Option<usize>,
) -> Result<Vec<f64>, BinaryDecodeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let raw = BASE64_STANDARD.decode(trimmed)?;
    let bytes = match compression {
        CompressionType::None => raw,
        CompressionType::Zlib => {
            let mut inflated = Vec::with_capacity(raw.len() * 4);
            ZlibDecoder::new(raw.as_slice()).read_to_end(&mut inflated)?;
            inflated
        }
    };

    let width = encoding.byte_size();
    if bytes.len() % width != 0 {
        return Err(BinaryDecodeError::InvalidLength {
            expected: bytes.len() / width * width,
            actual: bytes.len(),
        });
    }

    let count = bytes.len() / width;
    let mut cursor = std::io::Cursor::new(bytes);
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let value = match encoding {
            BinaryEncoding::Float32 => f64::from(cursor.read_f32::<LittleEndian>()?),
            BinaryEncoding::Float64 => cursor.read_f64::<LittleEndian>()?,
        };
        values.push(value);
    }

    if let Some(expected) = expected_length {
        if values.len() != expected {
            return Err(BinaryDecodeError::InvalidLength {
                expected,
                actual: values.len(),
            });
        }
    }

    Ok(values)
}
