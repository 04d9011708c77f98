//! Bidirectional codecs between domain keys and shuffle keys.
//!
//! The shuffle compares and routes keys as opaque bytes. Each job names the
//! codec it uses so decoding on the reduce side is the exact inverse of the
//! map-side encoding.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::job::ShuffleKey;

#[derive(Debug)]
pub enum CodecError {
    Base64(base64::DecodeError),
    /// Decoded key is not exactly one byte
    NotSingleByte(Vec<u8>),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base64(e) => write!(f, "invalid base64 key: {e}"),
            Self::NotSingleByte(b) => write!(f, "expected one byte, got {} bytes", b.len()),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<base64::DecodeError> for CodecError {
    fn from(e: base64::DecodeError) -> Self {
        Self::Base64(e)
    }
}

/// Maps a domain key to a shuffle key and back.
///
/// `decode(&encode(k)) == k` for every `k`. Keys may be unsized (`[u8]`) so
/// map can encode borrowed input without copying it first.
pub trait KeyCodec {
    type Key: ?Sized + ToOwned;

    fn encode(&self, key: &Self::Key) -> ShuffleKey;

    fn decode(&self, raw: &[u8]) -> Result<<Self::Key as ToOwned>::Owned, CodecError>;
}

/// Single input bytes as base64.
///
/// The base64 alphabet has no whitespace or control bytes, so any byte
/// (newline, tab, NUL, half of a UTF-8 sequence) is safe to carry through
/// line-oriented shuffles.
#[derive(Debug, Default, Clone, Copy)]
pub struct CharCodec;

impl KeyCodec for CharCodec {
    type Key = u8;

    fn encode(&self, key: &u8) -> ShuffleKey {
        STANDARD.encode([*key]).into_bytes()
    }

    fn decode(&self, raw: &[u8]) -> Result<u8, CodecError> {
        match STANDARD.decode(raw)?.as_slice() {
            [b] => Ok(*b),
            other => Err(CodecError::NotSingleByte(other.to_vec())),
        }
    }
}

/// Whole lines as their raw bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineCodec;

impl KeyCodec for LineCodec {
    type Key = [u8];

    fn encode(&self, key: &[u8]) -> ShuffleKey {
        key.to_vec()
    }

    fn decode(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(raw.to_vec())
    }
}
