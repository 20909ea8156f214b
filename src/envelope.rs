//! Text envelope: gzip, then standard base64.
//!
//! Encoding always pads. Decoding accepts input with or without trailing `=`.

use crate::codec::CodecError;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Characters dropped from pasted text before base64 decoding.
const STRIPPED: [char; 5] = ['`', ' ', '\n', '\r', '\t'];

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Copy)]
pub struct Envelope {
    pub level: Compression,
}

impl Default for Envelope {
    fn default() -> Self {
        Envelope {
            level: Compression::new(6),
        }
    }
}

impl Envelope {
    pub fn new(level: Compression) -> Self {
        Envelope { level }
    }

    pub fn compress(&self, bytes: &[u8]) -> Result<String, CodecError> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 2 + 32), self.level);
        encoder.write_all(bytes)?;
        let gz = encoder.finish()?;
        tracing::debug!(raw = bytes.len(), compressed = gz.len(), "compressed envelope");
        Ok(STANDARD.encode(gz))
    }

    #[tracing::instrument(skip(self, text), fields(len = text.len()))]
    pub fn decompress(&self, text: &str) -> Result<Vec<u8>, CodecError> {
        let cleaned: String = text.chars().filter(|c| !STRIPPED.contains(c)).collect();
        let gz = LENIENT
            .decode(cleaned.as_bytes())
            .map_err(|e| CodecError::Decompress(format!("base64: {}", e)))?;
        if gz.is_empty() {
            return Err(CodecError::Decompress("empty envelope".to_string()));
        }
        // Every byte must belong to a gzip member; trailing garbage fails the next header.
        let mut out = Vec::new();
        MultiGzDecoder::new(gz.as_slice())
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Decompress(format!("gzip: {}", e)))?;
        tracing::debug!(compressed = gz.len(), raw = out.len(), "decompressed envelope");
        Ok(out)
    }
}

/// Compress with the default [`Envelope`].
pub fn compress(bytes: &[u8]) -> Result<String, CodecError> {
    Envelope::default().compress(bytes)
}

pub fn decompress(text: &str) -> Result<Vec<u8>, CodecError> {
    Envelope::default().decompress(text)
}
