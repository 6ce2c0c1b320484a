//! License payload compression.
//!
//! EULA texts can run to tens of kilobytes, so they are stored gzip-compressed.

use std::io::{self, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Compression level for stored payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    /// Fast compression (zlib level 1).
    Fast,
    /// Balanced compression (zlib level 6).
    #[default]
    Balanced,
    /// Maximum compression (zlib level 9).
    Max,
}

impl From<CompressionLevel> for Compression {
    fn from(level: CompressionLevel) -> Self {
        match level {
            CompressionLevel::Fast => Compression::new(1),
            CompressionLevel::Balanced => Compression::new(6),
            CompressionLevel::Max => Compression::new(9),
        }
    }
}

/// Turns text into a byte payload and back.
pub trait Compressor {
    /// Compress `text` into an opaque payload.
    fn compress(&self, text: &str) -> io::Result<Vec<u8>>;

    /// Recover the text from a payload produced by [`Compressor::compress`].
    fn decompress(&self, payload: &[u8]) -> io::Result<String>;
}

/// gzip-backed [`Compressor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipCompressor {
    level: CompressionLevel,
}

impl GzipCompressor {
    /// Create a compressor using the given level.
    pub fn new(level: CompressionLevel) -> Self {
        Self { level }
    }

    /// The configured compression level.
    pub fn level(&self) -> CompressionLevel {
        self.level
    }
}

impl Compressor for GzipCompressor {
    fn compress(&self, text: &str) -> io::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), self.level.into());
        encoder.write_all(text.as_bytes())?;
        encoder.finish()
    }

    fn decompress(&self, payload: &[u8]) -> io::Result<String> {
        let mut text = String::new();
        GzDecoder::new(payload).read_to_string(&mut text)?;
        Ok(text)
    }
}

impl<C: Compressor + ?Sized> Compressor for &C {
    fn compress(&self, text: &str) -> io::Result<Vec<u8>> {
        (**self).compress(text)
    }

    fn decompress(&self, payload: &[u8]) -> io::Result<String> {
        (**self).decompress(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_roundtrip() {
        let text = "END USER LICENSE AGREEMENT\n\nIMPORTANT: PLEASE READ ".repeat(50);
        let gz = GzipCompressor::default();
        let payload = gz.compress(&text).unwrap();

        assert!(payload.len() < text.len());
        // gzip magic
        assert_eq!(&payload[..2], &[0x1f, 0x8b]);
        assert_eq!(gz.decompress(&payload).unwrap(), text);
    }

    #[test]
    fn test_empty_text_still_produces_payload() {
        let payload = GzipCompressor::default().compress("").unwrap();
        assert!(!payload.is_empty());
    }

    #[test]
    fn test_levels() {
        let text = "a".repeat(10_000);
        for level in [CompressionLevel::Fast, CompressionLevel::Balanced, CompressionLevel::Max] {
            let gz = GzipCompressor::new(level);
            assert_eq!(gz.level(), level);
            let payload = gz.compress(&text).unwrap();
            assert_eq!(gz.decompress(&payload).unwrap(), text);
        }
    }

    #[test]
    fn test_decompress_garbage_fails() {
        assert!(GzipCompressor::default().decompress(b"not gzip").is_err());
    }
}
