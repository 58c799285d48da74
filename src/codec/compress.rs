//! LZ4 compression stage.

use std::io::{Read, Write};

use tracing::debug;

use super::Compressor;

// == LZ4 Compressor ==
/// LZ4 frame compression, tuned for speed over ratio.
#[derive(Debug, Clone, Copy)]
pub struct Lz4Compressor {
    level: u32,
}

impl Lz4Compressor {
    /// Compressor at the default level (4, fast compression).
    pub fn new() -> Self {
        Self { level: 4 }
    }

    /// Compressor at an explicit level.
    pub fn with_level(level: u32) -> Self {
        Self { level }
    }
}

impl Default for Lz4Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor for Lz4Compressor {
    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut encoder = lz4::EncoderBuilder::new()
            .level(self.level)
            .build(Vec::new())?;

        encoder.write_all(data)?;
        let (compressed, result) = encoder.finish();
        result?;

        debug!(
            "LZ4 compressed: {} → {} bytes",
            data.len(),
            compressed.len()
        );
        Ok(compressed)
    }

    fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut decoder = lz4::Decoder::new(data)?;
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;

        debug!(
            "LZ4 decompressed: {} → {} bytes",
            data.len(),
            decompressed.len()
        );
        Ok(decompressed)
    }
}
