// Decompression of stored capture documents

use crate::core::error::{DropletError, Result};
use flate2::read::{GzDecoder, ZlibDecoder};
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Gzip,
    Zlib,
    Lz4,
    Zstd,
}

impl CompressionType {
    /// Picks the codec from the file extension; anything unknown is read as-is.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => CompressionType::Gzip,
            Some("zlib") => CompressionType::Zlib,
            Some("lz4") => CompressionType::Lz4,
            Some("zst") => CompressionType::Zstd,
            _ => CompressionType::None,
        }
    }
}

pub fn decompress(data: &[u8], compression: CompressionType) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),

        CompressionType::Gzip => {
            let mut decoder = GzDecoder::new(data);
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| DropletError::DecompressionFailed(format!("Gzip: {}", e)))?;
            Ok(decompressed)
        }

        CompressionType::Zlib => {
            let mut decoder = ZlibDecoder::new(data);
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| DropletError::DecompressionFailed(format!("Zlib: {}", e)))?;
            Ok(decompressed)
        }

        #[cfg(feature = "lz4")]
        CompressionType::Lz4 => {
            let mut decoder = lz4::Decoder::new(data)
                .map_err(|e| DropletError::DecompressionFailed(format!("LZ4: {}", e)))?;
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| DropletError::DecompressionFailed(format!("LZ4: {}", e)))?;
            Ok(decompressed)
        }

        #[cfg(not(feature = "lz4"))]
        CompressionType::Lz4 => Err(DropletError::UnsupportedCompression("lz4".to_string())),

        #[cfg(feature = "zstd")]
        CompressionType::Zstd => zstd::decode_all(data)
            .map_err(|e| DropletError::DecompressionFailed(format!("Zstd: {}", e))),

        #[cfg(not(feature = "zstd"))]
        CompressionType::Zstd => Err(DropletError::UnsupportedCompression("zstd".to_string())),
    }
}
