use crate::core::error::{Error, ErrorKind, Result};
use serde::{Serialize, Deserialize};

/// Compressed block storage for segment payloads
#[derive(Serialize, Deserialize)]
pub struct CompressedBlock {
    pub data: Vec<u8>,
    pub original_size: usize,
    pub compression: CompressionType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    LZ4,      // Fast compression, ratio 2-3x
    Zstd,     // Better ratio, slower
    Snappy,   // Balanced
}

/// Payloads shorter than this are stored raw whatever codec was asked for
pub const MIN_COMPRESS_LEN: usize = 256;

impl CompressedBlock {
    pub fn compress(data: &[u8], compression: CompressionType) -> Result<Self> {
        let compression = if data.len() < MIN_COMPRESS_LEN { CompressionType::None } else { compression };
        let compressed = match compression {
            CompressionType::None => data.to_vec(),

            CompressionType::LZ4 => {
                lz4::block::compress(data, None, false)?
            }

            CompressionType::Zstd => {
                zstd::encode_all(data, 3)?  // Level 3 is balanced
            }

            CompressionType::Snappy => {
                use snap::raw::Encoder;
                let mut encoder = Encoder::new();
                encoder.compress_vec(data)
                    .map_err(|e| Error::new(ErrorKind::Io, e.to_string()))?
            }
        };

        Ok(CompressedBlock {
            data: compressed,
            original_size: data.len(),
            compression,
        })
    }

    /// Stored size over original size
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 1.0;
        }
        self.data.len() as f64 / self.original_size as f64
    }

    pub fn decompress(&self) -> Result<Vec<u8>> {
        let decompressed = match self.compression {
            CompressionType::None => self.data.clone(),

            CompressionType::LZ4 => {
                let size = i32::try_from(self.original_size)
                    .map_err(|_| Error::corrupted("LZ4 block larger than 2GiB"))?;
                lz4::block::decompress(&self.data, Some(size))
                    .map_err(|e| Error::new(ErrorKind::Corrupted, e.to_string()))?
            }

            CompressionType::Zstd => {
                zstd::decode_all(&self.data[..])
                    .map_err(|e| Error::new(ErrorKind::Corrupted, e.to_string()))?
            }

            CompressionType::Snappy => {
                use snap::raw::Decoder;
                let mut decoder = Decoder::new();
                decoder.decompress_vec(&self.data)
                    .map_err(|e| Error::new(ErrorKind::Corrupted, e.to_string()))?
            }
        };

        if decompressed.len() != self.original_size {
            return Err(Error::corrupted(format!(
                "decompressed {} bytes, expected {}",
                decompressed.len(),
                self.original_size
            )));
        }
        Ok(decompressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_codec_restores_payload() {
        let payload: Vec<u8> = b"red car fast and red ".iter().cycle().take(4096).copied().collect();
        for compression in [CompressionType::None, CompressionType::LZ4, CompressionType::Zstd, CompressionType::Snappy] {
            let block = CompressedBlock::compress(&payload, compression).unwrap();
            assert_eq!(block.decompress().unwrap(), payload, "{:?}", compression);
        }
    }

    #[test]
    fn test_small_payloads_stay_raw() {
        let block = CompressedBlock::compress(b"red car", CompressionType::Zstd).unwrap();
        assert_eq!(block.compression, CompressionType::None);
        assert_eq!(block.ratio(), 1.0);

        let payload = vec![7u8; MIN_COMPRESS_LEN * 4];
        let block = CompressedBlock::compress(&payload, CompressionType::LZ4).unwrap();
        assert_eq!(block.compression, CompressionType::LZ4);
        assert!(block.ratio() < 1.0);
    }

    #[test]
    fn test_size_mismatch_is_corruption() {
        let mut block = CompressedBlock::compress(b"abc", CompressionType::None).unwrap();
        block.original_size = 4;
        assert_eq!(block.decompress().unwrap_err().kind, ErrorKind::Corrupted);
    }
}
