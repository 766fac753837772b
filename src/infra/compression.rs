//! Zlib framing for loose objects.

use crate::error::{Error, Result};

/// Deflate level used for every object written to the store.
const LEVEL: u8 = 6;

/// Deflates `data` inside a zlib wrapper.
pub fn compress(data: &[u8]) -> Vec<u8> {
    miniz_oxide::deflate::compress_to_vec_zlib(data, LEVEL)
}

/// Inflates a zlib stream.
///
/// # Errors
///
/// Returns `Error::DecompressionFailed` when the header is not a DEFLATE
/// zlib header or the stream is corrupt or truncated.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    match data {
        [cmf, flg, ..] if is_zlib_header(*cmf, *flg) => {
            miniz_oxide::inflate::decompress_to_vec_zlib(data)
                .map_err(|_| Error::DecompressionFailed)
        }
        _ => Err(Error::DecompressionFailed),
    }
}

/// CM must be 8 (DEFLATE), CINFO at most 7, and `(CMF << 8 | FLG) % 31 == 0`.
fn is_zlib_header(cmf: u8, flg: u8) -> bool {
    cmf & 0x0F == 8 && cmf >> 4 <= 7 && (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_then_decompress() {
        let original = b"blob 2\0hi";
        let decompressed = decompress(&compress(original)).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_compress_empty() {
        assert_eq!(decompress(&compress(b"")).unwrap(), b"");
    }

    #[test]
    fn test_decompress_rejects_short_input() {
        assert!(matches!(decompress(&[]), Err(Error::DecompressionFailed)));
        assert!(matches!(decompress(&[0x78]), Err(Error::DecompressionFailed)));
    }

    #[test]
    fn test_decompress_rejects_truncated_stream() {
        let compressed = compress(b"some longer content that spans more than a few bytes");
        let half = &compressed[..compressed.len() / 2];
        assert!(matches!(decompress(half), Err(Error::DecompressionFailed)));
    }

    #[test]
    fn test_zlib_header_validation() {
        assert!(is_zlib_header(0x78, 0x9C));
        assert!(is_zlib_header(0x78, 0x01));
        assert!(is_zlib_header(0x78, 0xDA));
        assert!(!is_zlib_header(0x79, 0x9C));
        assert!(!is_zlib_header(0x88, 0x00));
        assert!(!is_zlib_header(0x78, 0x00));
    }

    #[test]
    fn test_repetitive_data_shrinks() {
        let original = vec![b'a'; 1000];
        assert!(compress(&original).len() < original.len());
    }
}
