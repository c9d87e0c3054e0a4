use crate::error::{DecompressError, ProcessError, ProcessErrorKind};
use crate::stream::{CompressionSession, Envelope, Status, Z_NEED_DICT};

/// Smallest amount the output buffer grows by.
const MIN_GROWTH: usize = 512;

/// Inflates a complete gzip or zlib payload.
///
/// The envelope is detected from the payload header. Empty input yields
/// empty output without touching the codec. Corrupt or truncated input is
/// always an error; partially inflated output is never returned.
///
/// ```
/// use http_payload_compression::decompress;
///
/// assert!(decompress(b"").unwrap().is_empty());
/// assert!(decompress(b"not compressed").is_err());
/// ```
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, DecompressError> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let mut session = CompressionSession::inflate(Envelope::Auto)?;
    let mut output = OutputBuffer::with_len(input.len().saturating_mul(2));
    let growth = (input.len() / 2).max(MIN_GROWTH);

    let result = inflate_into(&mut session, input, &mut output, growth);
    session.finalize();

    match result {
        Ok(()) => Ok(output.into_vec()),
        Err(e) => {
            tracing::debug!(
                kind = %e.kind(),
                message = e.message(),
                input_len = input.len(),
                "decompression failed"
            );
            Err(e.into())
        }
    }
}

fn inflate_into(
    session: &mut CompressionSession,
    input: &[u8],
    output: &mut OutputBuffer,
    growth: usize,
) -> Result<(), ProcessError> {
    let mut consumed = 0;
    loop {
        if output.is_full() {
            output.grow(growth);
        }

        let step = session.step(&input[consumed..], output.spare_mut())?;
        consumed += step.consumed;
        output.advance(step.produced);

        match step.status {
            Status::Ok => continue,
            Status::StreamEnd => return Ok(()),
            Status::NeedDict => {
                return Err(ProcessError::new(
                    ProcessErrorKind::Unknown(Z_NEED_DICT),
                    "stream requires a preset dictionary",
                ));
            }
        }
    }
}

/// A growable byte buffer the codec writes into through a bounded slice.
#[derive(Debug)]
struct OutputBuffer {
    buf: Vec<u8>,
    filled: usize,
}

impl OutputBuffer {
    fn with_len(len: usize) -> Self {
        Self {
            buf: vec![0; len],
            filled: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.filled >= self.buf.len()
    }

    /// Makes room for `additional` more bytes.
    fn grow(&mut self, additional: usize) {
        self.buf.resize(self.buf.len() + additional, 0);
    }

    fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.filled..]
    }

    fn advance(&mut self, n: usize) {
        debug_assert!(self.filled + n <= self.buf.len());
        self.filled += n;
    }

    fn into_vec(mut self) -> Vec<u8> {
        self.buf.truncate(self.filled);
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use flate2::Compression;
    use std::io::Write;

    const SONNET: &str = "Shall I compare thee to a summer's day? Thou art more lovely and more temperate: Rough winds do shake the darling buds of May, And summer's lease hath all too short a date:";

    const SONNET_GZIP: &str = "H4sIAAAAAAAAAz2OMQ4CMQwEv7IdDS+gQZQUNMAHDDHnE058ShxQfo8PJBpLlndmfRFSxRF3ywtVhgvHMBBaz5nrpiHR2OMq1kHVkS1Sai/WASrptzvnhSs573C2Pgnec0lBGprQ82sNTdW5TLj1uNgDJxpbHMLwL1KmxhBywfqU24pbdFLA4f4Atgml9qwAAAA=";

    const SONNET_DEFLATE: &str = "eJw9jjEOAjEMBL+yHQ0voEGUFDTABwwx5xNOfEocUH6PDyQaS5Z3Zn0RUsURd8sLVYYLxzAQWs+Z66Yh0djjKtZB1ZEtUmov1gEq6bc754UrOe9wtj4J3nNJQRqa0PNrDU3VuUy49bjYAycaWxzC8C9SpsYQcsH6lNuKW3RSwOH+AJYbPMU=";

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decompress(&[]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_gzip_fixture() {
        let compressed = STANDARD.decode(SONNET_GZIP).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), SONNET.as_bytes());
    }

    #[test]
    fn test_deflate_fixture() {
        let compressed = STANDARD.decode(SONNET_DEFLATE).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), SONNET.as_bytes());
    }

    #[test]
    fn test_highly_compressible_payload_grows_buffer() {
        // Inflates to far more than twice the compressed size.
        let original = vec![b'a'; 1_000_000];
        let compressed = gzip(&original);
        assert!(compressed.len() * 2 < original.len());
        assert_eq!(decompress(&compressed).unwrap(), original);
    }

    #[test]
    fn test_zlib_payload() {
        let original = b"hello hello hello hello hello".repeat(40);
        assert_eq!(decompress(&zlib(&original)).unwrap(), original);
    }

    #[test]
    fn test_output_is_exact_length() {
        // Incompressible-ish input inflates to less than the initial guess.
        let original: Vec<u8> = (0..=255u8).collect();
        let decoded = decompress(&gzip(&original)).unwrap();
        assert_eq!(decoded.len(), original.len());
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_garbage_is_data_error() {
        let err = decompress(b"this is certainly not compressed data").unwrap_err();
        assert_eq!(err.process_kind(), Some(ProcessErrorKind::Data));
        assert!(!err.message().is_empty());
    }

    #[test]
    fn test_corrupt_gzip_body_is_data_error() {
        let mut compressed = gzip(&b"some payload worth compressing ".repeat(20));
        // Keep the header, scribble over the deflate data.
        for byte in compressed.iter_mut().skip(10).take(8) {
            *byte = 0xff;
        }
        let err = decompress(&compressed).unwrap_err();
        assert_eq!(err.process_kind(), Some(ProcessErrorKind::Data));
    }

    #[test]
    fn test_bad_checksum_is_data_error() {
        let mut compressed = zlib(b"checksummed payload");
        let last = compressed.len() - 1;
        compressed[last] ^= 0xff;
        let err = decompress(&compressed).unwrap_err();
        assert_eq!(err.process_kind(), Some(ProcessErrorKind::Data));
    }

    #[test]
    fn test_truncated_input_is_buffer_error() {
        let compressed = gzip(&b"truncated payload ".repeat(50));
        let truncated = &compressed[..compressed.len() / 2];
        let err = decompress(truncated).unwrap_err();
        assert_eq!(err.process_kind(), Some(ProcessErrorKind::Buffer));
    }

    #[test]
    fn test_output_buffer_growth() {
        let mut buffer = OutputBuffer::with_len(4);
        buffer.spare_mut().copy_from_slice(b"abcd");
        buffer.advance(4);
        assert!(buffer.is_full());

        buffer.grow(2);
        assert!(!buffer.is_full());
        assert_eq!(buffer.spare_mut().len(), 2);
        buffer.spare_mut()[0] = b'e';
        buffer.advance(1);
        assert_eq!(buffer.into_vec(), b"abcde");
    }
}
