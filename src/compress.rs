use crate::codec::EncodingDecision;
use crate::config::CompressionConfig;
use crate::error::{CompressError, ProcessError, ProcessErrorKind};
use crate::stream::{CompressionSession, Envelope, Status};
use bytes::{Bytes, BytesMut};

/// Outcome of [`compress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressedResult {
    /// Compression was not attempted; forward the original body unchanged.
    Skip,
    /// Compression failed; forward the original body unchanged.
    Failure(CompressError),
    /// The body was compressed.
    Compressed {
        /// The compressed body.
        bytes: Bytes,
        /// The Content-Encoding header value to send with it.
        encoding: &'static str,
    },
}

impl CompressedResult {
    /// Returns true if the body was compressed.
    pub fn is_compressed(&self) -> bool {
        matches!(self, CompressedResult::Compressed { .. })
    }
}

/// Compresses a complete response body.
///
/// Bodies at or below the configured threshold, and decisions other than
/// gzip or deflate, yield [`CompressedResult::Skip`]. Codec failures yield
/// [`CompressedResult::Failure`]; neither case is fatal to the response.
pub fn compress(
    body: &[u8],
    decision: EncodingDecision,
    config: &CompressionConfig,
) -> CompressedResult {
    let (Some(envelope), Some(encoding)) = (decision.envelope(), decision.content_encoding())
    else {
        return CompressedResult::Skip;
    };
    if body.len() <= config.threshold_bytes() {
        return CompressedResult::Skip;
    }

    match compress_with(body, envelope, config) {
        Ok(bytes) => CompressedResult::Compressed { bytes, encoding },
        Err(e) => CompressedResult::Failure(e),
    }
}

fn compress_with(
    body: &[u8],
    envelope: Envelope,
    config: &CompressionConfig,
) -> Result<Bytes, CompressError> {
    let mut session = CompressionSession::deflate(config, envelope)?;
    let chunk_size = config.chunk_size_bytes();
    let mut scratch = vec![0u8; chunk_size];
    let mut output = BytesMut::new();
    let mut consumed = 0;

    let result = loop {
        let step = match session.step(&body[consumed..], &mut scratch) {
            Ok(step) => step,
            Err(e) => break Err(e),
        };
        consumed += step.consumed;
        output.extend_from_slice(&scratch[..step.produced]);

        match step.status {
            Status::StreamEnd => break Ok(()),
            // Output is still draining into the scratch buffer.
            Status::Ok if step.produced > 0 || step.consumed > 0 => continue,
            _ => {
                break Err(ProcessError::new(
                    ProcessErrorKind::Buffer,
                    "compressor stopped making progress",
                ));
            }
        }
    };
    session.finalize();
    result?;

    Ok(output.freeze())
}
