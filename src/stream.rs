//! A stateful block-oriented codec session.
//!
//! [`CompressionSession`] wraps a deflate or inflate stream and is driven one
//! buffer at a time with [`CompressionSession::step`]. Each call reports how
//! many bytes were consumed and produced, plus the codec status. The session
//! releases its codec state in [`CompressionSession::finalize`], which also
//! runs on drop, so every exit path releases it exactly once.

use crate::config::CompressionConfig;
use crate::error::{
    InitError, InitErrorKind, ProcessError, ProcessErrorKind, UNKNOWN_CODEC_MESSAGE,
};
use flate2::{Decompress, FlushDecompress};
use zlib_rs::{Deflate, DeflateConfig, DeflateError, DeflateFlush, Method};

/// Base-two logarithm of the largest DEFLATE window.
pub const MAX_WINDOW_BITS: u8 = 15;

/// Added to the window bits to select a gzip envelope.
const GZIP_WINDOW_OFFSET: u8 = 16;

/// Added to the window bits to accept either envelope when inflating.
const AUTO_DETECT_WINDOW_OFFSET: u8 = 32;

/// zlib's status code for a stream that needs a preset dictionary.
pub(crate) const Z_NEED_DICT: i32 = 2;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// The framing wrapped around the DEFLATE data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// zlib header and Adler-32 trailer (RFC 1950).
    Zlib,
    /// gzip header and CRC-32 trailer (RFC 1952).
    Gzip,
    /// Inflate only: choose zlib or gzip from the stream header.
    Auto,
}

impl Envelope {
    /// Returns the zlib window-bits value that selects this envelope.
    pub fn window_bits(self) -> u8 {
        match self {
            Envelope::Zlib => MAX_WINDOW_BITS,
            Envelope::Gzip => MAX_WINDOW_BITS + GZIP_WINDOW_OFFSET,
            Envelope::Auto => MAX_WINDOW_BITS + AUTO_DETECT_WINDOW_OFFSET,
        }
    }

    fn detect(header: &[u8]) -> Self {
        if header.starts_with(&GZIP_MAGIC) {
            Envelope::Gzip
        } else {
            Envelope::Zlib
        }
    }
}

/// Codec status after a successful step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Progress was made and more may follow.
    Ok,
    /// The end of the stream was reached.
    StreamEnd,
    /// The stream requires a preset dictionary.
    NeedDict,
}

/// Outcome of a single [`CompressionSession::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Input bytes consumed by this step.
    pub consumed: usize,
    /// Output bytes written by this step.
    pub produced: usize,
    /// Codec status after this step.
    pub status: Status,
}

enum Codec {
    Deflate(Deflate),
    Inflate(Decompress),
    // The envelope is chosen from the first bytes handed to `step`.
    Detect,
}

/// A compression or decompression session.
pub struct CompressionSession {
    codec: Option<Codec>,
    status: Option<Status>,
    failed: bool,
}

impl CompressionSession {
    /// Starts a compression session.
    ///
    /// Every step runs with finish semantics: the whole input is expected to
    /// be passed to each call.
    pub fn deflate(config: &CompressionConfig, envelope: Envelope) -> Result<Self, InitError> {
        config.validate()?;

        if envelope == Envelope::Auto {
            return Err(InitError::new(
                InitErrorKind::InvalidParameter,
                "auto-detected envelope is only valid when inflating",
            ));
        }

        // Every field is range-checked by `validate`, so the codec accepts it.
        let compress = Deflate::new_with_config(DeflateConfig {
            level: config.compression_level().as_raw(),
            method: Method::Deflated,
            window_bits: i32::from(envelope.window_bits()),
            mem_level: i32::from(config.memory_level_value()),
            strategy: config.compression_strategy().into(),
        });

        tracing::trace!(
            ?envelope,
            window_bits = envelope.window_bits(),
            level = config.compression_level().as_raw(),
            strategy = config.compression_strategy().as_raw(),
            memory_level = config.memory_level_value(),
            "deflate session initialized"
        );

        Ok(Self::with_codec(Codec::Deflate(compress)))
    }

    /// Starts a decompression session.
    ///
    /// Steps run with sync-flush semantics and must be repeated until the
    /// status is [`Status::StreamEnd`] or an error is returned.
    pub fn inflate(envelope: Envelope) -> Result<Self, InitError> {
        let codec = match envelope {
            Envelope::Zlib => Codec::Inflate(Decompress::new(true)),
            Envelope::Gzip => Codec::Inflate(Decompress::new_gzip(MAX_WINDOW_BITS)),
            Envelope::Auto => Codec::Detect,
        };
        tracing::trace!(
            ?envelope,
            window_bits = envelope.window_bits(),
            "inflate session initialized"
        );
        Ok(Self::with_codec(codec))
    }

    fn with_codec(codec: Codec) -> Self {
        Self {
            codec: Some(codec),
            status: None,
            failed: false,
        }
    }

    /// Total input bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        match &self.codec {
            Some(Codec::Deflate(c)) => c.total_in(),
            Some(Codec::Inflate(d)) => d.total_in(),
            _ => 0,
        }
    }

    /// Total output bytes produced so far.
    pub fn total_out(&self) -> u64 {
        match &self.codec {
            Some(Codec::Deflate(c)) => c.total_out(),
            Some(Codec::Inflate(d)) => d.total_out(),
            _ => 0,
        }
    }

    /// Status reported by the last successful step.
    pub fn status(&self) -> Option<Status> {
        self.status
    }

    /// Returns true once the stream has ended or failed.
    pub fn is_finished(&self) -> bool {
        self.failed || self.status == Some(Status::StreamEnd)
    }

    /// Processes as much of `input` into `output` as the codec can.
    ///
    /// A session that has ended, failed, or been finalized returns a
    /// [`ProcessErrorKind::Stream`] error.
    pub fn step(&mut self, input: &[u8], output: &mut [u8]) -> Result<Step, ProcessError> {
        if self.is_finished() {
            return Err(ProcessError::new(
                ProcessErrorKind::Stream,
                "session already reached the end of the stream",
            ));
        }
        let codec = self.codec.as_mut().ok_or_else(|| {
            ProcessError::new(ProcessErrorKind::Stream, "session already finalized")
        })?;

        let result = match *codec {
            Codec::Deflate(ref mut compress) => deflate_step(compress, input, output),
            Codec::Inflate(ref mut decompress) => inflate_step(decompress, input, output),
            Codec::Detect => {
                let envelope = Envelope::detect(input);
                tracing::trace!(?envelope, "detected inflate envelope");
                let mut decompress = match envelope {
                    Envelope::Gzip => Decompress::new_gzip(MAX_WINDOW_BITS),
                    _ => Decompress::new(true),
                };
                let result = inflate_step(&mut decompress, input, output);
                *codec = Codec::Inflate(decompress);
                result
            }
        };

        match &result {
            Ok(step) => self.status = Some(step.status),
            Err(_) => self.failed = true,
        }
        result
    }

    /// Releases the codec state. Calling this more than once is harmless.
    pub fn finalize(&mut self) {
        if self.codec.take().is_some() {
            tracing::trace!(
                status = ?self.status,
                failed = self.failed,
                "codec session finalized"
            );
        }
    }

    /// Returns true once the codec state has been released.
    pub fn is_finalized(&self) -> bool {
        self.codec.is_none()
    }
}

impl Drop for CompressionSession {
    fn drop(&mut self) {
        self.finalize();
    }
}

impl std::fmt::Debug for CompressionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match &self.codec {
            Some(Codec::Deflate(_)) => "deflate",
            Some(Codec::Inflate(_)) | Some(Codec::Detect) => "inflate",
            None => "finalized",
        };
        f.debug_struct("CompressionSession")
            .field("mode", &mode)
            .field("status", &self.status)
            .field("failed", &self.failed)
            .field("total_in", &self.total_in())
            .field("total_out", &self.total_out())
            .finish()
    }
}

fn deflate_step(
    compress: &mut Deflate,
    input: &[u8],
    output: &mut [u8],
) -> Result<Step, ProcessError> {
    let before_in = compress.total_in();
    let before_out = compress.total_out();

    let status = compress
        .compress(input, output, DeflateFlush::Finish)
        .map_err(|e| {
            let kind = match e {
                DeflateError::StreamError => ProcessErrorKind::Stream,
                DeflateError::DataError => ProcessErrorKind::Data,
                DeflateError::MemError => ProcessErrorKind::Memory,
            };
            let message = compress.error_message().unwrap_or(e.as_str());
            ProcessError::new(kind, message)
        })?;

    let consumed = (compress.total_in() - before_in) as usize;
    let produced = (compress.total_out() - before_out) as usize;

    match status {
        zlib_rs::Status::Ok => Ok(Step {
            consumed,
            produced,
            status: Status::Ok,
        }),
        zlib_rs::Status::StreamEnd => Ok(Step {
            consumed,
            produced,
            status: Status::StreamEnd,
        }),
        zlib_rs::Status::BufError => Err(ProcessError::new(
            ProcessErrorKind::Buffer,
            "no progress possible while compressing",
        )),
    }
}

fn inflate_step(
    decompress: &mut Decompress,
    input: &[u8],
    output: &mut [u8],
) -> Result<Step, ProcessError> {
    let before_in = decompress.total_in();
    let before_out = decompress.total_out();

    let result = decompress.decompress(input, output, FlushDecompress::Sync);

    let consumed = (decompress.total_in() - before_in) as usize;
    let produced = (decompress.total_out() - before_out) as usize;

    let status = match result {
        Ok(flate2::Status::Ok) => Status::Ok,
        Ok(flate2::Status::StreamEnd) => Status::StreamEnd,
        Ok(flate2::Status::BufError) => {
            return Err(ProcessError::new(
                ProcessErrorKind::Buffer,
                "no progress possible: input is truncated",
            ));
        }
        Err(e) if e.needs_dictionary().is_some() => Status::NeedDict,
        Err(e) => {
            let message = e.message().unwrap_or(UNKNOWN_CODEC_MESSAGE);
            return Err(ProcessError::new(ProcessErrorKind::Data, message));
        }
    };

    Ok(Step {
        consumed,
        produced,
        status,
    })
}
