use std::fmt;
use thiserror::Error;

/// Fallback diagnostic used when the codec does not supply one.
pub(crate) const UNKNOWN_CODEC_MESSAGE: &str = "unknown codec error";

/// Why a codec session could not be initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitErrorKind {
    /// The stream parameters were inconsistent.
    Stream,
    /// Not enough memory for the codec state.
    Memory,
    /// The codec library version is incompatible.
    Version,
    /// A configuration value was out of range.
    InvalidParameter,
}

/// Why a codec step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessErrorKind {
    /// The input was corrupted or did not conform to the expected format.
    Data,
    /// No progress was possible, typically because the input was truncated.
    Buffer,
    /// The stream state was inconsistent, or was driven after it finished.
    Stream,
    /// Not enough memory.
    Memory,
    /// The codec library version is incompatible.
    Version,
    /// Any other codec status code.
    Unknown(i32),
}

impl fmt::Display for InitErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitErrorKind::Stream => f.write_str("stream error"),
            InitErrorKind::Memory => f.write_str("memory error"),
            InitErrorKind::Version => f.write_str("version error"),
            InitErrorKind::InvalidParameter => f.write_str("invalid parameter"),
        }
    }
}

impl fmt::Display for ProcessErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessErrorKind::Data => f.write_str("data error"),
            ProcessErrorKind::Buffer => f.write_str("buffer error"),
            ProcessErrorKind::Stream => f.write_str("stream error"),
            ProcessErrorKind::Memory => f.write_str("memory error"),
            ProcessErrorKind::Version => f.write_str("version error"),
            ProcessErrorKind::Unknown(code) => write!(f, "unknown error (code {code})"),
        }
    }
}

/// A codec session failed to initialize.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("codec initialization failed ({kind}): {message}")]
pub struct InitError {
    kind: InitErrorKind,
    message: String,
}

impl InitError {
    pub(crate) fn new(kind: InitErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> InitErrorKind {
        self.kind
    }

    /// Returns the diagnostic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A codec step failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("codec processing failed ({kind}): {message}")]
pub struct ProcessError {
    kind: ProcessErrorKind,
    message: String,
}

impl ProcessError {
    pub(crate) fn new(kind: ProcessErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ProcessErrorKind {
        self.kind
    }

    /// Returns the diagnostic message reported by the codec.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error returned when compression could not be performed.
///
/// The middleware never propagates this; the original body is sent instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompressError {
    /// The codec session could not be set up.
    #[error(transparent)]
    Init(#[from] InitError),
    /// The codec failed while producing output.
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Error returned when a compressed payload could not be restored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecompressError {
    /// The codec session could not be set up.
    #[error(transparent)]
    Init(#[from] InitError),
    /// The payload was corrupt, truncated, or otherwise not inflatable.
    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl DecompressError {
    /// Returns the processing error kind, if this is a processing failure.
    pub fn process_kind(&self) -> Option<ProcessErrorKind> {
        match self {
            DecompressError::Init(_) => None,
            DecompressError::Process(e) => Some(e.kind()),
        }
    }

    /// Returns the diagnostic message.
    pub fn message(&self) -> &str {
        match self {
            DecompressError::Init(e) => e.message(),
            DecompressError::Process(e) => e.message(),
        }
    }
}

impl From<DecompressError> for std::io::Error {
    fn from(err: DecompressError) -> Self {
        let kind = match err.process_kind() {
            Some(ProcessErrorKind::Data) => std::io::ErrorKind::InvalidData,
            Some(ProcessErrorKind::Buffer) => std::io::ErrorKind::UnexpectedEof,
            Some(ProcessErrorKind::Memory) => std::io::ErrorKind::OutOfMemory,
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = ProcessError::new(ProcessErrorKind::Data, "incorrect header check");
        assert_eq!(
            err.to_string(),
            "codec processing failed (data error): incorrect header check"
        );

        let err = InitError::new(InitErrorKind::InvalidParameter, "bad");
        assert_eq!(
            err.to_string(),
            "codec initialization failed (invalid parameter): bad"
        );
    }

    #[test]
    fn test_unknown_code_display() {
        assert_eq!(
            ProcessErrorKind::Unknown(2).to_string(),
            "unknown error (code 2)"
        );
    }

    #[test]
    fn test_decompress_error_accessors() {
        let err = DecompressError::from(ProcessError::new(ProcessErrorKind::Buffer, "truncated"));
        assert_eq!(err.process_kind(), Some(ProcessErrorKind::Buffer));
        assert_eq!(err.message(), "truncated");

        let err = DecompressError::from(InitError::new(InitErrorKind::Memory, "oom"));
        assert_eq!(err.process_kind(), None);
        assert_eq!(err.message(), "oom");
    }

    #[test]
    fn test_into_io_error() {
        let err = DecompressError::from(ProcessError::new(ProcessErrorKind::Data, "corrupt"));
        let io: std::io::Error = err.into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidData);
    }
}
