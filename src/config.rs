use crate::error::{InitError, InitErrorKind};
use zlib_rs::Strategy;

/// Default minimum body size, in bytes, above which compression is attempted.
pub const DEFAULT_THRESHOLD: usize = 1024;

/// Default size of the intermediate buffer used while compressing.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Default codec memory level.
pub const DEFAULT_MEMORY_LEVEL: u8 = 8;

/// The level of compression to apply.
///
/// Discriminants match the numeric levels understood by zlib.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum CompressionLevel {
    /// Input is copied a block at a time without compression.
    NoCompression = 0,
    /// Favour speed over ratio.
    BestSpeed = 1,
    /// Favour ratio over speed.
    BestCompression = 9,
    /// A compromise between speed and ratio.
    #[default]
    Default = -1,
}

impl CompressionLevel {
    /// Returns the raw zlib level.
    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for CompressionLevel {
    type Error = InitError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::NoCompression),
            1 => Ok(Self::BestSpeed),
            9 => Ok(Self::BestCompression),
            -1 => Ok(Self::Default),
            other => Err(InitError::new(
                InitErrorKind::InvalidParameter,
                format!("unsupported compression level {other}"),
            )),
        }
    }
}

/// Hint to the matcher about the shape of the data being compressed.
///
/// The strategy affects the compression ratio but never the correctness of
/// the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum CompressionStrategy {
    /// Normal data.
    #[default]
    Default = 0,
    /// More Huffman coding and less string matching.
    Filtered = 1,
    /// Huffman coding only, no string matching.
    HuffmanOnly = 2,
    /// Match distances limited to one (run-length encoding).
    Rle = 3,
    /// No dynamic Huffman codes.
    Fixed = 4,
}

impl CompressionStrategy {
    /// Returns the raw zlib strategy code.
    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

impl From<CompressionStrategy> for Strategy {
    fn from(strategy: CompressionStrategy) -> Self {
        match strategy {
            CompressionStrategy::Default => Strategy::Default,
            CompressionStrategy::Filtered => Strategy::Filtered,
            CompressionStrategy::HuffmanOnly => Strategy::HuffmanOnly,
            CompressionStrategy::Rle => Strategy::Rle,
            CompressionStrategy::Fixed => Strategy::Fixed,
        }
    }
}

impl TryFrom<i32> for CompressionStrategy {
    type Error = InitError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Default),
            1 => Ok(Self::Filtered),
            2 => Ok(Self::HuffmanOnly),
            3 => Ok(Self::Rle),
            4 => Ok(Self::Fixed),
            other => Err(InitError::new(
                InitErrorKind::InvalidParameter,
                format!("unsupported compression strategy {other}"),
            )),
        }
    }
}

/// Settings for response compression.
///
/// Built once with the chained setters and then shared read-only between
/// requests.
///
/// ```
/// use http_payload_compression::{CompressionConfig, CompressionLevel};
///
/// let config = CompressionConfig::new()
///     .threshold(100)
///     .level(CompressionLevel::BestCompression);
/// assert_eq!(config.threshold_bytes(), 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionConfig {
    threshold: usize,
    chunk_size: usize,
    level: CompressionLevel,
    strategy: CompressionStrategy,
    memory_level: u8,
}

impl CompressionConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            level: CompressionLevel::default(),
            strategy: CompressionStrategy::default(),
            memory_level: DEFAULT_MEMORY_LEVEL,
        }
    }

    /// Sets the body size at or below which responses are never compressed.
    pub fn threshold(mut self, bytes: usize) -> Self {
        self.threshold = bytes;
        self
    }

    /// Sets the size of the intermediate output buffer used while compressing.
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Sets the compression level.
    pub fn level(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the compression strategy.
    pub fn strategy(mut self, strategy: CompressionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the codec memory level (`1..=9`).
    pub fn memory_level(mut self, level: u8) -> Self {
        self.memory_level = level;
        self
    }

    /// Returns the compression threshold in bytes.
    pub fn threshold_bytes(&self) -> usize {
        self.threshold
    }

    /// Returns the intermediate buffer size in bytes.
    pub fn chunk_size_bytes(&self) -> usize {
        self.chunk_size
    }

    /// Returns the compression level.
    pub fn compression_level(&self) -> CompressionLevel {
        self.level
    }

    /// Returns the compression strategy.
    pub fn compression_strategy(&self) -> CompressionStrategy {
        self.strategy
    }

    /// Returns the codec memory level.
    pub fn memory_level_value(&self) -> u8 {
        self.memory_level
    }

    /// Checks the settings a codec session depends on.
    pub fn validate(&self) -> Result<(), InitError> {
        if self.chunk_size == 0 {
            return Err(InitError::new(
                InitErrorKind::InvalidParameter,
                "chunk size must be greater than zero",
            ));
        }
        if !(1..=9).contains(&self.memory_level) {
            return Err(InitError::new(
                InitErrorKind::InvalidParameter,
                format!("memory level {} is outside 1-9", self.memory_level),
            ));
        }
        Ok(())
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self::new()
    }
}
