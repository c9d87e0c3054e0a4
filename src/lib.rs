//! HTTP response compression middleware for Tower.
//!
//! This crate provides a Tower layer that compresses complete HTTP response
//! bodies with gzip or deflate, chosen from the client's `Accept-Encoding`
//! header, plus the matching routine that restores a compressed payload.
//!
//! # Example
//!
//! ```ignore
//! use http_payload_compression::CompressionLayer;
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .layer(CompressionLayer::new().threshold(100))
//!     .service(my_service);
//! ```
//!
//! # Compression Rules
//!
//! The middleware will **not** compress responses when:
//! - No supported `Accept-Encoding` is present in the request, or the client
//!   prefers `identity`
//! - `Content-Encoding` header is already set
//! - `Content-Range` header is present (range responses)
//! - `Content-Type` starts with `image/` (except `image/svg+xml`)
//! - The body is not larger than the threshold (default: 1024 bytes)
//! - The codec fails; the original body is sent instead
//!
//! # Response Modifications
//!
//! When compression is applied:
//! - `Content-Encoding` header is set to the codec used
//! - `Content-Length` header is set to the compressed size
//! - `Accept-Ranges` header is removed
//! - `Vary` header includes `Accept-Encoding`
//!
//! # Deployment
//!
//! Bodies that go through the filter chain are buffered and compressed in
//! memory, synchronously, on the task polling the response. Nothing here
//! bounds how long that takes; cap response sizes upstream if that matters.
//!
//! # Decompression
//!
//! [`decompress`] inflates a complete gzip or zlib buffer, detecting the
//! envelope from its header, and reports corrupt input as a typed error.

#![deny(missing_docs)]

mod body;
mod codec;
mod compress;
mod config;
mod decompress;
mod error;
mod filter;
mod future;
mod layer;
mod service;
pub mod stream;

pub use body::CompressionBody;
pub use codec::{EncodingDecision, SUPPORTED_ENCODINGS, negotiate, parse_accept_encoding};
pub use compress::{CompressedResult, compress};
pub use config::{
    CompressionConfig, CompressionLevel, CompressionStrategy, DEFAULT_CHUNK_SIZE,
    DEFAULT_MEMORY_LEVEL, DEFAULT_THRESHOLD,
};
pub use decompress::decompress;
pub use error::{
    CompressError, DecompressError, InitError, InitErrorKind, ProcessError, ProcessErrorKind,
};
pub use filter::{BodyFilter, CompressionFilter, FilterFn, Passthrough, filter_fn};
pub use future::ResponseFuture;
pub use layer::CompressionLayer;
pub use service::CompressionService;
