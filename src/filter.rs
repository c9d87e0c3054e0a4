//! Body rewrite hooks.
//!
//! A [`BodyFilter`] receives a complete outgoing body and returns the bytes
//! to send in its place, optionally adjusting response headers. Stages are
//! composed explicitly: each stage owns the next one and calls through to it
//! with its own output.

use crate::codec::EncodingDecision;
use crate::compress::{CompressedResult, compress};
use crate::config::CompressionConfig;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, header};
use std::fmt;
use std::sync::Arc;

/// Rewrites a complete outgoing body.
pub trait BodyFilter {
    /// Returns the body to send, possibly mutating the response headers.
    fn filter(&self, body: Bytes, headers: &mut HeaderMap) -> Bytes;

    /// Returns true if this stage never changes the body or headers.
    fn is_passthrough(&self) -> bool {
        false
    }
}

/// The terminal stage: returns the body unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl BodyFilter for Passthrough {
    fn filter(&self, body: Bytes, _headers: &mut HeaderMap) -> Bytes {
        body
    }

    fn is_passthrough(&self) -> bool {
        true
    }
}

/// A filter stage built from a closure. See [`filter_fn`].
#[derive(Clone, Copy)]
pub struct FilterFn<F> {
    f: F,
}

/// Creates a filter stage from a closure.
///
/// ```
/// use bytes::Bytes;
/// use http::HeaderMap;
/// use http_payload_compression::{BodyFilter, filter_fn};
///
/// let upper = filter_fn(|body: Bytes, _: &mut HeaderMap| {
///     Bytes::from(body.to_ascii_uppercase())
/// });
/// let out = upper.filter(Bytes::from("hi"), &mut HeaderMap::new());
/// assert_eq!(out, "HI");
/// ```
pub fn filter_fn<F>(f: F) -> FilterFn<F>
where
    F: Fn(Bytes, &mut HeaderMap) -> Bytes,
{
    FilterFn { f }
}

impl<F> BodyFilter for FilterFn<F>
where
    F: Fn(Bytes, &mut HeaderMap) -> Bytes,
{
    fn filter(&self, body: Bytes, headers: &mut HeaderMap) -> Bytes {
        (self.f)(body, headers)
    }
}

impl<F> fmt::Debug for FilterFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterFn").finish_non_exhaustive()
    }
}

/// Compresses the body for the negotiated encoding, then calls the next stage.
///
/// On success the `Content-Encoding` and `Content-Length` headers are set,
/// `Accept-Ranges` is removed, and `Vary` gains `accept-encoding`. When the
/// body is skipped or compression fails, the original body is forwarded and
/// the headers are left alone.
#[derive(Debug, Clone)]
pub struct CompressionFilter<N = Passthrough> {
    decision: EncodingDecision,
    config: Arc<CompressionConfig>,
    next: N,
}

impl<N> CompressionFilter<N> {
    /// Creates a compression stage in front of `next`.
    pub fn new(decision: EncodingDecision, config: Arc<CompressionConfig>, next: N) -> Self {
        Self {
            decision,
            config,
            next,
        }
    }

    /// Returns the negotiated encoding.
    pub fn decision(&self) -> EncodingDecision {
        self.decision
    }

    /// Returns the next stage.
    pub fn next(&self) -> &N {
        &self.next
    }

    /// Returns true if a response with these headers may be compressed.
    ///
    /// A known `Content-Length` at or below the threshold is rejected here,
    /// before the body is read.
    pub fn accepts(&self, headers: &HeaderMap) -> bool {
        self.decision.compresses()
            && !has_content_encoding(headers)
            && !has_content_range(headers)
            && !is_uncompressible_content_type(headers)
            && !is_at_or_below_threshold(headers, self.config.threshold_bytes())
    }
}

impl<N: BodyFilter> CompressionFilter<N> {
    /// Returns true if the body has to be buffered and run through this chain.
    pub fn needs_body(&self, headers: &HeaderMap) -> bool {
        self.accepts(headers) || !self.next.is_passthrough()
    }
}

impl<N: BodyFilter> BodyFilter for CompressionFilter<N> {
    fn filter(&self, body: Bytes, headers: &mut HeaderMap) -> Bytes {
        if !self.accepts(headers) {
            tracing::info!(
                decision = ?self.decision,
                "Not compressed: response is not eligible for compression"
            );
            return self.next.filter(body, headers);
        }

        match compress(&body, self.decision, &self.config) {
            CompressedResult::Skip => {
                tracing::info!(
                    body_len = body.len(),
                    threshold = self.config.threshold_bytes(),
                    "Not compressed: body is not larger than the threshold"
                );
                self.next.filter(body, headers)
            }
            CompressedResult::Failure(e) => {
                tracing::info!(error = %e, "Not compressed: compression failed");
                self.next.filter(body, headers)
            }
            CompressedResult::Compressed { bytes, encoding } => {
                tracing::debug!(
                    encoding,
                    original_len = body.len(),
                    compressed_len = bytes.len(),
                    "compressed response body"
                );
                headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static(encoding));
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
                headers.remove(header::ACCEPT_RANGES);
                add_vary_accept_encoding(headers);
                self.next.filter(bytes, headers)
            }
        }
    }
}

/// Checks if Content-Encoding header is already present.
fn has_content_encoding(headers: &HeaderMap) -> bool {
    headers.contains_key(header::CONTENT_ENCODING)
}

/// Checks if Content-Range header is present (range response).
fn has_content_range(headers: &HeaderMap) -> bool {
    headers.contains_key(header::CONTENT_RANGE)
}

/// Adds Accept-Encoding to the Vary header if not already present.
fn add_vary_accept_encoding(headers: &mut HeaderMap) {
    for vary in headers.get_all(header::VARY) {
        if let Ok(vary_str) = vary.to_str() {
            let covered = vary_str.split(',').any(|v| {
                let v = v.trim();
                v.eq_ignore_ascii_case("*") || v.eq_ignore_ascii_case("accept-encoding")
            });
            if covered {
                return;
            }
        }
    }

    headers.append(header::VARY, HeaderValue::from_static("accept-encoding"));
}

/// Checks if the content type is already compressed (images other than SVG).
fn is_uncompressible_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("image/") && !ct.starts_with("image/svg+xml"))
}

/// Checks if a known Content-Length is at or below the threshold.
fn is_at_or_below_threshold(headers: &HeaderMap, threshold: usize) -> bool {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .is_some_and(|len| len <= threshold)
}
