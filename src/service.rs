use crate::codec::EncodingDecision;
use crate::config::CompressionConfig;
use crate::filter::{BodyFilter, CompressionFilter, Passthrough};
use crate::future::ResponseFuture;
use http::{Request, Response};
use http_body::Body;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

/// A Tower service that compresses HTTP response bodies.
#[derive(Debug, Clone)]
pub struct CompressionService<S, N = Passthrough> {
    inner: S,
    config: Arc<CompressionConfig>,
    next: N,
}

impl<S> CompressionService<S> {
    /// Creates a new compression service wrapping the given inner service.
    pub fn new(inner: S, config: CompressionConfig) -> Self {
        Self::with_filter(inner, Arc::new(config), Passthrough)
    }
}

impl<S, N> CompressionService<S, N> {
    /// Creates a compression service that hands its output to `next`.
    pub fn with_filter(inner: S, config: Arc<CompressionConfig>, next: N) -> Self {
        Self {
            inner,
            config,
            next,
        }
    }

    /// Returns the compression settings.
    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Returns a reference to the inner service.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns a mutable reference to the inner service.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consumes this service, returning the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, N, ReqBody, ResBody> Service<Request<ReqBody>> for CompressionService<S, N>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: Body,
    ResBody::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    N: BodyFilter + Clone,
{
    type Response = Response<crate::body::CompressionBody<ResBody>>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future, ResBody, N>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let decision = req
            .headers()
            .get(http::header::ACCEPT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map_or(EncodingDecision::None, EncodingDecision::from_accept_encoding);

        let config = Arc::clone(&self.config);
        let filter = CompressionFilter::new(decision, config, self.next.clone());
        let inner = self.inner.call(req);

        ResponseFuture::new(inner, filter)
    }
}
