use crate::config::{CompressionConfig, CompressionLevel, CompressionStrategy};
use crate::filter::Passthrough;
use crate::service::CompressionService;
use std::sync::Arc;
use tower::Layer;

/// A Tower layer that compresses HTTP response bodies.
///
/// This layer wraps services and compresses buffered response bodies based
/// on the client's Accept-Encoding header.
#[derive(Debug, Clone)]
pub struct CompressionLayer<N = Passthrough> {
    config: CompressionConfig,
    next: N,
}

impl CompressionLayer {
    /// Creates a new compression layer with default settings.
    ///
    /// The default threshold for compression is 1024 bytes.
    pub fn new() -> Self {
        Self::from_config(CompressionConfig::new())
    }

    /// Creates a layer from a prepared configuration.
    pub fn from_config(config: CompressionConfig) -> Self {
        Self {
            config,
            next: Passthrough,
        }
    }
}

impl<N> CompressionLayer<N> {
    /// Sets the body size at or below which responses are not compressed.
    pub fn threshold(mut self, bytes: usize) -> Self {
        self.config = self.config.threshold(bytes);
        self
    }

    /// Sets the size of the intermediate buffer used while compressing.
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.config = self.config.chunk_size(bytes);
        self
    }

    /// Sets the compression level.
    pub fn level(mut self, level: CompressionLevel) -> Self {
        self.config = self.config.level(level);
        self
    }

    /// Sets the compression strategy.
    pub fn strategy(mut self, strategy: CompressionStrategy) -> Self {
        self.config = self.config.strategy(strategy);
        self
    }

    /// Sets the codec memory level.
    pub fn memory_level(mut self, level: u8) -> Self {
        self.config = self.config.memory_level(level);
        self
    }

    /// Hands the body produced by this layer to another filter stage.
    pub fn then<M>(self, next: M) -> CompressionLayer<M> {
        CompressionLayer {
            config: self.config,
            next,
        }
    }

    /// Returns the compression settings.
    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }
}

impl Default for CompressionLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, N: Clone> Layer<S> for CompressionLayer<N> {
    type Service = CompressionService<S, N>;

    fn layer(&self, inner: S) -> Self::Service {
        CompressionService::with_filter(inner, Arc::new(self.config.clone()), self.next.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompress::decompress;
    use crate::filter::filter_fn;
    use bytes::Bytes;
    use http::{HeaderMap, HeaderValue, Request, Response, header};
    use http_body_util::{BodyExt, Full};
    use std::convert::Infallible;
    use tower::{ServiceBuilder, ServiceExt, service_fn};

    async fn large(_req: Request<()>) -> Result<Response<Full<Bytes>>, Infallible> {
        Ok(Response::new(Full::new(Bytes::from(vec![b'z'; 4096]))))
    }

    fn gzip_request() -> Request<()> {
        Request::builder()
            .header(header::ACCEPT_ENCODING, "gzip")
            .body(())
            .unwrap()
    }

    #[test]
    fn test_builder_updates_config() {
        let layer = CompressionLayer::new()
            .threshold(10)
            .chunk_size(128)
            .level(CompressionLevel::BestSpeed)
            .strategy(CompressionStrategy::HuffmanOnly)
            .memory_level(4);
        let config = layer.config();
        assert_eq!(config.threshold_bytes(), 10);
        assert_eq!(config.chunk_size_bytes(), 128);
        assert_eq!(config.compression_level(), CompressionLevel::BestSpeed);
        assert_eq!(config.compression_strategy(), CompressionStrategy::HuffmanOnly);
        assert_eq!(config.memory_level_value(), 4);
    }

    #[test]
    fn test_default_threshold() {
        assert_eq!(CompressionLayer::default().config().threshold_bytes(), 1024);
    }

    #[tokio::test]
    async fn test_layer_compresses() {
        let service = ServiceBuilder::new()
            .layer(CompressionLayer::new())
            .service(service_fn(large));

        let response = service.oneshot(gzip_request()).await.unwrap();
        assert_eq!(response.headers().get(header::CONTENT_ENCODING).unwrap(), "gzip");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(decompress(&body).unwrap(), vec![b'z'; 4096]);
    }

    #[tokio::test]
    async fn test_then_runs_after_compression() {
        let stamp = filter_fn(|body: Bytes, headers: &mut HeaderMap| {
            let len = HeaderValue::from(body.len());
            headers.insert("x-wire-length", len);
            body
        });
        let service = ServiceBuilder::new()
            .layer(CompressionLayer::new().then(stamp))
            .service(service_fn(large));

        let response = service.oneshot(gzip_request()).await.unwrap();
        let stamped = response.headers()["x-wire-length"].clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(stamped, body.len().to_string().as_str());
    }
}
