use bytes::{Buf, Bytes, BytesMut};
use http::HeaderMap;
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// A response body produced by the compression middleware.
    ///
    /// Bodies that went through the filter chain are held in memory and sent
    /// as a single data frame followed by any trailers. Bodies the chain has
    /// no interest in are streamed through unchanged.
    #[project = CompressionBodyProj]
    #[allow(missing_docs)]
    pub enum CompressionBody<B> {
        /// Fully buffered body, possibly compressed.
        Buffered {
            data: Option<Bytes>,
            trailers: Option<HeaderMap>,
        },
        /// Passthrough body without buffering.
        Passthrough {
            #[pin]
            inner: B,
        },
        /// Reading the inner body failed; the error is yielded once.
        Failed {
            error: Option<io::Error>,
        },
    }
}

impl<B> CompressionBody<B> {
    /// Creates a buffered body with optional trailers.
    pub fn buffered(data: Bytes, trailers: Option<HeaderMap>) -> Self {
        Self::Buffered {
            data: Some(data).filter(|d| !d.is_empty()),
            trailers,
        }
    }

    /// Creates a passthrough body.
    pub fn passthrough(inner: B) -> Self {
        Self::Passthrough { inner }
    }

    /// Creates a body that fails with `error` when polled.
    pub fn failed(error: io::Error) -> Self {
        Self::Failed { error: Some(error) }
    }
}

impl<B> Body for CompressionBody<B>
where
    B: Body,
    B::Data: Buf,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            CompressionBodyProj::Buffered { data, trailers } => {
                if let Some(data) = data.take() {
                    return Poll::Ready(Some(Ok(Frame::data(data))));
                }
                Poll::Ready(trailers.take().map(|t| Ok(Frame::trailers(t))))
            }
            CompressionBodyProj::Passthrough { inner } => {
                // Pass through frames, converting data to Bytes
                match inner.poll_frame(cx) {
                    Poll::Pending => Poll::Pending,
                    Poll::Ready(None) => Poll::Ready(None),
                    Poll::Ready(Some(Ok(frame))) => {
                        let frame = frame.map_data(|mut data| {
                            let mut bytes = BytesMut::with_capacity(data.remaining());
                            while data.has_remaining() {
                                let slice = data.chunk();
                                bytes.extend_from_slice(slice);
                                data.advance(slice.len());
                            }
                            bytes.freeze()
                        });
                        Poll::Ready(Some(Ok(frame)))
                    }
                    Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(io::Error::other(e.into())))),
                }
            }
            CompressionBodyProj::Failed { error } => Poll::Ready(error.take().map(Err)),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            CompressionBody::Buffered { data, trailers } => data.is_none() && trailers.is_none(),
            CompressionBody::Passthrough { inner } => inner.is_end_stream(),
            CompressionBody::Failed { error } => error.is_none(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            CompressionBody::Buffered { data, .. } => {
                SizeHint::with_exact(data.as_ref().map_or(0, |d| d.len() as u64))
            }
            CompressionBody::Passthrough { inner } => inner.size_hint(),
            CompressionBody::Failed { .. } => SizeHint::default(),
        }
    }
}
