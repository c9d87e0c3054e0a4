use crate::body::CompressionBody;
use crate::filter::{BodyFilter, CompressionFilter};
use http::{HeaderMap, HeaderValue, Response, header, response::Parts};
use http_body::Body;
use http_body_util::BodyExt;
use http_body_util::combinators::Collect;
use pin_project_lite::pin_project;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

pin_project! {
    /// Future for compression service responses.
    ///
    /// Resolves once the inner response is available and, if the filter
    /// chain needs it, once its body has been read in full.
    pub struct ResponseFuture<F, B, N>
    where
        B: Body,
    {
        #[pin]
        state: State<F, B>,
        filter: CompressionFilter<N>,
    }
}

pin_project! {
    #[project = StateProj]
    enum State<F, B>
    where
        B: Body,
    {
        Inner {
            #[pin]
            future: F,
        },
        Collecting {
            #[pin]
            collect: Collect<B>,
            parts: Option<Parts>,
        },
        Done,
    }
}

impl<F, B, N> ResponseFuture<F, B, N>
where
    B: Body,
{
    pub(crate) fn new(inner: F, filter: CompressionFilter<N>) -> Self {
        Self {
            state: State::Inner { future: inner },
            filter,
        }
    }
}

impl<F, B, E, N> Future for ResponseFuture<F, B, N>
where
    F: Future<Output = Result<Response<B>, E>>,
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    N: BodyFilter,
{
    type Output = Result<Response<CompressionBody<B>>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        loop {
            match this.state.as_mut().project() {
                StateProj::Inner { future } => {
                    let response = match ready!(future.poll(cx)) {
                        Ok(response) => response,
                        Err(e) => {
                            this.state.set(State::Done);
                            return Poll::Ready(Err(e));
                        }
                    };

                    let (parts, body) = response.into_parts();
                    if !this.filter.needs_body(&parts.headers) {
                        tracing::info!(
                            decision = ?this.filter.decision(),
                            "Not compressed: passing response body through"
                        );
                        this.state.set(State::Done);
                        let body = CompressionBody::passthrough(body);
                        return Poll::Ready(Ok(Response::from_parts(parts, body)));
                    }

                    this.state.set(State::Collecting {
                        collect: body.collect(),
                        parts: Some(parts),
                    });
                }
                StateProj::Collecting { collect, parts } => {
                    let collected = ready!(collect.poll(cx));
                    let parts = parts.take();
                    this.state.set(State::Done);

                    let Some(mut parts) = parts else {
                        panic!("ResponseFuture polled after completion");
                    };

                    let body = match collected {
                        Ok(collected) => {
                            let trailers = collected.trailers().cloned();
                            let original = collected.to_bytes();
                            let original_len = original.len();
                            let data = this.filter.filter(original, &mut parts.headers);
                            sync_content_length(&mut parts.headers, original_len, data.len());
                            CompressionBody::buffered(data, trailers)
                        }
                        Err(e) => {
                            tracing::debug!("failed to read response body for filtering");
                            parts.headers.remove(header::CONTENT_LENGTH);
                            CompressionBody::failed(io::Error::other(e.into()))
                        }
                    };
                    return Poll::Ready(Ok(Response::from_parts(parts, body)));
                }
                StateProj::Done => panic!("ResponseFuture polled after completion"),
            }
        }
    }
}

/// Any stage may change the body length, so a declared length is recomputed.
fn sync_content_length(headers: &mut HeaderMap, original_len: usize, len: usize) {
    if headers.contains_key(header::CONTENT_LENGTH) || original_len != len {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }
}
