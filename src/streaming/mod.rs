//! Byte-stream relay for SSE responses
//!
//! Upstream chunks are treated as opaque bytes: no line buffering, parsing or
//! re-framing happens here. Each chunk is yielded as soon as it arrives, in the
//! order it arrived.

use std::convert::Infallible;

use async_stream::stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::proxy::RequestContext;

/// Tracks what has been forwarded and reports an early drop.
///
/// Lives inside the relay generator, so it is dropped together with the
/// outbound body when the caller goes away.
struct StreamProgress {
    ctx: RequestContext,
    chunks: usize,
    bytes: usize,
    finished: bool,
}

impl StreamProgress {
    fn new(ctx: RequestContext) -> Self {
        Self {
            ctx,
            chunks: 0,
            bytes: 0,
            finished: false,
        }
    }

    fn record(&mut self, len: usize) {
        self.chunks += 1;
        self.bytes += len;
    }

    fn finish(&mut self) {
        self.finished = true;
        self.ctx.log_stream_ended(self.chunks, self.bytes);
    }
}

impl Drop for StreamProgress {
    fn drop(&mut self) {
        if !self.finished {
            self.ctx.log_stream_abandoned(self.chunks);
        }
    }
}

/// Relay an upstream byte stream chunk by chunk.
///
/// The returned stream is lazy: nothing is read from upstream until the
/// outbound body is polled. A read error ends the stream after logging it,
/// since the response status has already been sent. Dropping the returned
/// stream drops `upstream`, which closes the upstream connection.
pub fn relay_chunks<S, E>(
    upstream: S,
    ctx: RequestContext,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    stream! {
        let mut progress = StreamProgress::new(ctx);
        let mut upstream = Box::pin(upstream);

        while let Some(next) = upstream.next().await {
            match next {
                Ok(chunk) => {
                    progress.record(chunk.len());
                    yield Ok::<Bytes, Infallible>(chunk);
                }
                Err(e) => {
                    progress
                        .ctx
                        .log_warning(&format!("Upstream read failed mid-stream: {}", e));
                    break;
                }
            }
        }

        progress.finish();
    }
}
