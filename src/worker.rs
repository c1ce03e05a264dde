//! Per-target forwarding session
//!
//! One worker runs per logging target as its own tokio task: it pulls frames
//! off the stream, transforms them against the target context and appends
//! them to the sink. Per-record failures never terminate the loop; only a
//! stop request or end of stream does.

use crate::framing::FrameDecoder;
use crate::line::{LogLine, TargetContext};
use crate::store::LineSink;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct Worker<R, S> {
    context: TargetContext,
    decoder: FrameDecoder<R>,
    sink: S,
    cancel: CancellationToken,
}

impl<R, S> Worker<R, S>
where
    R: AsyncRead + Unpin + Send,
    S: LineSink,
{
    pub fn new(context: TargetContext, stream: R, sink: S, cancel: CancellationToken) -> Self {
        Self {
            context,
            decoder: FrameDecoder::new(stream),
            sink,
            cancel,
        }
    }

    /// Run the forwarding loop until stopped or the stream ends, then clean
    /// up. Cleanup runs exactly once regardless of the exit condition.
    ///
    /// Cancellation is cooperative: the token is checked between frames, so a
    /// worker blocked on a read without data or EOF will not observe a stop
    /// request until the read returns.
    pub async fn run(mut self) {
        loop {
            if self.cancel.is_cancelled() {
                debug!(
                    id = %self.context.container_id,
                    "shutting down worker due to stop request"
                );
                break;
            }

            match self.decoder.next_record().await {
                Ok(Some(record)) => {
                    let line = LogLine::build(&self.context, &record);
                    if let Err(err) = self.sink.append(&line).await {
                        warn!(
                            id = %self.context.container_id,
                            error = %err,
                            "error forwarding log line, dropping it and continuing"
                        );
                    }
                }
                Ok(None) => {
                    debug!(
                        id = %self.context.container_id,
                        "shutting down worker due to stream EOF"
                    );
                    break;
                }
                Err(err) => {
                    warn!(
                        id = %self.context.container_id,
                        error = %err,
                        "error reading from log stream, resyncing and continuing"
                    );
                    self.decoder.reset();
                }
            }
        }

        self.shutdown().await;
    }

    async fn shutdown(&mut self) {
        self.sink.close().await;
        // The stream handle is released when the worker is dropped. Marking
        // the token cancelled is idempotent and covers the EOF exit path.
        self.cancel.cancel();
        debug!(id = %self.context.container_id, "worker terminated");
    }
}
