use crate::error::Result;
use crate::generation::{GenerationError, TextStream};
use crate::session::ChatSession;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

pub(crate) const CANCELLED: &str = "Generation cancelled";

/// An answer being streamed into a session
///
/// Holds the session until the cycle settles. Exactly one closing turn is
/// recorded: an assistant turn from [`finish`](Self::finish), or an error
/// turn on stream failure, [`cancel`](Self::cancel), [`abort`](Self::abort)
/// or drop.
pub struct PendingAnswer<'s> {
    session: &'s mut ChatSession,
    stream: TextStream,
    answer: String,
    exhausted: bool,
    settled: bool,
}

impl<'s> PendingAnswer<'s> {
    pub(crate) fn new(session: &'s mut ChatSession, stream: TextStream) -> Self {
        Self {
            session,
            stream,
            answer: String::new(),
            exhausted: false,
            settled: false,
        }
    }

    /// Next fragment, or `None` once the stream is exhausted
    pub async fn next_fragment(&mut self) -> Option<Result<String>> {
        if self.settled || self.exhausted {
            return None;
        }
        match self.stream.next().await {
            Some(Ok(fragment)) => {
                self.answer.push_str(&fragment);
                Some(Ok(fragment))
            }
            Some(Err(e)) => {
                warn!("Generation failed mid-stream: {}", e);
                self.settle_failure(e.to_string());
                Some(Err(e.into()))
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }

    /// Drain the rest of the stream and record the full answer
    pub async fn finish(mut self) -> Result<String> {
        while let Some(item) = self.next_fragment().await {
            item?;
        }
        if self.settled {
            return Err(GenerationError::Stream("answer already settled".into()).into());
        }

        let answer = std::mem::take(&mut self.answer);
        self.session.complete(answer.clone());
        self.settled = true;
        debug!("Answer complete ({} chars)", answer.chars().count());
        Ok(answer)
    }

    /// Stop consuming; the partial answer is discarded
    pub fn cancel(self) {
        self.abort(CANCELLED);
    }

    /// Stop consuming and record `reason` as the error turn
    pub fn abort(mut self, reason: &str) {
        self.settle_failure(reason.to_string());
    }

    /// Text received so far
    pub fn partial(&self) -> &str {
        &self.answer
    }

    fn settle_failure(&mut self, message: String) {
        if !self.settled {
            self.session.fail(message);
            self.settled = true;
        }
    }
}

impl Drop for PendingAnswer<'_> {
    fn drop(&mut self) {
        self.settle_failure("Generation interrupted".to_string());
    }
}
