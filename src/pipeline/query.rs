//! One question-answer cycle with a deadline and a cancel signal

use super::answer::CANCELLED;
use super::RepoChat;
use crate::error::Result;
use crate::generation::{GenerationError, Generator};
use crate::ingest::Ingestor;
use crate::session::{ChatSession, SessionState};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How a query cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The full answer, already recorded in the session
    Answered(String),
    /// `cancel` fired first; an error turn marks the cancellation
    Cancelled,
}

/// Ask `question` and stream the answer through `on_fragment`.
///
/// Starting the stream and receiving its first fragment must each finish
/// within `limit`; expiry is reported as
/// [`GenerationError::Timeout`] and leaves an error turn. `cancel` is
/// watched for the whole cycle, including while the prompt is prepared and
/// while the first fragment is awaited.
#[allow(clippy::too_many_arguments)]
pub async fn run_query<I, G, C, F>(
    chat: &RepoChat<I, G>,
    session: &mut ChatSession,
    url: &str,
    question: &str,
    model: &str,
    limit: Duration,
    cancel: C,
    mut on_fragment: F,
) -> Result<QueryOutcome>
where
    I: Ingestor,
    G: Generator,
    C: Future<Output = ()>,
    F: FnMut(&str),
{
    tokio::pin!(cancel);
    let secs = limit.as_secs();

    let started = tokio::select! {
        biased;
        _ = &mut cancel => None,
        started = tokio::time::timeout(limit, chat.ask(&mut *session, url, question, model)) => Some(started),
    };
    let mut pending = match started {
        Some(Ok(pending)) => pending?,
        Some(Err(_)) => {
            drop(started);
            let err = GenerationError::Timeout { secs };
            warn!("Generation did not start: {}", err);
            if session.state() == SessionState::AwaitingAnswer {
                session.fail(err.to_string());
            }
            return Err(err.into());
        }
        None => {
            drop(started);
            debug!("Query cancelled before the answer started");
            if session.state() == SessionState::AwaitingAnswer {
                session.fail(CANCELLED);
            }
            return Ok(QueryOutcome::Cancelled);
        }
    };

    let first = tokio::select! {
        biased;
        _ = &mut cancel => None,
        first = tokio::time::timeout(limit, pending.next_fragment()) => Some(first),
    };
    match first {
        None => {
            pending.cancel();
            return Ok(QueryOutcome::Cancelled);
        }
        Some(Err(_)) => {
            let err = GenerationError::Timeout { secs };
            warn!("No answer received: {}", err);
            pending.abort(&err.to_string());
            return Err(err.into());
        }
        Some(Ok(Some(fragment))) => on_fragment(&fragment?),
        Some(Ok(None)) => {}
    }

    let cancelled = loop {
        let item = tokio::select! {
            biased;
            _ = &mut cancel => break true,
            item = pending.next_fragment() => item,
        };
        match item {
            Some(fragment) => on_fragment(&fragment?),
            None => break false,
        }
    };

    if cancelled {
        pending.cancel();
        return Ok(QueryOutcome::Cancelled);
    }

    Ok(QueryOutcome::Answered(pending.finish().await?))
}
