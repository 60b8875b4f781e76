//! Chat session state
//!
//! Holds the ordered turns of one conversation and the small state machine
//! that tracks whether an answer is in flight.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Recorded in place of an assistant turn when generation fails
    Error,
}

/// A single turn of the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Role::Error, text)
    }
}

/// Conversation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No turns recorded
    Empty,
    /// A user turn is recorded and its answer has not arrived yet
    AwaitingAnswer,
    /// Last cycle finished, successfully or with an error turn
    Ready,
}

/// One conversation with a repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique session identifier
    pub id: Uuid,

    /// When the session was started
    pub started_at: DateTime<Utc>,

    turns: Vec<ChatTurn>,
    state: SessionState,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            turns: Vec::new(),
            state: SessionState::Empty,
        }
    }

    /// Append a turn and advance the state machine accordingly
    pub fn append(&mut self, turn: ChatTurn) {
        self.state = match turn.role {
            Role::User => SessionState::AwaitingAnswer,
            Role::Assistant | Role::Error => SessionState::Ready,
        };
        self.turns.push(turn);
    }

    /// Record the user's question; the cycle is now awaiting an answer
    pub fn begin_query(&mut self, query: impl Into<String>) {
        self.append(ChatTurn::user(query));
    }

    /// Record a successful answer
    pub fn complete(&mut self, answer: impl Into<String>) {
        self.append(ChatTurn::assistant(answer));
    }

    /// Record a failed cycle; the user turn stays, no assistant turn is added
    pub fn fail(&mut self, message: impl Into<String>) {
        self.append(ChatTurn::error(message));
    }

    /// Read-only view of the turns in insertion order
    pub fn history(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop every turn; the conversation starts over
    pub fn clear(&mut self) {
        tracing::debug!(session = %self.id, turns = self.turns.len(), "clearing chat history");
        self.turns.clear();
        self.state = SessionState::Empty;
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}
