// Interactive session state
// One transition per submission; each submission replaces the previous state


use std::sync::Arc;
use tracing::debug;

use crate::WingmanError;
use crate::assistant::{Answer, CatalogAssistant};

#[derive(Debug, Default)]
pub enum SessionState {
    /// Nothing submitted yet, or the session was reset
    #[default]
    Idle,
    /// Input was not a usable query; nothing reached the index
    Rejected { input: String, reason: String },
    /// Retrieval succeeded. The explanation inside may still have failed.
    Answered(Box<Answer>),
    /// Retrieval failed for this submission
    Failed { query: String, error: WingmanError },
}

impl SessionState {
    #[inline]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    #[inline]
    pub fn answer(&self) -> Option<&Answer> {
        match self {
            Self::Answered(answer) => Some(answer),
            _ => None,
        }
    }

    #[inline]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Rejected { .. } => "rejected",
            Self::Answered(_) => "answered",
            Self::Failed { .. } => "failed",
        }
    }
}

pub struct Session {
    assistant: Arc<CatalogAssistant>,
    explain: bool,
    state: SessionState,
    submissions: usize,
}

impl Session {
    #[inline]
    pub fn new(assistant: Arc<CatalogAssistant>) -> Self {
        Self {
            assistant,
            explain: true,
            state: SessionState::Idle,
            submissions: 0,
        }
    }

    #[inline]
    pub fn with_explanation(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    #[inline]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[inline]
    pub fn submissions(&self) -> usize {
        self.submissions
    }

    /// Process one user submission and move to the resulting state
    #[inline]
    pub async fn submit(&mut self, input: &str) -> &SessionState {
        self.submissions += 1;

        let result = if self.explain {
            self.assistant.ask(input).await
        } else {
            self.assistant.ask_without_explanation(input).await
        };

        self.state = match result {
            Ok(answer) => SessionState::Answered(Box::new(answer)),
            Err(WingmanError::InvalidQuery(reason)) => SessionState::Rejected {
                input: input.to_string(),
                reason,
            },
            Err(error) => SessionState::Failed {
                query: input.trim().to_string(),
                error,
            },
        };

        debug!(
            "Submission {} moved session to {}",
            self.submissions,
            self.state.label()
        );
        &self.state
    }

    #[inline]
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
    }
}
