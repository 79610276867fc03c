// Catalog assistant
// Runs one query through retrieval, grouping, prompt budgeting and the optional explanation step


use serde::ser::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout};
use tracing::{debug, info, warn};

use crate::config::RetrievalConfig;
use crate::explain::ExplanationService;
use crate::grouping::{GroupedResults, group};
use crate::prompt::{ContextBudget, GroundingPrompt, build_prompt};
use crate::search::{SearchHit, SearchOrchestrator};
use crate::{Result, WingmanError};

/// Outcome of the explanation step
#[derive(Debug)]
pub enum Explanation {
    Generated(String),
    /// Explanation was disabled or no backend is configured
    Skipped,
    /// The backend failed; retrieval results are still valid
    Failed(WingmanError),
}

impl Explanation {
    #[inline]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Generated(text) => Some(text.as_str()),
            Self::Skipped | Self::Failed(_) => None,
        }
    }

    #[inline]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl Serialize for Explanation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(serde::Serialize)]
        #[serde(tag = "status", rename_all = "snake_case")]
        enum Repr<'a> {
            Generated { text: &'a str },
            Skipped,
            Failed { error: String },
        }

        let repr = match self {
            Self::Generated(text) => Repr::Generated { text },
            Self::Skipped => Repr::Skipped,
            Self::Failed(error) => Repr::Failed {
                error: error.to_string(),
            },
        };
        repr.serialize(serializer)
    }
}

/// Everything produced for a single query
#[derive(Debug, serde::Serialize)]
pub struct Answer {
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub grouped: GroupedResults,
    pub prompt: GroundingPrompt,
    pub explanation: Explanation,
}

pub struct CatalogAssistant {
    orchestrator: SearchOrchestrator,
    explainer: Option<Arc<dyn ExplanationService>>,
    top_k: usize,
    budget: ContextBudget,
}

impl CatalogAssistant {
    #[inline]
    pub fn new(orchestrator: SearchOrchestrator, retrieval: &RetrievalConfig) -> Self {
        Self {
            orchestrator,
            explainer: None,
            top_k: retrieval.top_k,
            budget: ContextBudget::from(retrieval),
        }
    }

    #[inline]
    pub fn with_explainer(mut self, explainer: Arc<dyn ExplanationService>) -> Self {
        self.explainer = Some(explainer);
        self
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[inline]
    pub fn with_budget(mut self, budget: ContextBudget) -> Self {
        self.budget = budget;
        self
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    #[inline]
    pub fn budget(&self) -> ContextBudget {
        self.budget
    }

    #[inline]
    pub fn has_explainer(&self) -> bool {
        self.explainer.is_some()
    }

    #[inline]
    pub fn orchestrator(&self) -> &SearchOrchestrator {
        &self.orchestrator
    }

    /// Retrieval only
    #[inline]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.orchestrator.search(query, self.top_k).await
    }

    /// Answer `query`, requesting an explanation when a backend is configured
    #[inline]
    pub async fn ask(&self, query: &str) -> Result<Answer> {
        self.answer(query, true, None).await
    }

    /// Answer `query` without contacting the explanation backend
    #[inline]
    pub async fn ask_without_explanation(&self, query: &str) -> Result<Answer> {
        self.answer(query, false, None).await
    }

    /// Answer `query` within `deadline`.
    ///
    /// Retrieval that misses the deadline fails the request. The explanation step only gets
    /// whatever time retrieval left over, and running out of it degrades the answer to
    /// `Explanation::Failed(ServiceTimeout)` while keeping the hits.
    #[inline]
    pub async fn ask_with_deadline(&self, query: &str, deadline: Duration) -> Result<Answer> {
        self.answer(query, true, Some(deadline)).await
    }

    async fn answer(&self, query: &str, explain: bool, deadline: Option<Duration>) -> Result<Answer> {
        let started = Instant::now();
        let query = query.trim();
        let hits = match deadline {
            Some(limit) => timeout(limit, self.search(query)).await.map_err(|_| {
                WingmanError::DeadlineExceeded(format!(
                    "retrieval did not finish within {:?}",
                    limit
                ))
            })??,
            None => self.search(query).await?,
        };
        let grouped = group(&hits);
        let prompt = build_prompt(query, &hits, self.budget);

        debug!(
            "Prompt for '{}' carries {} of {} hits",
            query,
            prompt.blocks().len(),
            hits.len()
        );

        let explanation = match (&self.explainer, explain) {
            (Some(explainer), true) => {
                let remaining = deadline.map(|limit| limit.saturating_sub(started.elapsed()));
                explain_within(explainer.as_ref(), &prompt, remaining).await
            }
            _ => Explanation::Skipped,
        };

        Ok(Answer {
            query: query.to_string(),
            hits,
            grouped,
            prompt,
            explanation,
        })
    }
}

async fn explain_within(
    explainer: &dyn ExplanationService,
    prompt: &GroundingPrompt,
    remaining: Option<Duration>,
) -> Explanation {
    let result = match remaining {
        Some(remaining) => timeout(remaining, explainer.explain(prompt))
            .await
            .unwrap_or_else(|_| {
                Err(WingmanError::ServiceTimeout(format!(
                    "no explanation within the remaining {:?} of the deadline",
                    remaining
                )))
            }),
        None => explainer.explain(prompt).await,
    };

    match result {
        Ok(text) => {
            info!("Generated explanation ({} chars)", text.chars().count());
            Explanation::Generated(text)
        }
        Err(e) => {
            warn!("Explanation failed, returning retrieval results only: {}", e);
            Explanation::Failed(e)
        }
    }
}
