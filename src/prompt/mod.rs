// Context budgeter
// Greedily renders ranked hits into context blocks under a character budget and assembles the grounding prompt


use itertools::Itertools;
use serde::Serialize;
use tracing::debug;

use crate::config::{DEFAULT_MAX_CHARS, DEFAULT_MAX_ENTRIES, RetrievalConfig};
use crate::search::SearchHit;

pub const PREAMBLE: &str = "You are a helpful assistant explaining database metadata fields.\n\
                            Given these field descriptions:\n\n";
pub const BLOCK_SEPARATOR: &str = "\n---\n";

/// Limits applied when selecting context blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextBudget {
    pub max_entries: usize,
    pub max_chars: usize,
}

impl Default for ContextBudget {
    #[inline]
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl ContextBudget {
    #[inline]
    pub fn new(max_entries: usize, max_chars: usize) -> Self {
        Self {
            max_entries,
            max_chars,
        }
    }
}

impl From<&RetrievalConfig> for ContextBudget {
    #[inline]
    fn from(config: &RetrievalConfig) -> Self {
        Self::new(config.max_entries, config.max_chars)
    }
}

/// The rendered text for one admitted hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextBlock {
    pub field_name: String,
    pub text: String,
}

impl ContextBlock {
    #[inline]
    pub fn render(hit: &SearchHit) -> Self {
        let field = &hit.metadata;
        let tags = if field.tags.is_empty() {
            String::new()
        } else {
            format!("Tags: {}\n", field.tags.join(", "))
        };
        let text = format!(
            "Database: {} - {}\nTable: {} - {}\nField: {}\nDescription: {}\n{}",
            field.database_name,
            field.database_description,
            field.table_name,
            field.table_description,
            field.field_name,
            field.business_description,
            tags,
        );

        Self {
            field_name: field.field_name.clone(),
            text,
        }
    }

    /// Length in characters, which is what the budget is measured in
    #[inline]
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Prompt handed to the explanation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroundingPrompt {
    query: String,
    blocks: Vec<ContextBlock>,
    text: String,
}

impl GroundingPrompt {
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[inline]
    pub fn blocks(&self) -> &[ContextBlock] {
        &self.blocks
    }

    /// The joined context section between the preamble and the closing sentence.
    ///
    /// This string can be longer than `max_chars`: the budget charges block characters only,
    /// and the `BLOCK_SEPARATOR` between blocks is not counted. Use `context_chars` for the
    /// charged total.
    #[inline]
    pub fn context(&self) -> String {
        join_blocks(&self.blocks)
    }

    /// Characters charged against the budget, never more than `max_chars`
    #[inline]
    pub fn context_chars(&self) -> usize {
        self.blocks.iter().map(ContextBlock::len).sum()
    }

    #[inline]
    pub fn admitted_fields(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().map(|b| b.field_name.as_str())
    }

    #[inline]
    pub fn has_context(&self) -> bool {
        !self.blocks.is_empty()
    }
}

fn join_blocks(blocks: &[ContextBlock]) -> String {
    blocks.iter().map(|b| b.text.as_str()).join(BLOCK_SEPARATOR)
}

#[inline]
pub fn closing_sentence(query: &str) -> String {
    format!("\n\nPlease provide a concise, clear explanation related to the query: '{query}'.")
}

/// Build the grounding prompt from ranked hits.
///
/// At most `budget.max_entries` hits are considered, best first. Admission stops at the
/// first block that would push the running total past `budget.max_chars`; later hits are
/// never considered even if they would fit on their own. Separators are not charged.
#[inline]
pub fn build_prompt(query: &str, hits: &[SearchHit], budget: ContextBudget) -> GroundingPrompt {
    let mut blocks = Vec::new();
    let mut total = 0usize;

    for hit in hits.iter().take(budget.max_entries) {
        let block = ContextBlock::render(hit);
        let len = block.len();
        if total + len > budget.max_chars {
            debug!(
                "Context budget reached at rank {} ({} + {} > {})",
                hit.rank, total, len, budget.max_chars
            );
            break;
        }
        total += len;
        blocks.push(block);
    }

    let text = format!(
        "{PREAMBLE}{}{}",
        join_blocks(&blocks),
        closing_sentence(query)
    );

    debug!(
        "Built prompt with {} context blocks ({} chars)",
        blocks.len(),
        total
    );

    GroundingPrompt {
        query: query.to_string(),
        blocks,
        text,
    }
}
