#![allow(dead_code, reason = "not every integration test uses every helper")]

use async_trait::async_trait;
use std::sync::Mutex;
use wingman::embeddings::Embedder;
use wingman::explain::ExplanationService;
use wingman::prompt::GroundingPrompt;

pub const KEYWORD_MODEL: &str = "keyword-embedder";

/// Words that each own one dimension of the keyword embedding
pub const KEYWORDS: [&str; 6] = ["customer", "order", "total", "email", "address", "product"];

/// Deterministic embedder: one dimension per keyword, set when the text mentions it
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        KEYWORDS
            .iter()
            .map(|keyword| if lower.contains(keyword) { 1.0 } else { 0.0 })
            .collect()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        KEYWORD_MODEL
    }

    async fn encode(&self, text: &str) -> wingman::Result<Vec<f32>> {
        Ok(Self::vector(text))
    }

    async fn encode_batch(&self, texts: &[String]) -> wingman::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| Self::vector(text)).collect())
    }
}

/// Explanation backend that echoes the number of admitted blocks and records prompts
#[derive(Default)]
pub struct RecordingExplainer {
    prompts: Mutex<Vec<String>>,
}

impl RecordingExplainer {
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .expect("lock should not be poisoned")
            .clone()
    }
}

#[async_trait]
impl ExplanationService for RecordingExplainer {
    async fn explain(&self, prompt: &GroundingPrompt) -> wingman::Result<String> {
        self.prompts
            .lock()
            .expect("lock should not be poisoned")
            .push(prompt.text().to_string());
        Ok(format!("Explained {} fields.", prompt.blocks().len()))
    }
}

pub const SALES_CATALOG: &str = r#"[
    {
        "database_code": "sales",
        "database_description": "Sales data mart",
        "tables": [
            {
                "table_name": "orders",
                "table_description": "Customer orders",
                "fields": [
                    {
                        "field_name": "customer_id",
                        "business_name": "Customer ID",
                        "business_description": "Unique customer identifier",
                        "data_type": "INTEGER",
                        "tags": ["pii", "key"]
                    },
                    {
                        "field_name": "order_total",
                        "business_name": "Order Total",
                        "business_description": "Total order amount",
                        "data_type": "DECIMAL",
                        "length": 12
                    }
                ]
            }
        ]
    },
    {
        "database_name": "crm",
        "database_description": "Customer relationship management",
        "tables": [
            {
                "table_name": "contacts",
                "table_description": "Contact details",
                "fields": [
                    {
                        "field_name": "email_address",
                        "business_description": "Primary email",
                        "tags": ["pii"],
                        "sample_values": ["a@example.com", "b@example.com"]
                    }
                ]
            }
        ]
    },
    {
        "database_name": "inventory",
        "database_description": "Stock levels",
        "tables": [
            {
                "table_name": "products",
                "table_description": "Product master",
                "fields": [
                    { "field_name": "product_code", "business_description": "SKU" }
                ]
            }
        ]
    }
]"#;
