use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::assistant::{Answer, CatalogAssistant, Explanation};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::embeddings::{Embedder, OllamaClient};
use crate::explain::{CompletionClient, ExplanationService};
use crate::grouping::{GroupedResults, group};
use crate::index::{IndexBuilder, IndexLoader};
use crate::search::{SearchHit, SearchOrchestrator};
use crate::session::{Session, SessionState};

/// Words that end an interactive chat
const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", ":q"];

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    hits: &'a [SearchHit],
    grouped: GroupedResults,
}

/// Build the vector index and metadata side-car from a raw catalog file
#[inline]
pub async fn build_index(catalog_path: &Path) -> Result<()> {
    let config = Config::load_default()?;
    let catalog = Catalog::load(catalog_path)?;

    println!(
        "Loaded catalog from {} ({} fields)",
        style(catalog_path.display()).cyan(),
        catalog.field_count()
    );

    let client = OllamaClient::new(&config.embedding)?;
    client
        .health_check()
        .context("Ollama is not ready to embed the catalog")?;

    let progress = ProgressBar::new(catalog.field_count() as u64).with_style(
        ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding catalog fields")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let builder = IndexBuilder::new(&client, config.index_path(), config.metadata_path())
        .with_expected_dimension(config.embedding.embedding_dimension as usize)
        .with_progress(progress);
    let (_, summary) = builder.build(&catalog).await?;

    println!("{}", style("✓ Index built successfully!").green());
    println!("   Fields: {}", summary.fields);
    println!("   Dimensions: {}", summary.dimension);
    println!("   Model: {}", summary.model_name);
    println!("   Index: {}", config.index_path().display());
    println!("   Metadata: {}", config.metadata_path().display());

    Ok(())
}

/// Rank catalog fields against a query and print them grouped by database and table
#[inline]
pub async fn search(query: &str, top_k: Option<usize>, json: bool) -> Result<()> {
    let config = Config::load_default()?;
    let mut assistant = create_assistant(&config, false, None)?;
    if let Some(top_k) = top_k {
        assistant = assistant.with_top_k(top_k);
    }

    let hits = assistant.search(query).await?;
    let grouped = group(&hits);

    if json {
        let output = SearchOutput {
            query: query.trim(),
            hits: &hits,
            grouped,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_hits(&hits);
    print_grouped(&grouped);
    Ok(())
}

/// Search and explain a single query
#[inline]
pub async fn ask(query: &str, explain: bool, timeout_secs: Option<u64>, json: bool) -> Result<()> {
    let config = Config::load_default()?;
    let deadline = timeout_secs.map(Duration::from_secs);
    let assistant = create_assistant(&config, explain, deadline)?;

    let answer = match deadline {
        Some(deadline) => assistant.ask_with_deadline(query, deadline).await?,
        None => assistant.ask(query).await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print_answer(&answer);
    }
    Ok(())
}

/// Interactive loop: one query per line until `exit`
#[inline]
pub async fn chat(explain: bool) -> Result<()> {
    let config = Config::load_default()?;
    let assistant = Arc::new(create_assistant(&config, explain, None)?);
    let mut session = Session::new(Arc::clone(&assistant)).with_explanation(explain);

    println!("{}", style("💬 Wingman catalog assistant").bold().cyan());
    println!("Ask about fields in your catalog. Type 'exit' to leave.");
    println!();

    loop {
        let input: String = Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;

        if EXIT_COMMANDS.contains(&input.trim()) {
            break;
        }

        match session.submit(&input).await {
            SessionState::Idle => {}
            SessionState::Rejected { reason, .. } => {
                println!("{}", style(format!("⚠ {}", reason)).yellow());
            }
            SessionState::Answered(answer) => print_answer(answer),
            SessionState::Failed { error, .. } => {
                println!("{}", style(format!("❌ {}", error)).red());
                if error.is_retrieval_fatal() {
                    println!("Run 'wingman status' to check the index and Ollama.");
                }
            }
        }
        println!();
    }

    info!("Chat ended after {} submissions", session.submissions());
    Ok(())
}

/// Report on the index bundle and the external services
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load_default()?;

    println!("📊 Wingman Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🔍 Index Status:");
    let loader = IndexLoader::from_config(&config);
    if loader.bundle_exists() {
        match loader.get().await {
            Ok(index) => {
                let metadata = index.metadata();
                println!("   ✅ Index: Loaded ({})", loader.index_path().display());
                println!("   📋 Model: {}", metadata.model_name);
                println!("   🔢 Entries: {}", index.len());
                println!("   📐 Dimensions: {}", index.dimension());
                println!(
                    "   🕒 Built: {}",
                    metadata.built_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
            Err(e) => println!("   ❌ Index: Unusable - {}", e),
        }
    } else {
        println!("   ❌ Index: Not built");
        println!("   Use 'wingman build --catalog <path>' to build it.");
    }

    println!();
    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.embedding) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.embedding.host, config.embedding.port
                );
                println!("   📋 Model: {}", config.embedding.model);
            }
            Err(e) => println!("   ⚠️  Ollama: Connected but unhealthy - {:#}", e),
        },
        Err(e) => println!("   ❌ Ollama: Failed to connect - {}", e),
    }

    println!();
    println!("💡 Explanation Service:");
    match config.completion.endpoint() {
        Ok(url) => println!("   Endpoint: {}", url),
        Err(e) => println!("   ❌ Endpoint: Invalid - {}", e),
    }
    println!("   Model: {}", config.completion.model);
    if config.completion.api_key.is_some() {
        println!("   ✅ API Key: Set");
    } else {
        println!("   ⚠️  API Key: Not set (explanations will fail)");
    }

    Ok(())
}

fn create_assistant(
    config: &Config,
    explain: bool,
    deadline: Option<Duration>,
) -> Result<CatalogAssistant> {
    let embedder: Arc<dyn Embedder> = Arc::new(OllamaClient::new(&config.embedding)?);
    let loader = Arc::new(IndexLoader::from_config(config));
    let orchestrator = SearchOrchestrator::new(embedder, loader);
    let assistant = CatalogAssistant::new(orchestrator, &config.retrieval);

    if !explain {
        return Ok(assistant);
    }

    if config.completion.api_key.is_none() {
        warn!("No completion API key configured; explanation requests may be rejected");
    }
    let mut client = CompletionClient::new(&config.completion)?;
    if let Some(deadline) = deadline {
        let configured = Duration::from_secs(config.completion.timeout_seconds);
        client = client.with_timeout(configured.min(deadline));
    }
    let explainer: Arc<dyn ExplanationService> = Arc::new(client);
    Ok(assistant.with_explainer(explainer))
}

fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No matching fields found.");
        return;
    }

    println!("{}", style(format!("Top {} matches:", hits.len())).bold());
    for hit in hits {
        println!(
            "  {:>3}. {}.{}.{}  {}",
            hit.rank,
            hit.metadata.database_name,
            hit.metadata.table_name,
            style(&hit.metadata.field_name).cyan(),
            style(format!("(score {:.3})", hit.similarity_score)).dim()
        );
    }
    println!();
}

fn print_grouped(grouped: &GroupedResults) {
    for database in grouped.databases() {
        println!("📚 {}", style(&database.name).bold());
        for table in &database.tables {
            println!("   {}: {}", table.name, table.fields.join(", "));
        }
    }
}

fn print_answer(answer: &Answer) {
    print_grouped(&answer.grouped);
    if answer.hits.is_empty() {
        println!("No matching fields found.");
    }
    println!();

    match &answer.explanation {
        Explanation::Generated(text) => {
            println!("{}", style("Explanation:").bold().yellow());
            println!("{}", text);
        }
        Explanation::Skipped => {}
        Explanation::Failed(e) => {
            println!(
                "{}",
                style(format!("⚠ Explanation unavailable: {}", e)).yellow()
            );
        }
    }
}
