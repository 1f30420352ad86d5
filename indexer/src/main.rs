use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use ticket_core::corpus::{group_by_language, load_path};
use ticket_core::{persist, search};
use ticket_core::{AnalyzerConfig, IndexPaths, IndexStore, LanguageCatalog, MatchResult, Query, StopwordDir};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build per-language TF-IDF ticket indices and query them", long_about = None)]
struct Cli {
    /// NLTK-style stopword directory (`<dir>/stopwords/<language>`); bundled lists when unset
    #[arg(long, global = true)]
    stopwords: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build (or restore) indices for the requested languages
    Build {
        /// Ticket corpus (JSON/JSONL file or directory)
        #[arg(long)]
        input: String,
        /// Output directory for vectorizer/vector_matrix artifacts
        #[arg(long)]
        output: String,
        /// Languages to index by code or name; all when omitted
        #[arg(long, num_args = 1..)]
        languages: Vec<String>,
        /// Rebuild even when artifacts already exist
        #[arg(long, default_value_t = false)]
        rebuild: bool,
        /// Stem tokens with the language's Snowball stemmer
        #[arg(long, default_value_t = false)]
        stem: bool,
    },
    /// Find the ticket most similar to a subject/body pair
    Query {
        /// Ticket corpus the index was built from
        #[arg(long)]
        input: String,
        /// Directory holding the artifacts
        #[arg(long)]
        index: String,
        #[arg(long)]
        language: String,
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long)]
        body: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let catalog = Arc::new(match &cli.stopwords {
        Some(dir) => LanguageCatalog::new(StopwordDir::new(dir)),
        None => LanguageCatalog::default(),
    });

    match cli.command {
        Commands::Build { input, output, languages, rebuild, stem } => {
            let config = AnalyzerConfig { stem, ..AnalyzerConfig::default() };
            build_indices(catalog, &input, &output, &languages, rebuild, config)
        }
        Commands::Query { input, index, language, subject, body } => {
            query_index(catalog, &input, &index, Query::new(subject, body, language))
        }
    }
}

fn build_indices(
    catalog: Arc<LanguageCatalog>,
    input: &str,
    output: &str,
    languages: &[String],
    rebuild: bool,
    config: AnalyzerConfig,
) -> Result<()> {
    let docs = load_path(input).with_context(|| format!("loading corpus from {input}"))?;
    let grouped = group_by_language(docs);
    let store = IndexStore::with_config(catalog, output, config);
    let out = store.materialize(languages, &grouped, rebuild)?;

    for (code, index) in &out.indices {
        tracing::info!(language = *code, num_docs = index.len(), num_terms = index.model().len(), "index ready");
    }
    for language in &out.skipped {
        eprintln!("No documents found in data file for language '{language}'.");
    }
    tracing::info!(output, languages = ?store.active_languages(), "index build complete");
    Ok(())
}

fn query_index(catalog: Arc<LanguageCatalog>, input: &str, index_dir: &str, query: Query) -> Result<()> {
    let hit = find_related(&catalog, input, index_dir, &query)?;
    println!("{}", serde_json::to_string_pretty(&hit)?);
    Ok(())
}

/// Search persisted artifacts without building or writing anything.
fn find_related(catalog: &LanguageCatalog, input: &str, index_dir: &str, query: &Query) -> Result<MatchResult> {
    let language = catalog.resolve(&query.language)?;
    let mut grouped = group_by_language(load_path(input).with_context(|| format!("loading corpus from {input}"))?);
    let docs = grouped.remove(language.code).unwrap_or_default();
    let index = persist::load(&IndexPaths::new(index_dir), language, docs)
        .with_context(|| format!("no usable {language} index in {index_dir}; run `indexer build` first"))?;
    Ok(search::search(query, &index)?)
}
