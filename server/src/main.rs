use anyhow::Result;
use axum::Router;
use clap::Parser;
use server::{build_app, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

/// A ticket search application using TF-IDF.
#[derive(Parser)]
struct Args {
    /// Language bundles to load (codes or names); all languages when omitted
    #[arg(long, num_args = 0..)]
    bundles: Vec<String>,
    /// Rebuild the vectorizers and vector matrices for language bundles
    #[arg(long, default_value_t = false)]
    rebuild: bool,
    /// Ticket corpus (JSON/JSONL file or directory)
    #[arg(long, default_value = "assets/tickets.jsonl")]
    datafile: PathBuf,
    /// Folder containing vectorizers and vector matrices
    #[arg(long, default_value = "assets")]
    vectorpath: PathBuf,
    /// Minimum confidence for a match to be shown
    #[arg(long, default_value_t = 0.15)]
    threshold: f64,
    /// NLTK-style stopword directory; bundled lists when unset
    #[arg(long)]
    stopwords: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 5000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = ServerConfig {
        datafile: args.datafile,
        vectorpath: args.vectorpath,
        bundles: args.bundles,
        rebuild: args.rebuild,
        threshold: args.threshold,
        stopwords: args.stopwords,
    };
    let app: Router = tokio::task::spawn_blocking(move || build_app(config)).await??;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
