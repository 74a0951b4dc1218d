use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use godot_assistant::config::AppConfig;
use godot_assistant::container::bootstrap::{bootstrap, VECTORSTORE};
use godot_assistant::logger;
use godot_assistant::models::SourceType;
use godot_assistant::indexer::chunker::split_document;
use godot_assistant::rag::ingest::collect_documents;
use godot_assistant::rag::RagIndex;

#[derive(Parser, Debug)]
#[command(name = "docs-indexer")]
#[command(about = "Index Godot documentation and lore into the vector store")]
struct Args {
    /// Drop the existing collection before indexing
    #[arg(long)]
    rebuild: bool,

    /// Qdrant server URL (overrides QDRANT_URL)
    #[arg(long)]
    qdrant_url: Option<String>,

    /// Qdrant collection name (overrides QDRANT_COLLECTION)
    #[arg(long)]
    collection: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logger::init();

    let args = Args::parse();

    let mut config = AppConfig::load()?;
    if let Some(url) = args.qdrant_url {
        config.vector_db.url = url;
    }
    if let Some(collection) = args.collection {
        config.vector_db.collection = collection;
    }

    println!("Initializing embedding model...");
    let container = bootstrap(config.clone());
    let index: Arc<RagIndex> = container.get(VECTORSTORE)?;

    println!("Connecting to Qdrant at {}...", config.vector_db.url);
    if args.rebuild {
        println!("Dropping collection {}...", config.vector_db.collection);
        index.clear().await?;
    }
    index.ensure_ready().await?;

    println!("Scanning {} and {}", config.paths.docs_path.display(), config.paths.lore_path.display());
    let documents = collect_documents(&config);
    let doc_count = documents
        .iter()
        .filter(|d| d.source_type == SourceType::Documentation)
        .count();
    println!(
        "Found {} documents ({} documentation, {} lore)",
        documents.len(),
        doc_count,
        documents.len() - doc_count
    );

    if documents.is_empty() {
        println!("No documents found. Exiting.");
        return Ok(());
    }

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut success_count = 0usize;
    let mut total_chunks = 0usize;
    let mut failed: Vec<(String, String)> = Vec::new();

    for document in &documents {
        pb.set_message(document.source.clone());

        let chunks = split_document(document, config.rag.chunk_size, config.rag.chunk_overlap);
        match index.replace_source(&document.source, &chunks).await {
            Ok(count) => {
                success_count += 1;
                total_chunks += count;
            }
            Err(e) => {
                tracing::warn!("Failed to index {}: {}", document.source, e);
                failed.push((document.source.clone(), e.to_string()));
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("done");

    println!("\nIndexing complete!");
    println!("  Documents indexed: {}/{}", success_count, documents.len());
    println!("  Documents failed:  {}", failed.len());
    println!("  Chunks written:    {}", total_chunks);
    println!("  Collection:        {}", config.vector_db.collection);
    println!("  Qdrant URL:        {}", config.vector_db.url);
    println!("  Total in store:    {}", index.document_count().await?);

    if !failed.is_empty() {
        println!("\nFailed documents:");
        for (source, err) in &failed {
            println!("  {}: {}", source, err);
        }
    }

    Ok(())
}
