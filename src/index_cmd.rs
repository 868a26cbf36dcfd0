//! `farmctl index`: build or load the document index ahead of the first query.

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::embedding;
use crate::index::{DocumentIndexer, IndexOrigin, IndexState};
use crate::progress::ProgressMode;

pub async fn run_index(config: &Config, rebuild: bool, progress: ProgressMode) -> Result<()> {
    let provider: Arc<dyn embedding::EmbeddingProvider> =
        Arc::from(embedding::create_provider(&config.embedding)?);
    let indexer = DocumentIndexer::new(config, provider).with_progress(progress.reporter());

    let state = if rebuild {
        indexer.rebuild_index().await?
    } else {
        indexer.build_or_load_index().await?
    };

    match state {
        IndexState::Ready { index, origin } => {
            let verb = match origin {
                IndexOrigin::Loaded => "Loaded",
                IndexOrigin::Built => "Built",
            };
            println!(
                "{} index: {} chunks ({}, {} dims)",
                verb,
                index.len(),
                index.model,
                index.dims
            );
            println!("  path:   {}", indexer.index_path().display());
            println!("  digest: {}", index.digest);
        }
        IndexState::Unavailable => {
            println!(
                "No PDF documents found in '{}'; nothing to index.",
                indexer.documents_dir().display()
            );
        }
    }
    Ok(())
}
