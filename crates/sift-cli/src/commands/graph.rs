//! Graph command implementation.

use crate::cli::GraphArgs;
use crate::commands::open_store;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use crate::provider::build_generator;
use sift_domain::traits::KnowledgeStore;
use sift_similarity::SimilarityEngine;

/// Execute the graph command.
pub async fn execute_graph(args: GraphArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let store = open_store(config)?;
    let items = store.list_items(&args.collection).await?;
    if items.len() < 2 {
        println!("{}", formatter.warning("Need at least two items to compare."));
        return Ok(());
    }

    let engine = SimilarityEngine::new(build_generator(&config.provider), config.similarity.clone());
    let graph = engine.build_graph(&items, &store, None).await;

    println!("{}", formatter.format_graph(&graph, &items)?);
    Ok(())
}
