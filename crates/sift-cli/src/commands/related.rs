//! Related command implementation.

use crate::cli::RelatedArgs;
use crate::commands::open_store;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::provider::build_generator;
use sift_domain::ItemId;
use sift_similarity::SimilarityEngine;

/// Execute the related command.
pub async fn execute_related(
    args: RelatedArgs,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let item_id = ItemId::from_string(&args.item_id).map_err(CliError::InvalidInput)?;
    let store = open_store(config)?;
    let engine = SimilarityEngine::new(build_generator(&config.provider), config.similarity.clone());

    let related = engine
        .related_items(&store, item_id, args.limit, args.min_similarity, None)
        .await?;

    println!("{}", formatter.format_related(&related)?);
    Ok(())
}
