//! Items command implementation.

use crate::cli::ItemsArgs;
use crate::commands::open_store;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use sift_domain::traits::KnowledgeStore;

/// Execute the items command.
pub async fn execute_items(args: ItemsArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let store = open_store(config)?;
    let mut items = store.list_items(&args.collection).await?;
    if let Some(limit) = args.limit {
        items.truncate(limit);
    }

    println!("{}", formatter.format_items(&items)?);
    Ok(())
}
