//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::commands::open_store;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::provider::build_generator;
use sift_domain::TaskStatus;
use sift_extractor::{ExtractionOptions, Extractor};
use sift_jobs::{JobError, JobRunner};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::time::interval;
use tracing::info;

/// Execute the extract command.
pub async fn execute_extract(
    args: ExtractArgs,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let store = Arc::new(open_store(config)?);

    let mut document_ids = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let content = fs::read_to_string(path)?;
        let id = document_id(path);
        store.add_document(&id, &content)?;
        document_ids.push(id);
    }
    info!("Queued {} document(s) for '{}'", document_ids.len(), args.collection);

    let credential_override = match &args.key_env {
        Some(name) => Some(std::env::var(name).map_err(|_| {
            CliError::InvalidInput(format!("environment variable {} is not set", name))
        })?),
        None => None,
    };
    let options = ExtractionOptions {
        credential_override,
        skip_extracted: args.skip_extracted,
    };

    let extractor = Extractor::new(
        build_generator(&config.provider),
        Arc::clone(&store),
        config.extractor.clone(),
    );
    let runner = JobRunner::new(Arc::new(extractor), config.jobs.clone())?;
    let task_id = runner.start(document_ids, &args.collection, options).await?;

    let mut ticker = interval(runner.config().poll_interval());
    let mut last_line = String::new();
    let done = loop {
        ticker.tick().await;
        let snapshot = runner
            .task(&task_id)
            .await?
            .ok_or_else(|| JobError::NotFound(task_id.clone()))?;
        if snapshot.task.status.is_terminal() {
            break snapshot;
        }
        if !formatter.is_quiet() {
            let line = formatter.progress_line(&snapshot);
            if line != last_line {
                eprintln!("{}", line);
                last_line = line;
            }
        }
    };

    println!("{}", formatter.task_summary(&done.task)?);
    if done.task.status == TaskStatus::Failed {
        return Err(CliError::JobFailed(
            done.task.error.unwrap_or_else(|| "unknown error".to_string()),
        ));
    }
    Ok(())
}

/// Document id for a file: its path as given.
fn document_id(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
