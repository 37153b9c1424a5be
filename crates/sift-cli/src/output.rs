//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use sift_domain::{ExtractionTask, ItemId, KnowledgeItem, TaskStatus};
use sift_jobs::TaskSnapshot;
use sift_similarity::{RelatedItem, SimilarityGraph};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Whether progress chatter should be suppressed.
    pub fn is_quiet(&self) -> bool {
        !matches!(self.format, OutputFormat::Table)
    }

    /// Format knowledge items.
    pub fn format_items(&self, items: &[KnowledgeItem]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(items)?),
            OutputFormat::Quiet => Ok(ids(items.iter())),
            OutputFormat::Table => {
                if items.is_empty() {
                    return Ok(self.colorize("No items found.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["ID", "Title", "Category", "Confidence", "Tags"]);
                for item in items {
                    builder.push_record([
                        item.id.to_string(),
                        truncate(item.title(), 48),
                        item.category().as_str().to_string(),
                        item.draft.confidence.to_string(),
                        item.tags().join(", "),
                    ]);
                }
                Ok(table(builder))
            }
        }
    }

    /// Format related items with their scores.
    pub fn format_related(&self, related: &[RelatedItem]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<serde_json::Value> = related
                    .iter()
                    .map(|r| serde_json::json!({ "score": r.score, "item": r.item }))
                    .collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(ids(related.iter().map(|r| &r.item))),
            OutputFormat::Table => {
                if related.is_empty() {
                    return Ok(self.colorize("No related items found.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Score", "ID", "Title", "Category"]);
                for r in related {
                    builder.push_record([
                        r.score.to_string(),
                        r.item.id.to_string(),
                        truncate(r.item.title(), 48),
                        r.item.category().as_str().to_string(),
                    ]);
                }
                Ok(table(builder))
            }
        }
    }

    /// Format a similarity graph.
    pub fn format_graph(&self, graph: &SimilarityGraph, items: &[KnowledgeItem]) -> Result<String> {
        let title = |id: ItemId| {
            items
                .iter()
                .find(|item| item.id == id)
                .map(|item| truncate(item.title(), 32))
                .unwrap_or_default()
        };

        match self.format {
            OutputFormat::Json => {
                let edges: Vec<serde_json::Value> = graph
                    .edges
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "source": e.source,
                            "target": e.target,
                            "score": e.score,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&serde_json::json!({
                    "edges": edges,
                    "compared_pairs": graph.compared_pairs,
                    "cache_hits": graph.cache_hits,
                }))?)
            }
            OutputFormat::Quiet => Ok(graph
                .edges
                .iter()
                .map(|e| format!("{} {} {}", e.source, e.target, e.score))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let stats = self.info(&format!(
                    "{} pairs compared, {} from cache, {} edges",
                    graph.compared_pairs,
                    graph.cache_hits,
                    graph.edges.len()
                ));
                if graph.edges.is_empty() {
                    return Ok(stats);
                }
                let mut builder = Builder::default();
                builder.push_record(["Score", "Item", "Similar item"]);
                for edge in &graph.edges {
                    builder.push_record([edge.score.to_string(), title(edge.source), title(edge.target)]);
                }
                Ok(format!("{}\n{}", table(builder), stats))
            }
        }
    }

    /// One-line progress report for a running task.
    pub fn progress_line(&self, snapshot: &TaskSnapshot) -> String {
        let task = &snapshot.task;
        let eta = snapshot
            .eta_secs
            .map(|secs| format!(", about {} left", format_duration(secs)))
            .unwrap_or_default();
        let document = task
            .current_document
            .as_deref()
            .map(|d| format!(" [{}]", d))
            .unwrap_or_default();
        self.colorize(
            &format!(
                "{:>3}% {} {}/{} documents, {} items{}{}",
                task.progress,
                task.stage.as_str(),
                task.processed_items,
                task.total_items,
                task.extracted_count,
                document,
                eta
            ),
            "cyan",
        )
    }

    /// Final report for a finished task.
    pub fn task_summary(&self, task: &ExtractionTask) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(task)?),
            OutputFormat::Quiet => Ok(task
                .knowledge_item_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => Ok(match task.status {
                TaskStatus::Failed => self.error(&format!(
                    "Extraction failed: {}",
                    task.error.as_deref().unwrap_or("unknown error")
                )),
                _ => self.success(&format!(
                    "Extracted {} item(s) from {} document(s)",
                    task.extracted_count, task.processed_items
                )),
            }),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

fn table(builder: Builder) -> String {
    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

fn ids<'a>(items: impl Iterator<Item = &'a KnowledgeItem>) -> String {
    items
        .map(|item| item.id.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Shorten `text` to at most `max` characters.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max.saturating_sub(1)).collect();
    short.push('…');
    short
}

/// Human-readable rendering of a duration in seconds.
pub fn format_duration(secs: f64) -> String {
    let secs = secs.max(0.0).round() as u64;
    if secs < 60 {
        format!("{}s", secs)
    } else {
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}
