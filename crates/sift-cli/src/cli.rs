//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sift - Extract structured knowledge items from documents.
#[derive(Debug, Parser)]
#[command(name = "sift")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file (overrides the configuration)
    #[arg(long, global = true, env = "SIFT_DB")]
    pub db: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (IDs only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract knowledge items from text files
    Extract(ExtractArgs),

    /// List the items of a collection
    Items(ItemsArgs),

    /// Show the items most similar to an item
    Related(RelatedArgs),

    /// Build the similarity graph of a collection
    Graph(GraphArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Text files to extract from
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Collection the items are saved to
    #[arg(short = 'C', long)]
    pub collection: String,

    /// Skip documents that were already extracted
    #[arg(long)]
    pub skip_extracted: bool,

    /// Environment variable holding an API key for this run only
    #[arg(long)]
    pub key_env: Option<String>,
}

/// Arguments for the items command.
#[derive(Debug, Parser)]
pub struct ItemsArgs {
    /// Collection to list
    #[arg(short = 'C', long)]
    pub collection: String,

    /// Maximum number of results
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Arguments for the related command.
#[derive(Debug, Parser)]
pub struct RelatedArgs {
    /// Item id
    pub item_id: String,

    /// Maximum number of results
    #[arg(short, long, default_value = "5")]
    pub limit: usize,

    /// Minimum similarity (0-100)
    #[arg(short, long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=100))]
    pub min_similarity: u8,
}

/// Arguments for the graph command.
#[derive(Debug, Parser)]
pub struct GraphArgs {
    /// Collection to analyse
    #[arg(short = 'C', long)]
    pub collection: String,
}

/// Arguments for configuration management.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration management actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_command() {
        let cli = Cli::parse_from(["sift", "extract", "a.md", "b.md", "--collection", "kb"]);
        match cli.command {
            Command::Extract(args) => {
                assert_eq!(args.files.len(), 2);
                assert_eq!(args.collection, "kb");
                assert!(!args.skip_extracted);
            }
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_extract_requires_files() {
        assert!(Cli::try_parse_from(["sift", "extract", "--collection", "kb"]).is_err());
    }

    #[test]
    fn test_related_bounds() {
        let cli = Cli::parse_from(["sift", "related", "abc", "-m", "40", "-l", "3"]);
        match cli.command {
            Command::Related(args) => {
                assert_eq!(args.min_similarity, 40);
                assert_eq!(args.limit, 3);
            }
            _ => panic!("Expected Related command"),
        }
        assert!(Cli::try_parse_from(["sift", "related", "abc", "-m", "101"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["sift", "items", "-C", "kb", "--format", "json", "--no-color"]);
        assert!(matches!(cli.format, Some(CliFormat::Json)));
        assert!(cli.no_color);
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["sift", "config", "init", "--force"]);
        match cli.command {
            Command::Config(args) => assert!(matches!(args.action, ConfigAction::Init { force: true })),
            _ => panic!("Expected Config command"),
        }
    }
}
