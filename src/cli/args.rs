use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ask questions about your documents
#[derive(Parser, Debug)]
#[command(
    name = "docqa",
    version = env!("CARGO_PKG_VERSION"),
    about = "Chunk, embed and search documents, then answer questions from them"
)]
pub struct Args {
    /// Path to a docqa.toml config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show how a document would be chunked, without embedding it
    Chunk {
        /// Text file to chunk
        file: PathBuf,

        /// Chunk size in characters (overrides config)
        #[arg(long)]
        size: Option<usize>,

        /// Overlap in characters (overrides config)
        #[arg(long)]
        overlap: Option<usize>,

        /// Output chunks as JSON
        #[arg(long)]
        json: bool,
    },

    /// Chunk, embed and store documents
    Ingest {
        /// Text files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output upload results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Retrieve the passages most similar to a question
    Search {
        question: String,

        /// Number of passages (defaults to retrieval.top_k)
        #[arg(short = 'k', long)]
        limit: Option<usize>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Answer a question from the stored passages
    Ask {
        question: String,

        /// Output the answer and sources as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show collection status
    Status {
        /// Output status as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_search_limit_flag() {
        let args = Args::try_parse_from(["docqa", "search", "who sat?", "-k", "3"]).unwrap();
        match args.command {
            Command::Search { question, limit, json } => {
                assert_eq!(question, "who sat?");
                assert_eq!(limit, Some(3));
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let args = Args::try_parse_from(["docqa", "status", "--config", "alt.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("alt.toml")));
    }

    #[test]
    fn test_ingest_requires_files() {
        assert!(Args::try_parse_from(["docqa", "ingest"]).is_err());
    }
}
