use clap::{Parser, ValueEnum};

use crate::matcher::DEFAULT_TOP_N;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum MatcherChoice {
    /// Embedding + nearest-neighbour matching (default)
    Embedding,
    /// Tiered string-similarity matching, no model download
    Lexical,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Free-text symptom description
    #[arg(short, long)]
    pub symptom: String,

    /// Number of candidate labels to resolve
    #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_N)]
    pub top_n: usize,

    /// Label matching strategy
    #[arg(long, value_enum, default_value = "embedding")]
    pub matcher: MatcherChoice,

    /// Print the composed prompt instead of calling the generation service
    #[arg(long)]
    pub dry_run: bool,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
