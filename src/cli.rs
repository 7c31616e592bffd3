//! Command-line arguments (clap derive). Flags win over env vars, env vars over config.

use std::path::PathBuf;

use clap::Parser;

use crate::domain::Mode;
use crate::registry::ResetScope;

#[derive(Parser, Debug)]
#[command(name = "questforge")]
#[command(about = "Generate story-wrapped Learn and Challenge coding sets from a problem catalog", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Stream to generate; may be omitted when only resetting the registry
    #[arg(short, long, value_enum, env = "DEFAULT_MODE")]
    pub mode: Option<Mode>,

    /// Dataset name (selects the [datasets.<name>] mapping)
    #[arg(short, long, env = "DEFAULT_DATASET", default_value = "datasetA")]
    pub dataset: String,

    /// Input rows (JSON array); defaults to <input_dir>/<dataset>.json
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Challenge phase number
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub phase: u32,

    /// Clear the whole usage registry before selecting
    #[arg(short = 'R', long = "reset-registry")]
    pub reset_registry: bool,

    /// Clear only Learn usage
    #[arg(long)]
    pub reset_learn_only: bool,

    /// Clear only Challenge usage and the phase counter
    #[arg(long)]
    pub reset_challenges_only: bool,

    /// Skip LLM narrative refinement even if OPENAI_API_KEY is set
    #[arg(long)]
    pub skip_ai: bool,

    /// TOML config path
    #[arg(short, long, env = "QUESTFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Usage registry path (overrides config)
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Output directory (overrides config)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl Cli {
    /// Resets in application order. A full reset subsumes the partial ones.
    pub fn reset_scopes(&self) -> Vec<ResetScope> {
        if self.reset_registry {
            return vec![ResetScope::All];
        }
        let mut scopes = Vec::new();
        if self.reset_learn_only {
            scopes.push(ResetScope::LearnOnly);
        }
        if self.reset_challenges_only {
            scopes.push(ResetScope::ChallengesOnly);
        }
        scopes
    }
}
