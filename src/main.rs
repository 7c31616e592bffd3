//! QuestForge · story-wrapped coding practice generator
//!
//! - Splits a problem catalog into Learn (balanced by difficulty) and Challenge (Hard-only,
//!   phased) streams that never overlap
//! - Persists usage between runs in a JSON registry so problems are not reused until reset
//! - Optional LLM refinement of narratives (OpenAI-compatible API)
//!
//! Important env variables:
//!   QUESTFORGE_CONFIG : path to TOML config (default config/questforge.toml)
//!   DEFAULT_DATASET   : dataset name when -d is absent
//!   DEFAULT_MODE      : learn | challenge when -m is absent
//!   OPENAI_API_KEY    : enables narrative refinement if present
//!   OPENAI_BASE_URL   : default "https://api.openai.com/v1"
//!   OPENAI_MODEL      : default "gpt-4o-mini"
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

mod catalog;
mod classify;
mod cli;
mod config;
mod domain;
mod driver;
mod error;
mod narrative;
mod output;
mod refine;
mod registry;
mod selector;
mod telemetry;
mod util;

use clap::Parser;
use tracing::{error, info};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> std::process::ExitCode {
  telemetry::init_tracing();
  let cli = Cli::parse();

  match driver::run(cli).await {
    Ok(summary) => {
      info!(target: "questforge", mode = ?summary.mode, selected = summary.selected, output = ?summary.output, "Done");
      std::process::ExitCode::SUCCESS
    }
    Err(e) => {
      error!(target: "questforge", error = %e, "Run failed");
      std::process::ExitCode::FAILURE
    }
  }
}
