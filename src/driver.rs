//! One generator invocation: config -> catalog -> registry -> allocation -> output.
//!
//! Ordering: registry resets are applied only after the catalog built successfully; the
//! allocation is persisted before anything is refined or written; the output file is written
//! last.

use std::path::PathBuf;

use tracing::{info, instrument, warn};

use crate::catalog::{load_rows, Catalog};
use crate::cli::Cli;
use crate::config::{load_config, ForgeConfig};
use crate::domain::{Difficulty, Mode, Problem};
use crate::error::{ForgeError, Result};
use crate::narrative::make_language_variants;
use crate::output::{output_path, write_output, OutputDocument, OutputMeta, OutputRecord, SelectionSummary};
use crate::refine::{refine_variants, Refiner};
use crate::registry::{Allocation, AllocationRequest, RegistryStore};
use crate::selector::{ChallengeMeta, LearnMeta};

/// What a finished run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub mode: Option<Mode>,
    pub output: Option<PathBuf>,
    pub selected: usize,
}

#[instrument(level = "info", skip_all, fields(dataset = %cli.dataset, mode = ?cli.mode))]
pub async fn run(cli: Cli) -> Result<RunSummary> {
    let cfg = load_config(cli.config.as_deref())?;
    cfg.validate()?;

    let scopes = cli.reset_scopes();
    if cli.mode.is_none() && scopes.is_empty() {
        return Err(ForgeError::Usage(
            "no --mode given: use -m <learn|challenge>, or pass a reset flag (-R, --reset-learn-only, --reset-challenges-only)".into(),
        ));
    }

    let registry_path = cli.registry.clone().unwrap_or_else(|| cfg.paths.registry.clone());
    let store = RegistryStore::new(registry_path, cfg.paths.require_registry);

    let catalog = match cli.mode {
        Some(_) => Some(load_catalog(&cli, &cfg)?),
        None => None,
    };

    if !scopes.is_empty() {
        store.update(|reg| scopes.iter().for_each(|scope| reg.reset(*scope)))?;
    }

    let (Some(mode), Some(catalog)) = (cli.mode, catalog) else {
        info!(target: "questforge", path = %store.path().display(), "Registry reset complete; no mode requested");
        return Ok(RunSummary { mode: None, output: None, selected: 0 });
    };

    let request = match mode {
        Mode::Learn => AllocationRequest::Learn { counts: cfg.counts_per_difficulty()? },
        Mode::Challenge => AllocationRequest::Challenge { phase_size: cfg.phase_size()?, phase: cli.phase },
    };

    let mut registry = store.load()?;
    let allocation = registry.allocate(catalog.problems(), request);
    let (selected, summary, phase) = match allocation {
        Allocation::Learn(result) => {
            log_learn_meta(&result.meta);
            (result.selected, SelectionSummary::Learn { selection: result.meta }, None)
        }
        Allocation::Challenge { phase, result, newly_committed } => {
            log_challenge_meta(phase, newly_committed, &result.meta);
            (result.selected, SelectionSummary::Challenge(result.meta), Some(phase))
        }
    };

    let mut records = build_records(&selected, mode, &cfg)?;
    store.save(&registry)?;
    info!(
        target: "registry",
        learn_used = registry.learn_used_set().len(),
        challenge_used = registry.challenge_used_set().len(),
        phases_completed = registry.phases_completed(),
        "Registry saved"
    );

    let refiner = if cli.skip_ai { None } else { Refiner::from_env() };
    match &refiner {
        Some(r) => info!(target: "refine", base_url = %r.base_url, model = %r.model, "Narrative refinement enabled"),
        None => info!(target: "refine", skip_ai = cli.skip_ai, "Narrative refinement disabled; using template narratives"),
    }
    for (record, problem) in records.iter_mut().zip(&selected) {
        refine_variants(refiner.as_ref(), &cfg.prompts, problem, &mut record.variants).await;
    }

    let output_dir = cli.output_dir.clone().unwrap_or_else(|| cfg.paths.output_dir.clone());
    let path = output_path(&output_dir, mode, cli.phase);
    let doc = OutputDocument { meta: OutputMeta::new(&cli.dataset, mode, phase, summary), items: records };
    write_output(&path, &doc)?;
    info!(target: "questforge", %mode, items = doc.items.len(), path = %path.display(), "Wrote output");

    Ok(RunSummary { mode: Some(mode), output: Some(path), selected: doc.items.len() })
}

fn load_catalog(cli: &Cli, cfg: &ForgeConfig) -> Result<Catalog> {
    let mapping = cfg.dataset(&cli.dataset)?;
    let input = cli
        .input
        .clone()
        .unwrap_or_else(|| cfg.paths.input_dir.join(format!("{}.json", cli.dataset)));
    let rows = load_rows(&input)?;
    info!(target: "questforge", rows = rows.len(), input = %input.display(), "Loaded rows");
    Catalog::build(&rows, &cli.dataset, mapping)
}

/// Template records for the selection, validated before the registry is saved.
fn build_records(selected: &[Problem], mode: Mode, cfg: &ForgeConfig) -> Result<Vec<OutputRecord>> {
    selected
        .iter()
        .map(|p| {
            let variants = make_language_variants(p, &cfg.selection.languages, &cfg.stories, mode);
            let record = OutputRecord::new(p, mode, &cfg.stories.default_chapter_id, variants);
            record.validate()?;
            Ok(record)
        })
        .collect()
}

fn log_learn_meta(meta: &LearnMeta) {
    if !meta.is_fulfilled() {
        for difficulty in Difficulty::ALL {
            let tier = meta.tier(difficulty);
            if tier.shortfall() > 0 {
                warn!(target: "selection", %difficulty, requested = tier.requested, provided = tier.provided, "Learn tier under-filled");
            }
        }
    }
    info!(target: "selection", requested = meta.requested_total, provided = meta.provided_total, "Learn selection done");
}

fn log_challenge_meta(phase: u32, newly_committed: usize, meta: &ChallengeMeta) {
    if let Some(notice) = meta.notice() {
        warn!(target: "selection", phase, %notice, "Challenge pool exhausted");
    }
    info!(
        target: "selection",
        phase,
        requested = meta.requested_count,
        unique = meta.unique_provided,
        repeated = meta.repeated_provided,
        newly_committed,
        "Challenge selection done"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::UsageRegistry;
    use serde_json::{json, Value};
    use std::path::Path;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
[selection]
languages = ["python", "java"]

[selection.learn.counts_per_difficulty]
Easy = 2
Medium = 1
Hard = 2

[selection.challenge]
phase_size = 3

[datasets.datasetA]
dataset_name = "leetcode"
[datasets.datasetA.columns]
id = "id"
title = "title"
description = "description"
difficulty = "difficulty"
examples = "examples"
constraints = "constraints"
test_cases = "test_cases"
"#;

    fn rows() -> Value {
        let mut rows = Vec::new();
        for (i, diff) in ["Easy", "Easy", "Easy", "Medium", "Hard", "Hard", "Hard", "Hard", "Hard", "Hard"]
            .iter()
            .enumerate()
        {
            rows.push(json!({
                "id": (i + 1).to_string(),
                "title": format!("Problem {}", i + 1),
                "description": "Find the longest substring without repeats.",
                "difficulty": diff,
                "examples": "[]",
                "constraints": "1 <= n",
                "test_cases": "[{\"input\": \"abc\", \"output\": \"3\"}]"
            }));
        }
        Value::Array(rows)
    }

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            std::fs::write(dir.path().join("questforge.toml"), CONFIG).unwrap();
            std::fs::write(dir.path().join("rows.json"), rows().to_string()).unwrap();
            Self { dir }
        }

        fn cli(&self, mode: Option<Mode>, phase: u32) -> Cli {
            Cli {
                mode,
                dataset: "datasetA".into(),
                input: Some(self.dir.path().join("rows.json")),
                phase,
                reset_registry: false,
                reset_learn_only: false,
                reset_challenges_only: false,
                skip_ai: true,
                config: Some(self.dir.path().join("questforge.toml")),
                registry: Some(self.registry_path()),
                output_dir: Some(self.dir.path().join("out")),
            }
        }

        fn registry_path(&self) -> PathBuf {
            self.dir.path().join("registry").join("usage_registry.json")
        }

        fn registry(&self) -> UsageRegistry {
            RegistryStore::new(self.registry_path(), true).load().unwrap()
        }

        fn read(&self, path: &Path) -> Value {
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
        }
    }

    #[tokio::test]
    async fn learn_then_challenge_never_overlap() {
        let fx = Fixture::new();

        let learn = run(fx.cli(Some(Mode::Learn), 1)).await.unwrap();
        assert_eq!(learn.selected, 5);
        let doc = fx.read(learn.output.as_ref().unwrap());
        assert_eq!(doc["items"].as_array().unwrap().len(), 5);
        assert_eq!(doc["items"][0]["variants"].as_array().unwrap().len(), 2);
        assert_eq!(doc["meta"]["selection"]["countsPerDifficulty"]["Easy"]["provided"], 2);

        let challenge = run(fx.cli(Some(Mode::Challenge), 1)).await.unwrap();
        assert!(challenge.output.as_ref().unwrap().ends_with("challenges_phase_1.json"));
        let doc = fx.read(challenge.output.as_ref().unwrap());
        assert_eq!(doc["meta"]["uniqueProvided"], 3);
        assert!(doc["meta"]["notice"].is_null());

        let reg = fx.registry();
        assert_eq!(reg.learn_used_set().len(), 5);
        assert_eq!(reg.challenge_used_set().len(), 3);
        assert!(reg.challenge_used_set().iter().all(|id| !reg.learn_used_set().contains(id)));
        assert_eq!(reg.phases_completed(), 1);
    }

    #[tokio::test]
    async fn second_challenge_phase_repeats_with_notice() {
        let fx = Fixture::new();
        run(fx.cli(Some(Mode::Challenge), 1)).await.unwrap();
        run(fx.cli(Some(Mode::Challenge), 2)).await.unwrap();
        let third = run(fx.cli(Some(Mode::Challenge), 3)).await.unwrap();

        let doc = fx.read(third.output.as_ref().unwrap());
        assert_eq!(doc["meta"]["uniqueProvided"], 0);
        assert_eq!(doc["meta"]["repeatedProvided"], 3);
        assert!(doc["meta"]["notice"].as_str().unwrap().contains("Repeated questions"));
        assert_eq!(fx.registry().phases_completed(), 3);
    }

    #[tokio::test]
    async fn reset_only_run_clears_registry() {
        let fx = Fixture::new();
        run(fx.cli(Some(Mode::Learn), 1)).await.unwrap();

        let mut cli = fx.cli(None, 1);
        cli.reset_learn_only = true;
        let summary = run(cli).await.unwrap();
        assert!(summary.output.is_none());
        assert!(fx.registry().learn_used_set().is_empty());
    }

    #[tokio::test]
    async fn missing_mode_without_reset_is_usage_error() {
        let fx = Fixture::new();
        let err = run(fx.cli(None, 1)).await.unwrap_err();
        assert!(matches!(err, ForgeError::Usage(_)));
    }

    #[tokio::test]
    async fn unknown_dataset_leaves_registry_untouched() {
        let fx = Fixture::new();
        let mut cli = fx.cli(Some(Mode::Learn), 1);
        cli.dataset = "nope".into();
        cli.reset_registry = true;
        assert!(matches!(run(cli).await, Err(ForgeError::Config(_))));
        assert!(!fx.registry_path().exists());
    }
}
