//! Loading generator configuration (selection rules, stories, dataset mappings, prompts) from TOML.
//!
//! See `ForgeConfig` for the expected schema. Every section is optional; numeric rules are
//! read as signed integers so that negative values surface as configuration errors instead of
//! TOML type errors.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::Difficulty;
use crate::error::{ForgeError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config/questforge.toml";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ForgeConfig {
  #[serde(default)]
  pub selection: SelectionRules,
  #[serde(default)]
  pub stories: Stories,
  #[serde(default)]
  pub datasets: BTreeMap<String, DatasetMapping>,
  #[serde(default)]
  pub paths: Paths,
  #[serde(default)]
  pub prompts: Prompts,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SelectionRules {
  #[serde(default = "default_languages")]
  pub languages: Vec<String>,
  #[serde(default)]
  pub learn: LearnRules,
  #[serde(default)]
  pub challenge: ChallengeRules,
}

impl Default for SelectionRules {
  fn default() -> Self {
    Self { languages: default_languages(), learn: LearnRules::default(), challenge: ChallengeRules::default() }
  }
}

fn default_languages() -> Vec<String> {
  ["python", "java", "cpp", "javascript"].iter().map(|s| s.to_string()).collect()
}

#[derive(Clone, Debug, Deserialize)]
pub struct LearnRules {
  /// Keys are tier labels ("Easy", "Medium", "Hard").
  pub counts_per_difficulty: BTreeMap<String, i64>,
}

impl Default for LearnRules {
  fn default() -> Self {
    let counts_per_difficulty = Difficulty::ALL.iter().map(|d| (d.as_str().to_string(), 15)).collect();
    Self { counts_per_difficulty }
  }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChallengeRules {
  pub phase_size: i64,
}

impl Default for ChallengeRules {
  fn default() -> Self {
    Self { phase_size: 30 }
  }
}

/// Which story wraps which language's variant.
#[derive(Clone, Debug, Deserialize)]
pub struct Stories {
  #[serde(default = "default_story")]
  pub default_story: String,
  #[serde(default = "default_chapter_id")]
  pub default_chapter_id: String,
  #[serde(default)]
  pub language_to_story: BTreeMap<String, String>,
}

impl Default for Stories {
  fn default() -> Self {
    let language_to_story = [("python", "detective_v1"), ("javascript", "pirate_v1")]
      .iter()
      .map(|(l, s)| (l.to_string(), s.to_string()))
      .collect();
    Self { default_story: default_story(), default_chapter_id: default_chapter_id(), language_to_story }
  }
}

fn default_story() -> String { "generic_v1".into() }
fn default_chapter_id() -> String { "chapter_01".into() }

impl Stories {
  pub fn story_for(&self, language: &str) -> &str {
    self.language_to_story.get(language).map(String::as_str).unwrap_or(&self.default_story)
  }
}

/// How raw rows of one dataset map onto problem fields.
#[derive(Clone, Debug, Deserialize)]
pub struct DatasetMapping {
  /// Name recorded in `source.dataset`; falls back to the mapping key.
  #[serde(default)]
  pub dataset_name: Option<String>,
  /// Fail the run on the first bad row instead of skipping it.
  #[serde(default)]
  pub strict: bool,
  pub columns: ColumnMapping,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ColumnMapping {
  pub id: String,
  pub title: String,
  pub description: String,
  pub difficulty: String,
  #[serde(default)] pub is_premium: Option<String>,
  #[serde(default)] pub examples: Option<String>,
  #[serde(default)] pub constraints: Option<String>,
  #[serde(default)] pub test_cases: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Paths {
  #[serde(default = "default_registry_path")]
  pub registry: PathBuf,
  #[serde(default = "default_output_dir")]
  pub output_dir: PathBuf,
  #[serde(default = "default_input_dir")]
  pub input_dir: PathBuf,
  /// When true a missing registry file is fatal instead of bootstrapping an empty one.
  #[serde(default)]
  pub require_registry: bool,
}

impl Default for Paths {
  fn default() -> Self {
    Self {
      registry: default_registry_path(),
      output_dir: default_output_dir(),
      input_dir: default_input_dir(),
      require_registry: false,
    }
  }
}

fn default_registry_path() -> PathBuf { PathBuf::from("data/registry/usage_registry.json") }
fn default_output_dir() -> PathBuf { PathBuf::from("data/output") }
fn default_input_dir() -> PathBuf { PathBuf::from("data/input") }

/// Prompts used by the narrative refiner. Defaults keep the coding task untouched.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub refine_system: String,
  pub refine_user_template: String,
  /// story id -> persona description; `generic_v1` is the fallback.
  pub personas: BTreeMap<String, String>,
}

impl Default for Prompts {
  fn default() -> Self {
    let personas = [
      ("detective_v1", "Noir Detective (gritty, mysterious, uses terms like 'suspect', 'clue', 'lead', 'case')"),
      ("pirate_v1", "High Seas Pirate (adventure, risk, uses terms like 'captain', 'loot', 'horizon', 'plank')"),
      ("cyberpunk_v1", "Cyberpunk Hacker (dystopian, neon-lit, uses terms like 'mainframe', 'glitch', 'cyberware')"),
      ("spy_v1", "Covert Secret Agent (sleek, tactical, uses terms like 'intel', 'mission', 'asset', 'classified')"),
      ("generic_v1", "Helpful Mentor (clean, clear, neutral, encouraging)"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Self {
      refine_system: "You are a Narrative Refinement Assistant. Refine the title and description to match the persona.\n\
        Constraints: output strictly valid JSON {\"title\": string, \"description\": string}; \
        NEVER change the coding task, constraints or technical details; no hints or solution explanations.\n\
        Difficulty tone: Easy = encouraging and calm, Medium = focused and professional, Hard = serious and high-stakes.".into(),
      refine_user_template: "Persona: {persona}\nDifficulty: {difficulty}\nTopic: {topic}\n\nTitle: \"{title}\"\nDescription: \"{description}\"\n\nRewrite the title and description as JSON.".into(),
      personas,
    }
  }
}

impl Prompts {
  pub fn persona_for(&self, story_id: &str) -> &str {
    self.personas
      .get(story_id)
      .or_else(|| self.personas.get("generic_v1"))
      .map(String::as_str)
      .unwrap_or("Helpful Mentor")
  }
}

/// Validated per-tier Learn targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountsPerDifficulty {
  pub easy: usize,
  pub medium: usize,
  pub hard: usize,
}

impl CountsPerDifficulty {
  pub fn new(easy: usize, medium: usize, hard: usize) -> Self {
    Self { easy, medium, hard }
  }

  pub fn get(&self, difficulty: Difficulty) -> usize {
    match difficulty {
      Difficulty::Easy => self.easy,
      Difficulty::Medium => self.medium,
      Difficulty::Hard => self.hard,
    }
  }

  pub fn total(&self) -> usize {
    self.easy.saturating_add(self.medium).saturating_add(self.hard)
  }
}

impl ForgeConfig {
  /// Every tier must be present with a non-negative count; unknown tier keys are rejected.
  pub fn counts_per_difficulty(&self) -> Result<CountsPerDifficulty> {
    let raw = &self.selection.learn.counts_per_difficulty;
    if let Some(unknown) = raw.keys().find(|k| !Difficulty::ALL.iter().any(|d| d.as_str() == k.as_str())) {
      return Err(ForgeError::Config(format!("unknown difficulty '{}' in learn.counts_per_difficulty", unknown)));
    }

    let count = |d: Difficulty| -> Result<usize> {
      let n = raw
        .get(d.as_str())
        .ok_or_else(|| ForgeError::Config(format!("learn.counts_per_difficulty is missing '{}'", d)))?;
      usize::try_from(*n)
        .map_err(|_| ForgeError::Config(format!("learn.counts_per_difficulty.{} must be >= 0 (got {})", d, n)))
    };

    Ok(CountsPerDifficulty::new(count(Difficulty::Easy)?, count(Difficulty::Medium)?, count(Difficulty::Hard)?))
  }

  pub fn phase_size(&self) -> Result<usize> {
    let n = self.selection.challenge.phase_size;
    usize::try_from(n).map_err(|_| ForgeError::Config(format!("challenge.phase_size must be >= 0 (got {})", n)))
  }

  pub fn dataset(&self, name: &str) -> Result<&DatasetMapping> {
    self.datasets
      .get(name)
      .ok_or_else(|| ForgeError::Config(format!("no [datasets.{}] mapping configured", name)))
  }

  /// Fail fast on malformed rules before any input is touched.
  pub fn validate(&self) -> Result<()> {
    self.counts_per_difficulty()?;
    self.phase_size()?;
    if self.selection.languages.is_empty() {
      return Err(ForgeError::Config("selection.languages must not be empty".into()));
    }
    Ok(())
  }
}

/// Load config from an explicit path (must exist) or from the default location (optional).
pub fn load_config(explicit: Option<&Path>) -> Result<ForgeConfig> {
  let path = explicit.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
  if !path.exists() {
    if explicit.is_some() {
      return Err(ForgeError::NotFound { label: "Config file", path: path.to_path_buf() });
    }
    warn!(target: "questforge", path = %path.display(), "No config file; using built-in defaults");
    return Ok(ForgeConfig::default());
  }

  let s = std::fs::read_to_string(path).map_err(|e| ForgeError::io(path, e))?;
  let cfg = toml::from_str::<ForgeConfig>(&s)
    .map_err(|e| ForgeError::ConfigParse { path: path.to_path_buf(), source: e })?;
  info!(target: "questforge", path = %path.display(), datasets = cfg.datasets.len(), "Loaded config (TOML)");
  Ok(cfg)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(s: &str) -> ForgeConfig {
    toml::from_str(s).unwrap()
  }

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = parse("");
    assert_eq!(cfg.counts_per_difficulty().unwrap(), CountsPerDifficulty::new(15, 15, 15));
    assert_eq!(cfg.phase_size().unwrap(), 30);
    assert_eq!(cfg.selection.languages.len(), 4);
    assert!(cfg.validate().is_ok());
  }

  #[test]
  fn negative_count_is_rejected() {
    let cfg = parse(
      r#"
      [selection.learn.counts_per_difficulty]
      Easy = -1
      Medium = 2
      Hard = 3
      "#,
    );
    assert!(matches!(cfg.counts_per_difficulty(), Err(ForgeError::Config(_))));
    assert!(cfg.validate().is_err());
  }

  #[test]
  fn missing_tier_is_rejected() {
    let cfg = parse(
      r#"
      [selection.learn.counts_per_difficulty]
      Easy = 1
      Hard = 3
      "#,
    );
    let err = cfg.counts_per_difficulty().unwrap_err();
    assert!(err.to_string().contains("Medium"));
  }

  #[test]
  fn negative_phase_size_is_rejected() {
    let cfg = parse("[selection.challenge]\nphase_size = -5\n");
    assert!(cfg.phase_size().is_err());
  }

  #[test]
  fn dataset_mapping_parses() {
    let cfg = parse(
      r#"
      [datasets.datasetA]
      strict = true
      [datasets.datasetA.columns]
      id = "id"
      title = "title"
      description = "description"
      difficulty = "difficulty"
      is_premium = "is_premium"
      "#,
    );
    let m = cfg.dataset("datasetA").unwrap();
    assert!(m.strict);
    assert_eq!(m.columns.is_premium.as_deref(), Some("is_premium"));
    assert!(cfg.dataset("missing").is_err());
  }

  #[test]
  fn story_and_persona_fallbacks() {
    let cfg = ForgeConfig::default();
    assert_eq!(cfg.stories.story_for("python"), "detective_v1");
    assert_eq!(cfg.stories.story_for("cpp"), "generic_v1");
    assert!(cfg.prompts.persona_for("unknown_v9").starts_with("Helpful Mentor"));
  }

  #[test]
  fn explicit_missing_config_is_not_found() {
    let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
    assert!(matches!(err, ForgeError::NotFound { .. }));
  }
}
