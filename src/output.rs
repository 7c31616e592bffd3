//! Output documents handed to the content platform: one record per selected problem plus run meta.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::classify::Topic;
use crate::domain::{Difficulty, Mode, OriginalText, Problem, ProblemId, ProblemSource};
use crate::error::{ForgeError, Result};
use crate::narrative::Variant;
use crate::selector::{ChallengeMeta, LearnMeta};
use crate::util::write_json_atomic;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRef {
  pub chapter_id: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
  pub problem_id: ProblemId,
  pub source: ProblemSource,
  pub original: OriginalText,
  pub difficulty: Difficulty,
  pub topic: Topic,
  /// Learn records sit in a story chapter; challenge records carry null.
  pub story: Option<StoryRef>,
  pub examples: Value,
  pub constraints: Value,
  #[serde(rename = "test_cases")]
  pub test_cases: Value,
  pub variants: Vec<Variant>,
}

impl OutputRecord {
  pub fn new(problem: &Problem, mode: Mode, chapter_id: &str, variants: Vec<Variant>) -> Self {
    let story = match mode {
      Mode::Learn => Some(StoryRef { chapter_id: chapter_id.to_string() }),
      Mode::Challenge => None,
    };
    Self {
      problem_id: problem.problem_id.clone(),
      source: problem.source.clone(),
      original: problem.original.clone(),
      difficulty: problem.difficulty,
      topic: problem.topic,
      story,
      examples: problem.examples.clone(),
      constraints: problem.constraints.clone(),
      test_cases: problem.test_cases.clone(),
      variants,
    }
  }

  /// Execution payload and at least one variant must be present.
  pub fn validate(&self) -> Result<()> {
    let missing = |field: &'static str| ForgeError::InvalidRecord { problem_id: self.problem_id.clone(), field };
    if self.original.title.is_empty() {
      return Err(missing("original.title"));
    }
    if self.examples.is_null() {
      return Err(missing("examples"));
    }
    if self.constraints.is_null() {
      return Err(missing("constraints"));
    }
    if self.test_cases.is_null() {
      return Err(missing("test_cases"));
    }
    if self.variants.is_empty() {
      return Err(missing("variants"));
    }
    Ok(())
  }
}

/// Selection diagnostics as they appear in the document meta.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum SelectionSummary {
  Learn { selection: LearnMeta },
  Challenge(ChallengeMeta),
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputMeta {
  pub dataset: String,
  pub mode: Mode,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phase: Option<u32>,
  pub generated_at: String,
  pub run_id: String,
  #[serde(flatten)]
  pub summary: SelectionSummary,
}

impl OutputMeta {
  pub fn new(dataset: &str, mode: Mode, phase: Option<u32>, summary: SelectionSummary) -> Self {
    Self {
      dataset: dataset.to_string(),
      mode,
      phase,
      generated_at: chrono::Utc::now().to_rfc3339(),
      run_id: uuid::Uuid::new_v4().to_string(),
      summary,
    }
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputDocument {
  pub meta: OutputMeta,
  pub items: Vec<OutputRecord>,
}

pub fn output_path(output_dir: &Path, mode: Mode, phase: u32) -> PathBuf {
  match mode {
    Mode::Learn => output_dir.join("learn_programming.json"),
    Mode::Challenge => output_dir.join(format!("challenges_phase_{}.json", phase)),
  }
}

pub fn write_output(path: &Path, doc: &OutputDocument) -> Result<()> {
  write_json_atomic(path, doc)
}
