//! Domain models used by the generator: problem identity, difficulty tiers,
//! catalog entries and the transient selection result.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::Topic;

/// Stable identifier of a catalog problem (`prob_000042`).
/// Derived from the numeric source id, so the same source row maps to the same id on every run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProblemId(String);

impl ProblemId {
  /// `prob_` + source number left-padded with zeros to width 6.
  pub fn from_source_number(n: u64) -> Self {
    Self(format!("prob_{:06}", n))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ProblemId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Closed set of difficulty tiers. Declaration order is the Learn output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

  pub fn as_str(self) -> &'static str {
    match self {
      Difficulty::Easy => "Easy",
      Difficulty::Medium => "Medium",
      Difficulty::Hard => "Hard",
    }
  }

  /// Lenient label parsing: "EASY", "easy-ish", "Level: Hard" all resolve.
  pub fn from_label(raw: &str) -> Option<Self> {
    let v = raw.to_lowercase();
    if v.contains("easy") {
      Some(Difficulty::Easy)
    } else if v.contains("medium") {
      Some(Difficulty::Medium)
    } else if v.contains("hard") {
      Some(Difficulty::Hard)
    } else {
      None
    }
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Which consumption stream a run produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
  Learn,
  Challenge,
}

impl Mode {
  pub fn as_str(self) -> &'static str {
    match self {
      Mode::Learn => "learn",
      Mode::Challenge => "challenge",
    }
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Where a problem came from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProblemSource {
  pub dataset: String,
  pub source_question_id: String,
}

/// Untouched statement text of the source problem.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OriginalText {
  pub title: String,
  pub description: String,
}

/// Normalized catalog entry. Only `problem_id` and `difficulty` matter for selection;
/// the rest is payload carried through to the output stage.
#[derive(Clone, Debug, PartialEq)]
pub struct Problem {
  pub problem_id: ProblemId,
  pub difficulty: Difficulty,
  pub source: ProblemSource,
  pub original: OriginalText,
  pub topic: Topic,
  pub examples: Value,
  pub constraints: Value,
  pub test_cases: Value,
}

/// Outcome of one selector call: ordered picks plus the diagnostics explaining any shortfall.
#[derive(Clone, Debug)]
pub struct SelectionResult<M> {
  pub selected: Vec<Problem>,
  pub meta: M,
}

impl<M> SelectionResult<M> {
  pub fn selected_ids(&self) -> impl Iterator<Item = &ProblemId> + '_ {
    self.selected.iter().map(|p| &p.problem_id)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn problem_id_is_zero_padded() {
    assert_eq!(ProblemId::from_source_number(42).as_str(), "prob_000042");
    assert_eq!(ProblemId::from_source_number(1234567).as_str(), "prob_1234567");
  }

  #[test]
  fn difficulty_labels_are_lenient() {
    assert_eq!(Difficulty::from_label("EASY"), Some(Difficulty::Easy));
    assert_eq!(Difficulty::from_label(" medium "), Some(Difficulty::Medium));
    assert_eq!(Difficulty::from_label("Very Hard"), Some(Difficulty::Hard));
    assert_eq!(Difficulty::from_label("expert"), None);
  }

  #[test]
  fn difficulty_serializes_as_label() {
    assert_eq!(serde_json::to_string(&Difficulty::Medium).unwrap(), "\"Medium\"");
  }
}
