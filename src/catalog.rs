//! Catalog construction: raw rows -> normalized `Problem` records in source order.
//!
//! Rows come from a JSON array of objects keyed by column name. A dataset mapping says which
//! column feeds which field. Catalog order is row order and is the only ordering selectors use.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::classify::detect_topic;
use crate::config::DatasetMapping;
use crate::domain::{Difficulty, OriginalText, Problem, ProblemId, ProblemSource};
use crate::error::{ForgeError, Result};

pub type RawRow = Map<String, Value>;

/// Read the raw row array from disk.
pub fn load_rows(path: &Path) -> Result<Vec<RawRow>> {
  if !path.exists() {
    return Err(ForgeError::NotFound { label: "Input rows", path: path.to_path_buf() });
  }
  let s = std::fs::read_to_string(path).map_err(|e| ForgeError::io(path, e))?;
  serde_json::from_str::<Vec<RawRow>>(&s).map_err(|e| ForgeError::json(path, e))
}

/// Ordered, de-duplicated set of usable problems for one dataset.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
  problems: Vec<Problem>,
}

impl Catalog {
  pub fn problems(&self) -> &[Problem] {
    &self.problems
  }

  pub fn len(&self) -> usize {
    self.problems.len()
  }

  /// Count of problems per tier (tiers with no problems report 0).
  pub fn inventory(&self) -> BTreeMap<Difficulty, usize> {
    let mut counts: BTreeMap<Difficulty, usize> = Difficulty::ALL.iter().map(|d| (*d, 0)).collect();
    for p in &self.problems {
      *counts.entry(p.difficulty).or_insert(0) += 1;
    }
    counts
  }

  /// Normalize every row. Premium rows are dropped; bad rows fail the build under a strict
  /// mapping and are skipped with a warning otherwise.
  #[instrument(level = "info", skip_all, fields(rows = rows.len(), %dataset))]
  pub fn build(rows: &[RawRow], dataset: &str, mapping: &DatasetMapping) -> Result<Self> {
    let dataset_name = mapping.dataset_name.as_deref().unwrap_or(dataset);
    let mut problems = Vec::with_capacity(rows.len());
    let mut seen = HashSet::new();
    let mut premium = 0usize;

    for (i, row) in rows.iter().enumerate() {
      let outcome = normalize_row(row, i + 1, dataset_name, mapping).and_then(|p| match p {
        Some(p) if !seen.insert(p.problem_id.clone()) => {
          Err(format!("duplicate problem id {}", p.problem_id))
        }
        other => Ok(other),
      });

      match outcome {
        Ok(Some(p)) => problems.push(p),
        Ok(None) => premium += 1,
        Err(reason) if mapping.strict => return Err(ForgeError::Row { index: i + 1, reason }),
        Err(reason) => warn!(target: "questforge", row = i + 1, %reason, "Skipping row"),
      }
    }

    if problems.is_empty() {
      return Err(ForgeError::EmptyCatalog);
    }

    let catalog = Self { problems };
    for (difficulty, count) in catalog.inventory() {
      info!(target: "questforge", %difficulty, count, "Catalog inventory");
    }
    info!(target: "questforge", usable = catalog.len(), premium_skipped = premium, "Catalog built");
    Ok(catalog)
  }
}

/// Normalize one row. `Ok(None)` marks a premium row that is intentionally excluded.
fn normalize_row(
  row: &RawRow,
  position: usize,
  dataset_name: &str,
  mapping: &DatasetMapping,
) -> std::result::Result<Option<Problem>, String> {
  let cols = &mapping.columns;

  let (source_id, title, description, difficulty_raw) = match (
    read_text(row, Some(&cols.id)),
    read_text(row, Some(&cols.title)),
    read_text(row, Some(&cols.description)),
    read_text(row, Some(&cols.difficulty)),
  ) {
    (Some(id), Some(t), Some(d), Some(diff)) => (id, t, d, diff),
    _ => return Err("missing one of: id/title/description/difficulty".into()),
  };

  let is_premium = read_text(row, cols.is_premium.as_ref())
    .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    .unwrap_or(false);
  if is_premium {
    return Ok(None);
  }

  let difficulty =
    Difficulty::from_label(&difficulty_raw).ok_or_else(|| format!("unknown difficulty: {}", difficulty_raw))?;

  let examples = read_payload(row, cols.examples.as_ref(), "examples")?;
  let constraints = read_payload(row, cols.constraints.as_ref(), "constraints")?;
  let test_cases = read_payload(row, cols.test_cases.as_ref(), "test_cases")?;
  let (examples, constraints, test_cases) = match (examples, constraints, test_cases) {
    (Some(e), Some(c), Some(t)) => (e, c, t),
    _ => return Err("missing examples/constraints/test_cases (execution required)".into()),
  };

  let source_number = source_number(&source_id).unwrap_or(position as u64);
  let topic = detect_topic(&format!("{}\n{}", title, description));

  Ok(Some(Problem {
    problem_id: ProblemId::from_source_number(source_number),
    difficulty,
    source: ProblemSource { dataset: dataset_name.to_string(), source_question_id: source_id },
    original: OriginalText { title, description },
    topic,
    examples,
    constraints,
    test_cases,
  }))
}

/// Numeric value of a source id. Integral decimal or exponent forms ("42.0", "1e3") count.
fn source_number(id: &str) -> Option<u64> {
  if let Ok(n) = id.parse::<u64>() {
    return Some(n);
  }
  let f = id.parse::<f64>().ok()?;
  if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 {
    Some(f as u64)
  } else {
    None
  }
}

/// Scalar cell as trimmed text; empty cells and unmapped columns read as None.
fn read_text(row: &RawRow, column: Option<&String>) -> Option<String> {
  let s = match row.get(column?)? {
    Value::Null => return None,
    Value::String(s) => s.trim().to_string(),
    other => other.to_string(),
  };
  if s.is_empty() { None } else { Some(s) }
}

/// Payload cell: strings that look like JSON are parsed, other strings kept verbatim,
/// structured values passed through.
fn read_payload(row: &RawRow, column: Option<&String>, field: &str) -> std::result::Result<Option<Value>, String> {
  let Some(column) = column else { return Ok(None) };
  match row.get(column) {
    None | Some(Value::Null) => Ok(None),
    Some(Value::String(s)) => {
      let s = s.trim();
      if s.is_empty() {
        Ok(None)
      } else if s.starts_with('[') || s.starts_with('{') {
        serde_json::from_str(s).map(Some).map_err(|e| format!("invalid JSON in '{}': {}", field, e))
      } else {
        Ok(Some(Value::String(s.to_string())))
      }
    }
    Some(other) => Ok(Some(other.clone())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ColumnMapping;
  use serde_json::json;

  fn mapping(strict: bool) -> DatasetMapping {
    DatasetMapping {
      dataset_name: Some("leetcode".into()),
      strict,
      columns: ColumnMapping {
        id: "id".into(),
        title: "title".into(),
        description: "description".into(),
        difficulty: "difficulty".into(),
        is_premium: Some("is_premium".into()),
        examples: Some("examples".into()),
        constraints: Some("constraints".into()),
        test_cases: Some("test_cases".into()),
      },
    }
  }

  fn row(v: Value) -> RawRow {
    v.as_object().unwrap().clone()
  }

  fn good(id: &str, difficulty: &str) -> RawRow {
    row(json!({
      "id": id,
      "title": "Two Sum",
      "description": "Given an array nums, return indices.",
      "difficulty": difficulty,
      "is_premium": "0",
      "examples": "[{\"input\": \"[2,7]\", \"output\": \"[0,1]\"}]",
      "constraints": "2 <= nums.length",
      "test_cases": [{"input": "x", "output": "y"}]
    }))
  }

  #[test]
  fn normalizes_a_complete_row() {
    let catalog = Catalog::build(&[good("1", "EASY")], "datasetA", &mapping(true)).unwrap();
    let p = &catalog.problems()[0];
    assert_eq!(p.problem_id.as_str(), "prob_000001");
    assert_eq!(p.difficulty, Difficulty::Easy);
    assert_eq!(p.source.dataset, "leetcode");
    assert!(p.examples.is_array());
    assert_eq!(p.constraints, Value::String("2 <= nums.length".into()));
    assert_eq!(p.topic, crate::classify::Topic::Arrays);
  }

  #[test]
  fn premium_rows_are_dropped() {
    let mut premium = good("2", "Hard");
    premium.insert("is_premium".into(), json!(1));
    let catalog = Catalog::build(&[good("1", "Hard"), premium], "d", &mapping(true)).unwrap();
    assert_eq!(catalog.len(), 1);
  }

  #[test]
  fn non_numeric_source_id_uses_row_position() {
    let catalog = Catalog::build(&[good("1", "Easy"), good("two-sum", "Easy")], "d", &mapping(true)).unwrap();
    assert_eq!(catalog.problems()[1].problem_id.as_str(), "prob_000002");
  }

  #[test]
  fn integral_float_source_ids_keep_their_number() {
    let rows = [good("42.0", "Easy"), good("1e3", "Easy"), good("2.5", "Easy")];
    let catalog = Catalog::build(&rows, "d", &mapping(true)).unwrap();
    let ids: Vec<&str> = catalog.problems().iter().map(|p| p.problem_id.as_str()).collect();
    assert_eq!(ids, vec!["prob_000042", "prob_001000", "prob_000003"]);
    assert_eq!(catalog.problems()[1].source.source_question_id, "1e3");
  }

  #[test]
  fn strict_mapping_fails_on_bad_row() {
    let mut bad = good("3", "Medium");
    bad.remove("title");
    let err = Catalog::build(&[good("1", "Easy"), bad], "d", &mapping(true)).unwrap_err();
    assert!(matches!(err, ForgeError::Row { index: 2, .. }));
  }

  #[test]
  fn lenient_mapping_skips_bad_rows() {
    let mut bad_json = good("3", "Medium");
    bad_json.insert("examples".into(), json!("[not json"));
    let bad_diff = good("4", "Legendary");
    let catalog = Catalog::build(&[good("1", "Easy"), bad_json, bad_diff], "d", &mapping(false)).unwrap();
    assert_eq!(catalog.len(), 1);
  }

  #[test]
  fn missing_execution_fields_are_rejected() {
    let mut r = good("5", "Hard");
    r.insert("test_cases".into(), Value::Null);
    assert!(Catalog::build(&[r], "d", &mapping(true)).is_err());
  }

  #[test]
  fn duplicate_ids_keep_first_row() {
    let catalog = Catalog::build(&[good("7", "Easy"), good("7", "Hard")], "d", &mapping(false)).unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.problems()[0].difficulty, Difficulty::Easy);
  }

  #[test]
  fn empty_catalog_is_an_error() {
    let mut bad = good("1", "Easy");
    bad.remove("id");
    assert!(matches!(Catalog::build(&[bad], "d", &mapping(false)), Err(ForgeError::EmptyCatalog)));
  }

  #[test]
  fn inventory_counts_every_tier() {
    let catalog = Catalog::build(&[good("1", "Easy"), good("2", "Hard"), good("3", "hard")], "d", &mapping(true)).unwrap();
    let inv = catalog.inventory();
    assert_eq!(inv[&Difficulty::Easy], 1);
    assert_eq!(inv[&Difficulty::Medium], 0);
    assert_eq!(inv[&Difficulty::Hard], 2);
  }

  #[test]
  fn load_rows_reports_missing_file() {
    assert!(matches!(load_rows(Path::new("/nope/rows.json")), Err(ForgeError::NotFound { .. })));
  }
}
