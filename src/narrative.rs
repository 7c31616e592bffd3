//! Story wrapping for selected problems: phrase banks, per-language variants and starter code.
//!
//! Everything here is a deterministic function of the problem, language and mode, so re-running
//! with the same selection yields byte-identical narratives.

use serde::{Deserialize, Serialize};

use crate::classify::Topic;
use crate::config::Stories;
use crate::domain::{Mode, Problem, ProblemId};
use crate::util::pick_deterministic;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
  pub title: String,
  pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
  pub variant_id: String,
  pub language: String,
  pub story_id: String,
  pub template_id: String,
  pub narrative: Narrative,
  pub starter_code: &'static str,
}

const COMMON_LEARN: &[&str] = &[
  "Here's your next task.",
  "Let's move to the next clue.",
  "Time for your next training step.",
  "You've got a new lead to follow.",
  "A fresh report just came in.",
];

const COMMON_CHALLENGE: &[&str] = &[
  "This one is high stakes.",
  "This challenge won't be easy.",
  "You'll need to be precise here.",
  "No room for mistakes on this one.",
  "This is a serious test of skill.",
];

const DETECTIVE_LEARN: &[&str] = &[
  "Detective, a new case note arrives.",
  "Detective, your evidence board needs an update.",
  "Detective, the next lead is waiting.",
  "Detective, you're back at the crime scene.",
  "Detective, you've found a suspicious pattern.",
];

const DETECTIVE_CHALLENGE: &[&str] = &[
  "Detective, this case could collapse if you fail.",
  "Detective, the suspect is one step ahead.",
  "Detective, time is running out.",
  "Detective, you must verify every detail.",
  "Detective, one wrong move ruins the trail.",
];

const PIRATE_LEARN: &[&str] = &[
  "Captain, the crew requests guidance.",
  "Captain, your map shows a new route.",
  "Captain, a sealed chest contains a puzzle.",
  "Captain, the lookout reports strange signals.",
  "Captain, the ship's log needs an answer.",
];

const PIRATE_CHALLENGE: &[&str] = &[
  "Captain, this raid decides everything.",
  "Captain, enemies are closing in fast.",
  "Captain, the treasure route is guarded.",
  "Captain, the storm won't wait for you.",
  "Captain, your crew is counting on this.",
];

const NO_PHRASES: &[&str] = &[];

/// Common phrases for the mode, extended by the story's own bank when it has one.
fn phrase_bank(story_id: &str, mode: Mode) -> Vec<&'static str> {
  let (base, extra): (&[&str], &[&str]) = match (story_id, mode) {
    ("detective_v1", Mode::Learn) => (COMMON_LEARN, DETECTIVE_LEARN),
    ("detective_v1", Mode::Challenge) => (COMMON_CHALLENGE, DETECTIVE_CHALLENGE),
    ("pirate_v1", Mode::Learn) => (COMMON_LEARN, PIRATE_LEARN),
    ("pirate_v1", Mode::Challenge) => (COMMON_CHALLENGE, PIRATE_CHALLENGE),
    (_, Mode::Learn) => (COMMON_LEARN, NO_PHRASES),
    (_, Mode::Challenge) => (COMMON_CHALLENGE, NO_PHRASES),
  };
  base.iter().chain(extra).copied().collect()
}

pub fn template_id(story_id: &str, topic: Topic, mode: Mode) -> String {
  format!("{}_{}_{}_01", story_id, topic, mode)
}

pub fn variant_id(problem_id: &ProblemId, language: &str, story_id: &str) -> String {
  format!("{}_{}_{}", problem_id, language, story_id)
}

/// Wrap the original statement in a story phrase without changing its meaning.
pub fn build_narrative(story_id: &str, mode: Mode, problem: &Problem, language: &str) -> Narrative {
  let bank = phrase_bank(story_id, mode);
  let key = format!("{}_{}_{}", problem.problem_id, language, mode);
  let phrase = pick_deterministic(&bank, &key).copied().unwrap_or_default();

  let closing = match mode {
    Mode::Challenge => "Use the given test cases to validate your solution.",
    Mode::Learn => "Focus on writing a clear solution before checking test cases.",
  };

  Narrative {
    title: format!("{} ({})", phrase, problem.topic),
    description: format!(
      "{}\n\nTask: {}\n{}\n\n{}",
      phrase, problem.original.title, problem.original.description, closing
    ),
  }
}

pub fn starter_code(language: &str) -> &'static str {
  match language {
    "python" => "def solve():\n    # TODO: implement solution\n    pass\n\nif __name__ == '__main__':\n    solve()\n",
    "java" => "import java.util.*;\n\nclass Main {\n  public static void main(String[] args) {\n    // TODO: implement solution\n  }\n}\n",
    "cpp" => "#include <bits/stdc++.h>\nusing namespace std;\n\nint main() {\n  // TODO: implement solution\n  return 0;\n}\n",
    "javascript" => "function solve(input) {\n  // TODO: implement solution\n  return '';\n}\n\nprocess.stdin.resume();\nprocess.stdin.setEncoding('utf8');\nlet data='';\nprocess.stdin.on('data', c => data += c);\nprocess.stdin.on('end', () => {\n  const out = solve(data.trim());\n  process.stdout.write(String(out));\n});\n",
    _ => "// TODO: implement solution\n",
  }
}

/// One variant per configured language, in configuration order.
pub fn make_language_variants(problem: &Problem, languages: &[String], stories: &Stories, mode: Mode) -> Vec<Variant> {
  languages
    .iter()
    .map(|language| {
      let story_id = stories.story_for(language);
      Variant {
        variant_id: variant_id(&problem.problem_id, language, story_id),
        language: language.clone(),
        story_id: story_id.to_string(),
        template_id: template_id(story_id, problem.topic, mode),
        narrative: build_narrative(story_id, mode, problem, language),
        starter_code: starter_code(language),
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::fixtures::problem;
  use crate::domain::Difficulty;

  fn langs() -> Vec<String> {
    vec!["python".into(), "java".into(), "rust".into()]
  }

  #[test]
  fn variants_follow_language_order_and_story_map() {
    let p = problem(7, Difficulty::Hard);
    let variants = make_language_variants(&p, &langs(), &Stories::default(), Mode::Challenge);
    assert_eq!(variants.len(), 3);
    assert_eq!(variants[0].variant_id, "prob_000007_python_detective_v1");
    assert_eq!(variants[1].story_id, "generic_v1");
    assert_eq!(variants[0].template_id, "detective_v1_arrays_challenge_01");
    assert_eq!(variants[2].starter_code, "// TODO: implement solution\n");
  }

  #[test]
  fn narrative_is_deterministic_and_keeps_the_task() {
    let p = problem(3, Difficulty::Easy);
    let a = build_narrative("pirate_v1", Mode::Learn, &p, "python");
    let b = build_narrative("pirate_v1", Mode::Learn, &p, "python");
    assert_eq!(a, b);
    assert!(a.title.ends_with("(arrays)"));
    assert!(a.description.contains("Task: Problem 3"));
    assert!(a.description.contains("Given an array nums"));
    assert!(a.description.ends_with("before checking test cases."));
  }

  #[test]
  fn story_banks_extend_common_phrases() {
    assert_eq!(phrase_bank("detective_v1", Mode::Learn).len(), 10);
    assert_eq!(phrase_bank("cyberpunk_v1", Mode::Challenge).len(), 5);
    assert!(phrase_bank("pirate_v1", Mode::Challenge).contains(&"Captain, this raid decides everything."));
  }

  #[test]
  fn challenge_closing_line() {
    let n = build_narrative("generic_v1", Mode::Challenge, &problem(1, Difficulty::Hard), "cpp");
    assert!(n.description.ends_with("validate your solution."));
    assert!(COMMON_CHALLENGE.iter().any(|phrase| n.title.starts_with(phrase)));
  }
}
