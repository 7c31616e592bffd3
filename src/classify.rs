//! Keyword-based topic classification of problem statements.

use std::fmt;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
  Arrays,
  Strings,
  Trees,
  Graphs,
  Dp,
  Hashmap,
  StackQueue,
  SortingSearching,
  General,
}

impl Topic {
  pub fn as_str(self) -> &'static str {
    match self {
      Topic::Arrays => "arrays",
      Topic::Strings => "strings",
      Topic::Trees => "trees",
      Topic::Graphs => "graphs",
      Topic::Dp => "dp",
      Topic::Hashmap => "hashmap",
      Topic::StackQueue => "stack_queue",
      Topic::SortingSearching => "sorting_searching",
      Topic::General => "general",
    }
  }
}

impl fmt::Display for Topic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// Checked in order; first keyword hit wins.
const RULES: &[(Topic, &[&str])] = &[
  (Topic::Arrays, &["array", "nums", "subarray", "prefix", "two sum", "indices"]),
  (Topic::Strings, &["string", "substring", "palindrome", "anagram", "char"]),
  (Topic::Trees, &["tree", "binary tree", "bst", "node", "left", "right", "traversal"]),
  (Topic::Graphs, &["graph", "edges", "bfs", "dfs", "adjacent"]),
  (Topic::Dp, &["dynamic programming", "dp", "memo", "tabulation", "knapsack"]),
  (Topic::Hashmap, &["hash", "map", "dictionary", "frequency"]),
  (Topic::StackQueue, &["stack", "queue", "monotonic"]),
  (Topic::SortingSearching, &["sort", "sorted", "binary search", "search"]),
];

pub fn detect_topic(text: &str) -> Topic {
  let t = text.to_lowercase();
  RULES
    .iter()
    .find(|(_, keys)| keys.iter().any(|k| t.contains(k)))
    .map(|(topic, _)| *topic)
    .unwrap_or(Topic::General)
}
