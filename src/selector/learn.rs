//! Learn selection: a fixed number of problems per difficulty tier, first-N in catalog order.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::CountsPerDifficulty;
use crate::domain::{Difficulty, Problem, SelectionResult};

/// Requested vs. delivered count for one tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TierFulfillment {
    pub requested: usize,
    pub provided: usize,
}

impl TierFulfillment {
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.provided)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnMeta {
    pub counts_per_difficulty: BTreeMap<Difficulty, TierFulfillment>,
    pub requested_total: usize,
    pub provided_total: usize,
    /// Set when at least one tier came up short.
    pub notice: Option<String>,
}

impl LearnMeta {
    pub fn tier(&self, difficulty: Difficulty) -> TierFulfillment {
        self.counts_per_difficulty
            .get(&difficulty)
            .copied()
            .unwrap_or(TierFulfillment { requested: 0, provided: 0 })
    }

    pub fn is_fulfilled(&self) -> bool {
        self.counts_per_difficulty.values().all(|t| t.shortfall() == 0)
    }
}

/// Pick up to `counts.get(tier)` problems of each tier.
///
/// `all_problems` must already exclude Learn-used ids. Output is Easy, then Medium, then Hard,
/// each in catalog order. A short tier yields what it has and is reported in the meta.
pub fn pick_learn_problems(
    all_problems: &[Problem],
    counts: &CountsPerDifficulty,
) -> SelectionResult<LearnMeta> {
    let mut selected = Vec::with_capacity(counts.total().min(all_problems.len()));
    let mut per_tier = BTreeMap::new();

    for difficulty in Difficulty::ALL {
        let requested = counts.get(difficulty);
        let before = selected.len();
        selected.extend(
            all_problems
                .iter()
                .filter(|p| p.difficulty == difficulty)
                .take(requested)
                .cloned(),
        );
        let provided = selected.len() - before;
        per_tier.insert(difficulty, TierFulfillment { requested, provided });
    }

    let short: Vec<String> = per_tier
        .iter()
        .filter(|(_, t)| t.shortfall() > 0)
        .map(|(d, t)| format!("{} {}/{}", d, t.provided, t.requested))
        .collect();
    let notice = if short.is_empty() {
        None
    } else {
        Some(format!(
            "Not enough unused Learn problems for every difficulty ({} provided/requested). \
             Reset the Learn registry or grow the dataset.",
            short.join(", ")
        ))
    };

    let meta = LearnMeta {
        counts_per_difficulty: per_tier,
        requested_total: counts.total(),
        provided_total: selected.len(),
        notice,
    };
    SelectionResult { selected, meta }
}
