//! Usage registry: which problems were already handed out to Learn or Challenge.
//!
//! This is the only state that survives between runs. It is persisted as JSON
//! (`learnUsedProblemIds`, `challengeUsedHardProblemIds`, `phasesCompleted`) and held in memory
//! as insertion-ordered sets. `RegistryStore::update` wraps one load-mutate-save cycle so a
//! mutation is never left unsaved.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::CountsPerDifficulty;
use crate::domain::{Difficulty, Problem, ProblemId, SelectionResult};
use crate::error::{ForgeError, Result};
use crate::selector::{pick_challenge_hard_phase, pick_learn_problems, ChallengeMeta, ChallengeRequest, LearnMeta};
use crate::util::write_json_atomic;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageRegistry {
    #[serde(default, rename = "learnUsedProblemIds")]
    learn_used: IndexSet<ProblemId>,
    #[serde(default, rename = "challengeUsedHardProblemIds")]
    challenge_used_hard: IndexSet<ProblemId>,
    #[serde(default, rename = "phasesCompleted")]
    phases_completed: u32,
}

/// Coarse configuration of the registry, used for logging reset transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryState {
    Empty,
    LearnOnly,
    ChallengeOnly,
    Both,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetScope {
    All,
    LearnOnly,
    ChallengesOnly,
}

/// What one invocation asks the registry to hand out.
#[derive(Clone, Copy, Debug)]
pub enum AllocationRequest {
    Learn { counts: CountsPerDifficulty },
    Challenge { phase_size: usize, phase: u32 },
}

#[derive(Clone, Debug)]
pub enum Allocation {
    Learn(SelectionResult<LearnMeta>),
    Challenge {
        phase: u32,
        result: SelectionResult<ChallengeMeta>,
        /// Ids recorded as Challenge-used by this allocation (repeats excluded).
        newly_committed: usize,
    },
}

impl UsageRegistry {
    pub fn learn_used_set(&self) -> &IndexSet<ProblemId> {
        &self.learn_used
    }

    pub fn challenge_used_set(&self) -> &IndexSet<ProblemId> {
        &self.challenge_used_hard
    }

    pub fn phases_completed(&self) -> u32 {
        self.phases_completed
    }

    pub fn state(&self) -> RegistryState {
        match (self.learn_used.is_empty(), self.challenge_used_hard.is_empty()) {
            (true, true) => RegistryState::Empty,
            (false, true) => RegistryState::LearnOnly,
            (true, false) => RegistryState::ChallengeOnly,
            (false, false) => RegistryState::Both,
        }
    }

    /// Union `ids` into the Learn-used set. Returns how many were new.
    pub fn add_learn_used<I: IntoIterator<Item = ProblemId>>(&mut self, ids: I) -> usize {
        ids.into_iter().filter(|id| self.learn_used.insert(id.clone())).count()
    }

    /// Union `ids` into the Challenge-used set and raise the phase counter to at least `phase`.
    /// Returns how many ids were new.
    pub fn add_challenge_used_hard<I: IntoIterator<Item = ProblemId>>(&mut self, ids: I, phase: u32) -> usize {
        let added = ids.into_iter().filter(|id| self.challenge_used_hard.insert(id.clone())).count();
        self.phases_completed = self.phases_completed.max(phase);
        added
    }

    pub fn reset_all(&mut self) {
        self.learn_used.clear();
        self.challenge_used_hard.clear();
        self.phases_completed = 0;
    }

    pub fn reset_learn_only(&mut self) {
        self.learn_used.clear();
    }

    /// Phase numbering restarts together with the pool it numbers.
    pub fn reset_challenges_only(&mut self) {
        self.challenge_used_hard.clear();
        self.phases_completed = 0;
    }

    pub fn reset(&mut self, scope: ResetScope) {
        let before = self.state();
        match scope {
            ResetScope::All => self.reset_all(),
            ResetScope::LearnOnly => self.reset_learn_only(),
            ResetScope::ChallengesOnly => self.reset_challenges_only(),
        }
        warn!(target: "registry", ?scope, ?before, after = ?self.state(), "Registry reset");
    }

    /// Select and commit in one step, consulting both used-sets.
    ///
    /// Learn draws from problems used by neither stream. Challenge draws from Hard problems not
    /// used by Learn and records only ids that were genuinely new. The phase counter moves only
    /// when a challenge selection is non-empty.
    pub fn allocate(&mut self, catalog: &[Problem], request: AllocationRequest) -> Allocation {
        match request {
            AllocationRequest::Learn { counts } => {
                let available: Vec<Problem> = catalog
                    .iter()
                    .filter(|p| !self.learn_used.contains(&p.problem_id))
                    .filter(|p| !self.challenge_used_hard.contains(&p.problem_id))
                    .cloned()
                    .collect();
                debug!(target: "registry", available = available.len(), "Learn pool after exclusions");

                let result = pick_learn_problems(&available, &counts);
                let added = self.add_learn_used(result.selected_ids().cloned());
                debug!(target: "registry", added, total = self.learn_used.len(), "Committed Learn ids");
                Allocation::Learn(result)
            }
            AllocationRequest::Challenge { phase_size, phase } => {
                let hard: Vec<Problem> = catalog.iter().filter(|p| p.difficulty == Difficulty::Hard).cloned().collect();
                let result = pick_challenge_hard_phase(ChallengeRequest {
                    hard_problems: &hard,
                    learn_used: &self.learn_used,
                    challenge_used: &self.challenge_used_hard,
                    phase_size,
                });

                let fresh: Vec<ProblemId> = result
                    .selected_ids()
                    .filter(|id| !self.learn_used.contains(*id) && !self.challenge_used_hard.contains(*id))
                    .cloned()
                    .collect();
                let newly_committed = if result.selected.is_empty() {
                    0
                } else {
                    self.add_challenge_used_hard(fresh, phase)
                };
                debug!(
                    target: "registry",
                    phase,
                    newly_committed,
                    phases_completed = self.phases_completed,
                    "Committed Challenge ids"
                );
                Allocation::Challenge { phase, result, newly_committed }
            }
        }
    }
}

/// Durable home of a `UsageRegistry`.
#[derive(Clone, Debug)]
pub struct RegistryStore {
    path: PathBuf,
    /// Missing file is `NotFound` instead of an empty bootstrap registry.
    require_existing: bool,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>, require_existing: bool) -> Self {
        Self { path: path.into(), require_existing }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<UsageRegistry> {
        if !self.path.exists() {
            if self.require_existing {
                return Err(ForgeError::NotFound { label: "Usage registry", path: self.path.clone() });
            }
            info!(target: "registry", path = %self.path.display(), "No registry yet; starting empty");
            return Ok(UsageRegistry::default());
        }

        let s = std::fs::read_to_string(&self.path).map_err(|e| ForgeError::io(&self.path, e))?;
        let registry: UsageRegistry = serde_json::from_str(&s).map_err(|e| ForgeError::json(&self.path, e))?;
        debug!(
            target: "registry",
            learn_used = registry.learn_used.len(),
            challenge_used = registry.challenge_used_hard.len(),
            phases_completed = registry.phases_completed,
            "Registry loaded"
        );
        Ok(registry)
    }

    /// Write-to-temp-then-rename; the previous file survives a failed save.
    #[instrument(level = "debug", skip(self, registry), fields(path = %self.path.display()))]
    pub fn save(&self, registry: &UsageRegistry) -> Result<()> {
        write_json_atomic(&self.path, registry)
    }

    /// Load, apply `f`, save. The mutation is persisted before the result is returned.
    pub fn update<T>(&self, f: impl FnOnce(&mut UsageRegistry) -> T) -> Result<T> {
        let mut registry = self.load()?;
        let out = f(&mut registry);
        self.save(&registry)?;
        Ok(out)
    }
}
