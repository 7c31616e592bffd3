//! Challenge selection: one phase of Hard problems that never overlaps Learn.
//!
//! Never-used problems come first; previously used Challenge problems are repeated only to
//! cover a shortage, and the reason is recorded as an `Exhaustion` notice.

use indexmap::IndexSet;
use serde::{Serialize, Serializer};

use crate::domain::{Problem, ProblemId, SelectionResult};

/// Why a phase could not be filled with never-used problems.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exhaustion {
    /// Every Hard problem is already consumed by Learn; nothing can be selected.
    LearnLockout,
    /// No unused Hard problems remain; the whole phase is repeats.
    Full,
    /// Some unused Hard problems remain but not enough for a phase.
    Partial,
}

impl Exhaustion {
    pub fn message(self) -> &'static str {
        match self {
            Exhaustion::LearnLockout => {
                "No Hard questions available for Challenges because all Hard questions are already used in Learn. \
                 Either reset the Learn registry or increase dataset size."
            }
            Exhaustion::Full => {
                "All available Hard questions (excluding Learn) have been used in previous Challenge phases. \
                 Repeated questions are being displayed."
            }
            Exhaustion::Partial => {
                "Hard question pool (excluding Learn) is almost exhausted. \
                 Some repeated Challenge questions are being displayed."
            }
        }
    }
}

impl Serialize for Exhaustion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeMeta {
    pub requested_count: usize,
    pub unique_provided: usize,
    pub repeated_provided: usize,
    /// None when the phase was filled entirely with never-used problems.
    #[serde(rename = "notice")]
    pub exhaustion: Option<Exhaustion>,
}

impl ChallengeMeta {
    pub fn notice(&self) -> Option<&'static str> {
        self.exhaustion.map(Exhaustion::message)
    }
}

pub struct ChallengeRequest<'a> {
    /// Hard-tier problems in catalog order.
    pub hard_problems: &'a [Problem],
    pub learn_used: &'a IndexSet<ProblemId>,
    pub challenge_used: &'a IndexSet<ProblemId>,
    pub phase_size: usize,
}

pub fn pick_challenge_hard_phase(req: ChallengeRequest<'_>) -> SelectionResult<ChallengeMeta> {
    let eligible: Vec<&Problem> = req
        .hard_problems
        .iter()
        .filter(|p| !req.learn_used.contains(&p.problem_id))
        .collect();

    if eligible.is_empty() {
        return SelectionResult {
            selected: Vec::new(),
            meta: ChallengeMeta {
                requested_count: req.phase_size,
                unique_provided: 0,
                repeated_provided: 0,
                exhaustion: Some(Exhaustion::LearnLockout),
            },
        };
    }

    let (unused, used): (Vec<&Problem>, Vec<&Problem>) = eligible
        .into_iter()
        .partition(|p| !req.challenge_used.contains(&p.problem_id));

    let unique_provided = unused.len().min(req.phase_size);
    let mut selected: Vec<Problem> = unused.iter().take(unique_provided).map(|p| (*p).clone()).collect();

    let mut exhaustion = None;
    let mut repeated_provided = 0;
    if unique_provided < req.phase_size {
        let shortage = req.phase_size - unique_provided;
        let before = selected.len();
        selected.extend(used.iter().take(shortage).map(|p| (*p).clone()));
        repeated_provided = selected.len() - before;
        exhaustion = Some(if unused.is_empty() { Exhaustion::Full } else { Exhaustion::Partial });
    }

    SelectionResult {
        selected,
        meta: ChallengeMeta {
            requested_count: req.phase_size,
            unique_provided,
            repeated_provided,
            exhaustion,
        },
    }
}
