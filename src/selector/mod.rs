//! Selection policies over an ordered catalog.
//!
//! Both selectors are pure: they read their inputs, never the registry, and report shortfalls
//! in their meta records instead of failing. `UsageRegistry::allocate` is the only caller that
//! should feed them, since it owns the used-sets they must filter on.

pub mod challenge;
pub mod learn;

pub use challenge::{pick_challenge_hard_phase, ChallengeMeta, ChallengeRequest};
pub use learn::{pick_learn_problems, LearnMeta};
