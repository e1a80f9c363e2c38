//! Validation pipeline: each processor owns a [`RuleChain`] composed from
//! general layers first, then its own.

pub mod chain;
pub mod rule;
pub mod rules;

pub use chain::{RuleChain, RuleLayer};
pub use rule::{Rule, RuleCheck};
