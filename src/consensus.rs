//! Validator selection for block production.

use crate::blockchain::Validator;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::Deserialize;

/// How the next block producer is chosen from the active set.
pub trait ValidatorSelection: Send + Sync {
    /// Picks one validator, or `None` when the set is empty.
    fn select<'a>(
        &self,
        validators: &'a [Validator],
        rng: &mut dyn RngCore,
    ) -> Option<&'a Validator>;
}

/// Every validator is equally likely, regardless of stake.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformSelection;

impl ValidatorSelection for UniformSelection {
    fn select<'a>(
        &self,
        validators: &'a [Validator],
        rng: &mut dyn RngCore,
    ) -> Option<&'a Validator> {
        validators.choose(rng)
    }
}

/// Probability proportional to `total_stake`.
///
/// Falls back to uniform selection when no validator has positive stake.
#[derive(Debug, Clone, Copy, Default)]
pub struct StakeWeightedSelection;

impl ValidatorSelection for StakeWeightedSelection {
    fn select<'a>(
        &self,
        validators: &'a [Validator],
        rng: &mut dyn RngCore,
    ) -> Option<&'a Validator> {
        let weights = validators.iter().map(|v| v.total_stake.max(0.0));
        match WeightedIndex::new(weights) {
            Ok(dist) => validators.get(dist.sample(rng)),
            Err(_) => validators.choose(rng),
        }
    }
}

/// Configured selection policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    #[default]
    Uniform,
    StakeWeighted,
}

impl SelectionPolicy {
    pub fn selector(self) -> Box<dyn ValidatorSelection> {
        match self {
            SelectionPolicy::Uniform => Box::new(UniformSelection),
            SelectionPolicy::StakeWeighted => Box::new(StakeWeightedSelection),
        }
    }
}
