//! Entity resolution: scoring, blocking, candidate generation, linkage and
//! composite synthesis.
//!
//! The pieces compose leaves-first:
//!
//! 1. [`similarity`] scores two attribute values.
//! 2. [`blocking`] splits the population by name initial.
//! 3. [`candidates`] narrows each anchor's comparisons to its postal prefix.
//! 4. [`linkage`] turns `(anchor, candidates)` pairs into groups.
//! 5. [`composite`] commits each group to the store.
//!
//! The engine drives these in either blocked or unblocked mode.

pub mod blocking;
pub mod candidates;
pub mod composite;
pub mod linkage;
pub mod similarity;

pub use blocking::{block_specs, partition_alphabet, Block, BlockKind, BlockSpec, ALPHABET};
pub use candidates::{CandidateIndex, CandidatePair};
pub use composite::{composite_of, synthesize, SynthesisOutcome};
pub use linkage::{build_groups, compare, ClaimSet, GateOutcome, Group};
pub use similarity::similarity;

use crate::restaurant::Restaurant;

/// Pairs for the unblocked pass: every unresolved row against the whole
/// population, in population order.
pub fn population_pairs<'a>(
    population: &'a [&'a Restaurant],
) -> impl Iterator<Item = CandidatePair<'a>> + 'a {
    population
        .iter()
        .copied()
        .filter(|row| !row.resolved)
        .map(move |anchor| CandidatePair {
            anchor,
            candidates: population,
        })
}
