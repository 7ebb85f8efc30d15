//! Threshold-gated greedy linkage.
//!
//! Each unresolved anchor is compared with its candidates on state, city and
//! name. Members are claimed as soon as they join a group, so a row belongs
//! to at most one group per pass. Grouping is greedy and depends on anchor
//! order; it is not a transitive closure.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::resolution::candidates::CandidatePair;
use crate::resolution::similarity::attribute_similarity;
use crate::restaurant::{Restaurant, RestaurantId};

/// Ids already placed in a group during the current pass.
#[derive(Debug, Clone, Default)]
pub struct ClaimSet {
    ids: HashSet<RestaurantId>,
}

impl ClaimSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, id: RestaurantId) -> bool {
        self.ids.contains(&id)
    }

    /// Returns false if the id was already claimed.
    pub fn claim(&mut self, id: RestaurantId) -> bool {
        self.ids.insert(id)
    }

    pub fn extend(&mut self, other: ClaimSet) {
        self.ids.extend(other.ids);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Result of comparing an anchor with one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    /// State, city and name all reach the threshold.
    Match,
    /// State or city fell below the threshold; name was not scored.
    StateOrCityBelow,
    /// Location passed but the name fell below the threshold.
    NameBelow,
    /// A gated attribute is missing on one side.
    MissingAttribute,
}

impl GateOutcome {
    #[must_use]
    pub const fn is_match(self) -> bool {
        matches!(self, Self::Match)
    }
}

/// Scores `candidate` against `anchor` at threshold `threshold`.
///
/// State and city are checked first; the name is only scored when both pass.
#[must_use]
pub fn compare(anchor: &Restaurant, candidate: &Restaurant, threshold: f64) -> GateOutcome {
    let state = attribute_similarity(anchor.state.as_deref(), candidate.state.as_deref());
    let city = attribute_similarity(anchor.city.as_deref(), candidate.city.as_deref());
    let (Some(state), Some(city)) = (state, city) else {
        return GateOutcome::MissingAttribute;
    };
    if state < threshold || city < threshold {
        return GateOutcome::StateOrCityBelow;
    }
    if attribute_similarity(Some(&anchor.name), Some(&candidate.name))
        .is_some_and(|name| name >= threshold)
    {
        GateOutcome::Match
    } else {
        GateOutcome::NameBelow
    }
}

/// A set of rows judged to denote the same restaurant.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// The anchor that opened the group.
    pub anchor: RestaurantId,
    /// Members in join order; the anchor comes first.
    pub members: Vec<Restaurant>,
}

impl Group {
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }

    #[must_use]
    pub fn member_ids(&self) -> Vec<RestaurantId> {
        self.members.iter().map(|m| m.id).collect()
    }
}

/// Builds groups from `(anchor, candidates)` pairs in visitation order.
///
/// Anchors already claimed or resolved are skipped. Candidates already claimed
/// or resolved never join a new group. Every new member is added to `claims`.
pub fn build_groups<'a>(
    pairs: impl IntoIterator<Item = CandidatePair<'a>>,
    threshold: f64,
    claims: &mut ClaimSet,
) -> Vec<Group> {
    let mut groups = Vec::new();
    for pair in pairs {
        let anchor = pair.anchor;
        if anchor.resolved || !claims.claim(anchor.id) {
            continue;
        }
        let mut members = vec![anchor.clone()];
        for candidate in pair.candidates {
            if candidate.id == anchor.id || candidate.resolved || claims.contains(candidate.id) {
                continue;
            }
            if compare(anchor, candidate, threshold).is_match() {
                claims.claim(candidate.id);
                members.push((*candidate).clone());
            }
        }
        groups.push(Group {
            anchor: anchor.id,
            members,
        });
    }
    groups
}
