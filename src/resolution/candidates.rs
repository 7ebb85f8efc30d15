//! Candidate generation within a block.

use std::collections::HashMap;

use crate::resolution::blocking::Block;
use crate::restaurant::Restaurant;

/// An anchor and the rows it will be scored against.
///
/// The anchor is always a member of its own group, whether or not it appears
/// in `candidates`.
#[derive(Debug, Clone, Copy)]
pub struct CandidatePair<'a> {
    pub anchor: &'a Restaurant,
    pub candidates: &'a [&'a Restaurant],
}

/// Secondary key over a block: 4-character postal prefix → rows.
#[derive(Debug)]
pub struct CandidateIndex<'a> {
    block: &'a Block,
    by_prefix: HashMap<&'a str, Vec<&'a Restaurant>>,
}

impl<'a> CandidateIndex<'a> {
    /// Indexes every block row that has a postal code.
    #[must_use]
    pub fn build(block: &'a Block) -> Self {
        let mut by_prefix: HashMap<&'a str, Vec<&'a Restaurant>> = HashMap::new();
        for row in block.rows() {
            if let Some(prefix) = row.postal_prefix() {
                by_prefix.entry(prefix).or_default().push(row);
            }
        }
        Self { block, by_prefix }
    }

    /// Number of distinct postal prefixes.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.by_prefix.len()
    }

    /// Block rows sharing `anchor`'s postal prefix, anchor included.
    ///
    /// An anchor without a postal code has no indexed candidates.
    #[must_use]
    pub fn candidates_for(&self, anchor: &Restaurant) -> &[&'a Restaurant] {
        anchor
            .postal_prefix()
            .and_then(|prefix| self.by_prefix.get(prefix))
            .map_or(&[], Vec::as_slice)
    }

    /// `(anchor, candidates)` for every unresolved row, in block row order.
    pub fn pairs(&self) -> impl Iterator<Item = CandidatePair<'_>> + '_ {
        self.block
            .rows()
            .iter()
            .filter(|row| !row.resolved)
            .map(move |anchor| CandidatePair {
                anchor,
                candidates: self.candidates_for(anchor),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::blocking::partition_alphabet;
    use crate::restaurant::{NewRestaurant, RestaurantId};

    fn row(id: i64, name: &str, zip: Option<&str>, resolved: bool) -> Restaurant {
        let mut new = NewRestaurant::named(name);
        new.zip = zip.map(str::to_string);
        new.resolved = resolved;
        Restaurant::from_new(RestaurantId::new(id), new)
    }

    fn block(rows: Vec<Restaurant>) -> Block {
        Block::from_rows(partition_alphabet(1).unwrap().remove(0), rows)
    }

    #[test]
    fn candidates_share_postal_prefix_and_include_anchor() {
        let block = block(vec![
            row(1, "Kim's Diner", Some("60601"), false),
            row(2, "Kims Diner", Some("60602"), false),
            row(3, "Kims Diner", Some("60701"), false),
        ]);
        let index = CandidateIndex::build(&block);
        assert_eq!(index.key_count(), 2);

        let pairs: Vec<_> = index.pairs().collect();
        assert_eq!(pairs.len(), 3);
        let ids: Vec<i64> = pairs[0].candidates.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(pairs[2].candidates.len(), 1);
        assert_eq!(pairs[2].candidates[0].id, pairs[2].anchor.id);
    }

    #[test]
    fn only_unresolved_rows_are_anchors_but_resolved_rows_are_candidates() {
        let block = block(vec![
            row(1, "Alinea", Some("60614"), true),
            row(2, "Alinea Group", Some("60614"), false),
        ]);
        let index = CandidateIndex::build(&block);
        let pairs: Vec<_> = index.pairs().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].anchor.id, RestaurantId::new(2));
        assert_eq!(pairs[0].candidates.len(), 2);
    }

    #[test]
    fn anchor_without_postal_code_has_no_candidates() {
        let block = block(vec![row(1, "Cafe", None, false), row(2, "Cafe", Some("60601"), false)]);
        let index = CandidateIndex::build(&block);
        let pairs: Vec<_> = index.pairs().collect();
        assert!(pairs[0].candidates.is_empty());
        assert_eq!(pairs[1].candidates.len(), 1);
    }
}
