//! Block partitioning by name initial.
//!
//! A block is a scoped, in-process snapshot of the restaurants whose
//! lowercased name starts with one of the block's symbols. Blocks are built
//! at the start of a blocked pass and dropped when the pass ends.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::restaurant::Restaurant;
use crate::storage::{InitialSelector, RestaurantStore, StorageError};

/// Partition alphabet: `a..=z` followed by `0..=9`.
pub const ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Which rows a block selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "symbols", rename_all = "snake_case")]
pub enum BlockKind {
    /// Names whose lowercased initial is one of these symbols.
    Symbols(Vec<char>),
    /// Names whose initial is outside the alphabet (or empty).
    Residual,
}

/// A block definition: position and selection rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub index: usize,
    pub kind: BlockKind,
}

impl BlockSpec {
    /// Residual block placed at `index`.
    #[must_use]
    pub const fn residual(index: usize) -> Self {
        Self {
            index,
            kind: BlockKind::Residual,
        }
    }

    /// Human-readable label, e.g. `b1[a-i]` or `b5[residual]`.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.kind {
            BlockKind::Symbols(symbols) => match (symbols.first(), symbols.last()) {
                (Some(first), Some(last)) if first != last => {
                    format!("b{}[{first}-{last}]", self.index + 1)
                }
                (Some(first), _) => format!("b{}[{first}]", self.index + 1),
                _ => format!("b{}[]", self.index + 1),
            },
            BlockKind::Residual => format!("b{}[residual]", self.index + 1),
        }
    }

    /// Returns true if a name with this lowercased initial belongs to the block.
    #[must_use]
    pub fn covers(&self, initial: Option<char>) -> bool {
        match &self.kind {
            BlockKind::Symbols(symbols) => initial.is_some_and(|c| symbols.contains(&c)),
            BlockKind::Residual => initial.map_or(true, |c| !ALPHABET.contains(&c)),
        }
    }

    fn selector(&self) -> InitialSelector<'_> {
        match &self.kind {
            BlockKind::Symbols(symbols) => InitialSelector::AnyOf(symbols),
            BlockKind::Residual => InitialSelector::NoneOf(&ALPHABET),
        }
    }
}

/// Splits the alphabet into contiguous chunks of `ceil(36 / k)` symbols.
///
/// The number of chunks is `ceil(36 / chunk)`, which can be smaller than `k`
/// (for example `k = 7` yields 6 blocks).
pub fn partition_alphabet(k: usize) -> Result<Vec<BlockSpec>, ValidationError> {
    if k == 0 {
        return Err(ValidationError::InvalidBlockCount { value: k });
    }
    let chunk = ALPHABET.len().div_ceil(k);
    Ok(ALPHABET
        .chunks(chunk)
        .enumerate()
        .map(|(index, symbols)| BlockSpec {
            index,
            kind: BlockKind::Symbols(symbols.to_vec()),
        })
        .collect())
}

/// Alphabet blocks for `k`, optionally followed by the residual block.
pub fn block_specs(k: usize, include_residual: bool) -> Result<Vec<BlockSpec>, ValidationError> {
    let mut specs = partition_alphabet(k)?;
    if include_residual {
        specs.push(BlockSpec::residual(specs.len()));
    }
    Ok(specs)
}

/// A materialized block: its spec and a snapshot of its rows in id order.
#[derive(Debug, Clone)]
pub struct Block {
    spec: BlockSpec,
    rows: Vec<Restaurant>,
}

impl Block {
    /// Reads the block's rows from the store.
    pub fn materialize<S>(store: &S, spec: BlockSpec) -> Result<Self, StorageError>
    where
        S: RestaurantStore + ?Sized,
    {
        let rows = store.find_by_initials(spec.selector())?;
        Ok(Self::from_rows(spec, rows))
    }

    /// Builds a block from an already-loaded population, keeping covered rows.
    #[must_use]
    pub fn from_rows(spec: BlockSpec, rows: impl IntoIterator<Item = Restaurant>) -> Self {
        let mut rows: Vec<Restaurant> = rows
            .into_iter()
            .filter(|r| spec.covers(r.initial()))
            .collect();
        rows.sort_by_key(|r| r.id);
        Self { spec, rows }
    }

    /// The block definition.
    #[must_use]
    pub const fn spec(&self) -> &BlockSpec {
        &self.spec
    }

    /// Block label.
    #[must_use]
    pub fn label(&self) -> String {
        self.spec.label()
    }

    /// Rows in block-native (ascending id) order.
    #[must_use]
    pub fn rows(&self) -> &[Restaurant] {
        &self.rows
    }

    /// Number of rows not yet resolved.
    #[must_use]
    pub fn unresolved_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.resolved).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restaurant::{NewRestaurant, RestaurantId};

    fn row(id: i64, name: &str) -> Restaurant {
        Restaurant::from_new(RestaurantId::new(id), NewRestaurant::named(name))
    }

    #[test]
    fn four_blocks_of_nine_symbols() {
        let specs = partition_alphabet(4).unwrap();
        assert_eq!(specs.len(), 4);
        for spec in &specs {
            let BlockKind::Symbols(symbols) = &spec.kind else {
                panic!("expected symbol block");
            };
            assert_eq!(symbols.len(), 9);
        }
        assert_eq!(specs[0].label(), "b1[a-i]");
        assert_eq!(specs[2].label(), "b3[s-0]");
        assert_eq!(specs[3].label(), "b4[1-9]");
    }

    #[test]
    fn every_symbol_lands_in_exactly_one_block() {
        for k in 1..=40 {
            let specs = partition_alphabet(k).unwrap();
            for symbol in ALPHABET {
                let hits = specs.iter().filter(|s| s.covers(Some(symbol))).count();
                assert_eq!(hits, 1, "k={k} symbol={symbol}");
            }
        }
    }

    #[test]
    fn chunking_can_yield_fewer_blocks_than_requested() {
        assert_eq!(partition_alphabet(7).unwrap().len(), 6);
        assert_eq!(partition_alphabet(5).unwrap().len(), 5);
        assert_eq!(partition_alphabet(100).unwrap().len(), 36);
        assert_eq!(partition_alphabet(1).unwrap().len(), 1);
    }

    #[test]
    fn zero_blocks_is_rejected() {
        assert!(matches!(
            partition_alphabet(0),
            Err(ValidationError::InvalidBlockCount { value: 0 })
        ));
    }

    #[test]
    fn seven_eleven_goes_to_digit_block() {
        let specs = partition_alphabet(4).unwrap();
        let owner: Vec<_> = specs.iter().filter(|s| s.covers(row(1, "7-Eleven").initial())).collect();
        assert_eq!(owner.len(), 1);
        assert_eq!(owner[0].index, 3);
    }

    #[test]
    fn residual_block_takes_symbols_and_empty_names() {
        let specs = block_specs(4, true).unwrap();
        assert_eq!(specs.len(), 5);
        let residual = specs.last().unwrap();
        assert!(residual.covers(row(1, "'Sup Dogs").initial()));
        assert!(residual.covers(row(2, "").initial()));
        assert!(residual.covers(row(3, "Élan").initial()));
        assert!(!residual.covers(row(4, "Kim's Diner").initial()));
    }

    #[test]
    fn from_rows_filters_and_orders_by_id() {
        let spec = partition_alphabet(4).unwrap().remove(1);
        let block = Block::from_rows(spec, vec![row(9, "Mario's"), row(2, "Kim's Diner"), row(3, "Alinea")]);
        let ids: Vec<i64> = block.rows().iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![2, 9]);
        assert_eq!(block.unresolved_count(), 2);
    }
}
