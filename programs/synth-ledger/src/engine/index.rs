use anchor_lang::prelude::*;

use crate::state::{LedgerError, PairKey, MAX_OPEN_POSITIONS};

/// Unordered set of a borrower's open pairs.
///
/// Removal swaps the last entry into the vacated slot, so ordering is not
/// stable but membership is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PositionIndex {
    entries: Vec<PairKey>,
}

impl PositionIndex {
    pub fn from_entries(entries: Vec<PairKey>) -> Self {
        Self { entries }
    }

    pub fn into_entries(self) -> Vec<PairKey> {
        self.entries
    }

    pub fn entries(&self) -> &[PairKey] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &PairKey) -> bool {
        self.entries.contains(key)
    }

    /// Returns false if `key` was already present.
    pub fn insert(&mut self, key: PairKey) -> Result<bool> {
        if self.contains(&key) {
            return Ok(false);
        }
        require!(
            self.entries.len() < MAX_OPEN_POSITIONS,
            LedgerError::PositionIndexFull
        );
        self.entries.push(key);
        Ok(true)
    }

    /// Returns false if `key` was not present.
    pub fn remove(&mut self, key: &PairKey) -> bool {
        match self.entries.iter().position(|entry| entry == key) {
            Some(slot) => {
                self.entries.swap_remove(slot);
                true
            }
            None => false,
        }
    }
}
