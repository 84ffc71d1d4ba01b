//! Seams between the debt engine and the world around it.
//!
//! On chain these are backed by registry accounts, Pyth price updates and SPL
//! token CPIs (see `crate::adapters`); in tests by in-memory maps.

use anchor_lang::prelude::*;

use crate::engine::index::PositionIndex;
use crate::state::{Position, PositionKey};

/// Borrowing terms for a (collateral, synthetic) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairTerms {
    pub interest_rate_bps: u64,
    pub ltv_bps: u64,
    pub liquidation_penalty_bps: u64,
}

/// Whitelist and cap state of one asset. For a synthetic asset `cap` is the mint
/// cap, for collateral it is the custody supply cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssetState {
    pub whitelisted: bool,
    pub cap: u64,
    pub paused: bool,
}

impl AssetState {
    /// A zero cap also reads as paused.
    pub fn is_paused(&self) -> bool {
        self.paused || self.cap == 0
    }
}

pub trait PriceOracle {
    /// Unit price of `asset` in the oracle's common quote scale.
    fn price(&self, asset: &Pubkey) -> Result<u64>;
}

pub trait PairConfigStore {
    fn pair_terms(&self, collateral: &Pubkey, synthetic: &Pubkey) -> Option<PairTerms>;
    fn synthetic_asset(&self, asset: &Pubkey) -> Option<AssetState>;
    fn collateral_asset(&self, asset: &Pubkey) -> Option<AssetState>;
    fn decimals(&self, asset: &Pubkey) -> Result<u8>;
    /// Owner credited with interest revenue.
    fn treasury(&self) -> Result<Pubkey>;
}

/// Value movement. Each call either fully succeeds or fails with no effect.
pub trait AssetCustody {
    fn transfer_in(&mut self, asset: &Pubkey, from: &Pubkey, amount: u64) -> Result<()>;
    fn transfer_out(&mut self, asset: &Pubkey, to: &Pubkey, amount: u64) -> Result<()>;
    fn mint(&mut self, asset: &Pubkey, to: &Pubkey, amount: u64) -> Result<()>;
    fn burn(&mut self, asset: &Pubkey, from: &Pubkey, amount: u64) -> Result<()>;
    fn minted_supply(&self, asset: &Pubkey) -> Result<u64>;
    fn custody_balance(&self, asset: &Pubkey) -> Result<u64>;
}

pub trait PositionStore {
    fn position(&self, key: &PositionKey) -> Option<Position>;
    fn put_position(&mut self, position: Position) -> Result<()>;
    fn remove_position(&mut self, key: &PositionKey) -> Result<()>;
    fn index(&self, borrower: &Pubkey) -> PositionIndex;
    fn put_index(&mut self, borrower: &Pubkey, index: PositionIndex) -> Result<()>;
}
