//! Account-agnostic debt engine: accrual, solvency, position lifecycle and
//! liquidation over the traits in [`collaborators`].

pub mod accrual;
pub mod collaborators;
pub mod index;
pub mod ledger;
pub mod liquidation;
pub mod solvency;

#[cfg(test)]
pub(crate) mod testing;

pub use accrual::{accrue_interest, interest_for};
pub use collaborators::{
    AssetCustody, AssetState, PairConfigStore, PairTerms, PositionStore, PriceOracle,
};
pub use index::PositionIndex;
pub use ledger::{
    BorrowReceipt, DebtSettlement, PositionLedger, RepayOutcome, RepayReceipt, WithdrawReceipt,
};
pub use liquidation::{seize_amounts, LiquidationReceipt, Seizure};
pub use solvency::{asset_value, health, is_solvent, Health, Valuation};
