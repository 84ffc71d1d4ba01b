use anchor_lang::prelude::*;

pub mod adapters;
pub mod debt;
pub mod engine;
pub mod liquidate;
pub mod state;
pub mod vault;

use debt::*;
use liquidate::*;
use vault::*;
pub use state::*;

declare_id!("4T32SzrhokGTxFiTeKmSciVR8NHnygBYC7XxjN7nAZGh");

#[program]
pub mod synth_ledger {
    use super::*;

    /// Create the custody token account for a collateral mint
    pub fn initialize_vault(ctx: Context<InitializeVault>) -> Result<()> {
        vault::initialize_vault(ctx)
    }

    /// Deposit collateral and mint synthetic against it
    pub fn borrow(
        ctx: Context<Borrow>,
        borrow_amount: u64,
        collateral_amount: u64,
    ) -> Result<()> {
        debt::borrow(ctx, borrow_amount, collateral_amount)
    }

    /// Repay debt, interest first. 0 repays in full; `claim_collateral`
    /// releases the collateral once nothing is owed
    pub fn repay(ctx: Context<Repay>, repay_amount: u64, claim_collateral: bool) -> Result<()> {
        debt::repay(ctx, repay_amount, claim_collateral)
    }

    pub fn withdraw(ctx: Context<Withdraw>, amount: u64) -> Result<()> {
        debt::withdraw(ctx, amount)
    }

    /// Liquidate an insolvent position
    pub fn liquidate(ctx: Context<Liquidate>, repay_amount: u64) -> Result<()> {
        liquidate::liquidate(ctx, repay_amount)
    }

    pub fn accrue_interest(ctx: Context<AccrueInterest>) -> Result<()> {
        debt::accrue_interest(ctx)
    }

    /// Returns the position's current LTV in basis points
    pub fn health_check(ctx: Context<HealthCheck>) -> Result<u64> {
        debt::health_check(ctx)
    }
}
