use anchor_lang::prelude::*;

use crate::engine::accrual::accrue_interest;
use crate::engine::collaborators::{AssetCustody, PairConfigStore, PositionStore, PriceOracle};
use crate::engine::ledger::{forgive_dust, settle_debt, DebtSettlement, PositionLedger};
use crate::engine::solvency::{is_solvent, Valuation};
use crate::state::{LedgerError, Position, PositionKey, RATE_PRECISION};

/// Collateral taken from a position for a given repayment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Seizure {
    /// Collateral worth exactly the repaid debt, rounded up
    pub raw: u64,
    /// Penalty on top of `raw`, rounded down
    pub bonus: u64,
    pub total: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiquidationReceipt {
    pub position: Position,
    pub repaid: u64,
    pub settlement: DebtSettlement,
    pub seizure: Seizure,
    pub dust_forgiven: u64,
    pub closed: bool,
}

fn pow10(decimals: u8) -> Result<u128> {
    10u128
        .checked_pow(decimals as u32)
        .ok_or_else(|| error!(LedgerError::ArithmeticOverflow))
}

/// `raw = ceil(repay * debtPrice * 10^cd / (collateralPrice * 10^dd))`,
/// `bonus = raw * penalty / 10000`.
pub fn seize_amounts(
    repay_amount: u64,
    valuation: &Valuation,
    penalty_bps: u64,
) -> Result<Seizure> {
    let collateral_scale = pow10(valuation.collateral_decimals)?;
    let numerator = (repay_amount as u128)
        .checked_mul(valuation.debt_price as u128)
        .and_then(|v| v.checked_mul(collateral_scale))
        .ok_or(LedgerError::ArithmeticOverflow)?;
    let denominator = (valuation.collateral_price as u128)
        .checked_mul(pow10(valuation.debt_decimals)?)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    require!(denominator > 0, LedgerError::InvalidOraclePrice);

    let raw = numerator / denominator + u128::from(numerator % denominator != 0);
    let raw = u64::try_from(raw).map_err(|_| error!(LedgerError::ArithmeticOverflow))?;
    let bonus = raw as u128 * penalty_bps as u128 / RATE_PRECISION as u128;
    let bonus = u64::try_from(bonus).map_err(|_| error!(LedgerError::ArithmeticOverflow))?;
    let total = raw
        .checked_add(bonus)
        .ok_or(LedgerError::ArithmeticOverflow)?;

    Ok(Seizure { raw, bonus, total })
}

impl<'a, S, R, O, C> PositionLedger<'a, S, R, O, C>
where
    S: PositionStore,
    R: PairConfigStore,
    O: PriceOracle,
    C: AssetCustody,
{
    /// Repay part or all (`repay_amount == 0`) of an insolvent position's debt
    /// from `liquidator` in exchange for its collateral plus the pair penalty.
    pub fn liquidate(
        &mut self,
        liquidator: &Pubkey,
        borrower: &Pubkey,
        collateral: &Pubkey,
        synthetic: &Pubkey,
        repay_amount: u64,
    ) -> Result<LiquidationReceipt> {
        let terms = self
            .registry
            .pair_terms(collateral, synthetic)
            .ok_or(LedgerError::AssetNotRecognized)?;
        let key = PositionKey::new(*borrower, *collateral, *synthetic);
        let mut position = self.load(&key)?;
        accrue_interest(&mut position, self.now)?;

        let valuation = self.valuation(collateral, synthetic)?;
        require!(
            !is_solvent(&position, &valuation, terms.ltv_bps)?,
            LedgerError::Solvent
        );

        let total_debt = position.total_debt()?;
        let repaid = if repay_amount == 0 {
            total_debt
        } else {
            repay_amount
        };
        require!(repaid <= total_debt, LedgerError::InputInvalid);

        let settlement = settle_debt(&mut position, repaid)?;
        let seizure = seize_amounts(repaid, &valuation, terms.liquidation_penalty_bps)?;
        require!(
            seizure.total <= position.collateral_supplied,
            LedgerError::SeizeExceedsCollateral
        );
        position.collateral_supplied -= seizure.total;
        let dust_forgiven = forgive_dust(&mut position);

        let closed = self.persist(position.clone())?;
        msg!(
            "Liquidated {}: repaid {}, seized {} (bonus {})",
            borrower,
            repaid,
            seizure.total,
            seizure.bonus
        );

        self.custody.burn(synthetic, liquidator, repaid)?;
        self.custody
            .transfer_out(collateral, liquidator, seizure.total)?;

        Ok(LiquidationReceipt {
            position,
            repaid,
            settlement,
            seizure,
            dust_forgiven,
            closed,
        })
    }
}
