use anchor_lang::prelude::*;

use crate::engine::accrual::accrue_interest;
use crate::engine::collaborators::{
    AssetCustody, AssetState, PairConfigStore, PositionStore, PriceOracle,
};
use crate::engine::solvency::{is_solvent, Valuation};
use crate::state::{LedgerError, Position, PositionKey};

/// How a repayment (or the repay leg of a liquidation) was split.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebtSettlement {
    pub interest_paid: u64,
    pub principal_paid: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BorrowReceipt {
    pub position: Position,
    pub opened: bool,
    /// Interest brought current at the previous rate before the new snapshot
    pub interest_accrued: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepayOutcome {
    /// Debt remains after the payment
    Partial,
    /// Principal and interest are settled, dust included
    Full,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepayReceipt {
    pub position: Position,
    pub settlement: DebtSettlement,
    pub dust_forgiven: u64,
    pub collateral_returned: u64,
    pub outcome: RepayOutcome,
    pub closed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawReceipt {
    pub position: Position,
    pub amount: u64,
    pub closed: bool,
}

/// Pay interest first, then principal. `amount` must not exceed total debt.
pub fn settle_debt(position: &mut Position, amount: u64) -> Result<DebtSettlement> {
    let interest_paid = amount.min(position.accrued_interest);
    let principal_paid = amount - interest_paid;

    position.accrued_interest -= interest_paid;
    position.principal_minted = position
        .principal_minted
        .checked_sub(principal_paid)
        .ok_or(LedgerError::ArithmeticOverflow)?;

    Ok(DebtSettlement {
        interest_paid,
        principal_paid,
    })
}

/// Zero out principal and interest once both are at or below the dust threshold.
/// Returns the residue written off.
pub fn forgive_dust(position: &mut Position) -> u64 {
    if !position.has_debt() || !position.is_dust_closed() {
        return 0;
    }
    let residue = position.principal_minted + position.accrued_interest;
    position.principal_minted = 0;
    position.accrued_interest = 0;
    residue
}

fn recognized(state: Option<AssetState>) -> Result<AssetState> {
    match state {
        Some(state) if state.whitelisted => Ok(state),
        _ => err!(LedgerError::AssetNotRecognized),
    }
}

/// Owns position lifecycle and the per-borrower index for one unit of work.
///
/// Every operation validates first, then writes ledger state, then moves value
/// through `AssetCustody`. A custody failure is returned as-is; undoing the
/// ledger writes is left to the surrounding transaction.
pub struct PositionLedger<'a, S, R, O, C> {
    pub(super) store: &'a mut S,
    pub(super) registry: &'a R,
    pub(super) oracle: &'a O,
    pub(super) custody: &'a mut C,
    pub(super) now: i64,
}

impl<'a, S, R, O, C> PositionLedger<'a, S, R, O, C>
where
    S: PositionStore,
    R: PairConfigStore,
    O: PriceOracle,
    C: AssetCustody,
{
    pub fn new(
        store: &'a mut S,
        registry: &'a R,
        oracle: &'a O,
        custody: &'a mut C,
        now: i64,
    ) -> Self {
        Self {
            store,
            registry,
            oracle,
            custody,
            now,
        }
    }

    pub fn borrow(
        &mut self,
        borrower: &Pubkey,
        synthetic: &Pubkey,
        borrow_amount: u64,
        collateral: &Pubkey,
        collateral_amount: u64,
    ) -> Result<BorrowReceipt> {
        require!(
            borrow_amount > 0 && collateral_amount > 0,
            LedgerError::InputInvalid
        );
        let synthetic_state = recognized(self.registry.synthetic_asset(synthetic))?;
        require!(!synthetic_state.is_paused(), LedgerError::AssetPaused);
        let collateral_state = recognized(self.registry.collateral_asset(collateral))?;
        require!(!collateral_state.is_paused(), LedgerError::AssetPaused);
        let terms = self
            .registry
            .pair_terms(collateral, synthetic)
            .ok_or(LedgerError::AssetNotRecognized)?;

        let key = PositionKey::new(*borrower, *collateral, *synthetic);
        let mut interest_accrued = 0;
        let (mut position, opened) = match self.store.position(&key) {
            Some(mut existing) => {
                // old rate up to now, new rate from here on
                interest_accrued = accrue_interest(&mut existing, self.now)?;
                existing.interest_rate_bps = terms.interest_rate_bps;
                (existing, false)
            }
            None => (
                Position {
                    borrower: *borrower,
                    collateral_mint: *collateral,
                    synthetic_mint: *synthetic,
                    last_accrual_ts: self.now,
                    interest_rate_bps: terms.interest_rate_bps,
                    ..Position::default()
                },
                true,
            ),
        };

        position.collateral_supplied = position
            .collateral_supplied
            .checked_add(collateral_amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        position.principal_minted = position
            .principal_minted
            .checked_add(borrow_amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        let valuation = self.valuation(collateral, synthetic)?;
        require!(
            is_solvent(&position, &valuation, terms.ltv_bps)?,
            LedgerError::Insolvent
        );

        let projected_supply = self
            .custody
            .minted_supply(synthetic)?
            .checked_add(borrow_amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        require!(
            projected_supply <= synthetic_state.cap,
            LedgerError::CapExceeded
        );
        let projected_custody = self
            .custody
            .custody_balance(collateral)?
            .checked_add(collateral_amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        require!(
            projected_custody <= collateral_state.cap,
            LedgerError::CapExceeded
        );

        let index = if opened {
            let mut index = self.store.index(borrower);
            index.insert(key.pair())?;
            Some(index)
        } else {
            None
        };

        if let Some(index) = index {
            self.store.put_index(borrower, index)?;
            msg!("Position opened for {}", borrower);
        }
        self.store.put_position(position.clone())?;

        self.custody
            .transfer_in(collateral, borrower, collateral_amount)?;
        self.custody.mint(synthetic, borrower, borrow_amount)?;

        Ok(BorrowReceipt {
            position,
            opened,
            interest_accrued,
        })
    }

    /// `repay_amount == 0` pays the whole debt. Collateral is only released when
    /// the debt ends up fully settled.
    pub fn repay(
        &mut self,
        payer: &Pubkey,
        collateral: &Pubkey,
        synthetic: &Pubkey,
        repay_amount: u64,
        claim_collateral: bool,
    ) -> Result<RepayReceipt> {
        let key = PositionKey::new(*payer, *collateral, *synthetic);
        let mut position = self.load(&key)?;
        accrue_interest(&mut position, self.now)?;

        let total_debt = position.total_debt()?;
        require!(total_debt > 0, LedgerError::NoDebt);
        let amount = if repay_amount == 0 {
            total_debt
        } else {
            repay_amount
        };
        require!(amount <= total_debt, LedgerError::InputInvalid);

        let settlement = settle_debt(&mut position, amount)?;
        let dust_forgiven = forgive_dust(&mut position);
        let outcome = if position.has_debt() {
            RepayOutcome::Partial
        } else {
            RepayOutcome::Full
        };

        let mut collateral_returned = 0;
        if outcome == RepayOutcome::Full && claim_collateral {
            collateral_returned = position.collateral_supplied;
            position.collateral_supplied = 0;
        }

        let treasury = if settlement.interest_paid > 0 {
            Some(self.registry.treasury()?)
        } else {
            None
        };

        let closed = self.persist(position.clone())?;

        if let Some(treasury) = treasury {
            self.custody
                .burn(synthetic, payer, settlement.interest_paid)?;
            self.custody
                .mint(synthetic, &treasury, settlement.interest_paid)?;
        }
        if settlement.principal_paid > 0 {
            self.custody
                .burn(synthetic, payer, settlement.principal_paid)?;
        }
        if collateral_returned > 0 {
            self.custody
                .transfer_out(collateral, payer, collateral_returned)?;
        }

        Ok(RepayReceipt {
            position,
            settlement,
            dust_forgiven,
            collateral_returned,
            outcome,
            closed,
        })
    }

    pub fn withdraw(
        &mut self,
        owner: &Pubkey,
        collateral: &Pubkey,
        synthetic: &Pubkey,
        amount: u64,
    ) -> Result<WithdrawReceipt> {
        require!(amount > 0, LedgerError::InputInvalid);
        let key = PositionKey::new(*owner, *collateral, *synthetic);
        let mut position = self.load(&key)?;

        let collateral_state = self
            .registry
            .collateral_asset(collateral)
            .ok_or(LedgerError::AssetNotRecognized)?;
        require!(!collateral_state.is_paused(), LedgerError::AssetPaused);
        require!(
            amount <= position.collateral_supplied,
            LedgerError::InputInvalid
        );

        accrue_interest(&mut position, self.now)?;
        position.collateral_supplied -= amount;

        if position.has_debt() {
            let terms = self
                .registry
                .pair_terms(collateral, synthetic)
                .ok_or(LedgerError::AssetNotRecognized)?;
            let valuation = self.valuation(collateral, synthetic)?;
            require!(
                is_solvent(&position, &valuation, terms.ltv_bps)?,
                LedgerError::Insolvent
            );
        }

        let closed = self.persist(position.clone())?;
        self.custody.transfer_out(collateral, owner, amount)?;

        Ok(WithdrawReceipt {
            position,
            amount,
            closed,
        })
    }

    pub(super) fn load(&self, key: &PositionKey) -> Result<Position> {
        self.store
            .position(key)
            .filter(|position| position.borrower == key.borrower)
            .ok_or_else(|| error!(LedgerError::PositionNotFound))
    }

    pub(super) fn valuation(&self, collateral: &Pubkey, synthetic: &Pubkey) -> Result<Valuation> {
        Ok(Valuation {
            collateral_price: self.oracle.price(collateral)?,
            debt_price: self.oracle.price(synthetic)?,
            collateral_decimals: self.registry.decimals(collateral)?,
            debt_decimals: self.registry.decimals(synthetic)?,
        })
    }

    /// Write the position back, or delete it and its index entry once nothing is
    /// left. Returns true when deleted.
    pub(super) fn persist(&mut self, position: Position) -> Result<bool> {
        let key = position.position_key();
        if !position.is_fully_closed() {
            self.store.put_position(position)?;
            return Ok(false);
        }

        let mut index = self.store.index(&key.borrower);
        index.remove(&key.pair());
        self.store.put_index(&key.borrower, index)?;
        self.store.remove_position(&key)?;

        msg!(
            "Position closed for {} ({} / {})",
            key.borrower,
            key.collateral_mint,
            key.synthetic_mint
        );
        Ok(true)
    }
}
