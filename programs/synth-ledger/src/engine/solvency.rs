use anchor_lang::prelude::*;

use crate::state::{LedgerError, Position, RATE_PRECISION};

/// Prices and precision needed to value both legs of a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Valuation {
    pub collateral_price: u64,
    pub debt_price: u64,
    pub collateral_decimals: u8,
    pub debt_decimals: u8,
}

/// Snapshot returned by the health check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Health {
    pub collateral_value: u128,
    pub debt_value: u128,
    /// Current debt-to-collateral ratio in bps; `u64::MAX` when collateral is worthless
    pub ltv_bps: u64,
    pub max_ltv_bps: u64,
    pub solvent: bool,
}

/// `price * amount / 10^decimals`, truncated.
pub fn asset_value(price: u64, amount: u64, decimals: u8) -> Result<u128> {
    let scale = 10u128
        .checked_pow(decimals as u32)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    let gross = (price as u128)
        .checked_mul(amount as u128)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    Ok(gross / scale)
}

fn leg_values(position: &Position, valuation: &Valuation) -> Result<(u128, u128)> {
    let collateral_value = asset_value(
        valuation.collateral_price,
        position.collateral_supplied,
        valuation.collateral_decimals,
    )?;
    let debt_value = asset_value(
        valuation.debt_price,
        position.total_debt()?,
        valuation.debt_decimals,
    )?;
    Ok((collateral_value, debt_value))
}

fn within_ltv(collateral_value: u128, debt_value: u128, ltv_bps: u64) -> Result<bool> {
    let lhs = debt_value
        .checked_mul(RATE_PRECISION as u128)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    let rhs = collateral_value
        .checked_mul(ltv_bps as u128)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    Ok(lhs <= rhs)
}

/// `debtValue * 10000 <= collateralValue * ltvBps`. Callers accrue first.
pub fn is_solvent(position: &Position, valuation: &Valuation, ltv_bps: u64) -> Result<bool> {
    let (collateral_value, debt_value) = leg_values(position, valuation)?;
    within_ltv(collateral_value, debt_value, ltv_bps)
}

pub fn health(position: &Position, valuation: &Valuation, max_ltv_bps: u64) -> Result<Health> {
    let (collateral_value, debt_value) = leg_values(position, valuation)?;
    let solvent = within_ltv(collateral_value, debt_value, max_ltv_bps)?;

    let ltv_bps = if collateral_value == 0 {
        if debt_value == 0 { 0 } else { u64::MAX }
    } else {
        let ratio = debt_value
            .checked_mul(RATE_PRECISION as u128)
            .ok_or(LedgerError::ArithmeticOverflow)?
            / collateral_value;
        u64::try_from(ratio).unwrap_or(u64::MAX)
    };

    Ok(Health {
        collateral_value,
        debt_value,
        ltv_bps,
        max_ltv_bps,
        solvent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: u64 = 1_000_000_000; // 9 decimals

    fn position(collateral: u64, principal: u64, interest: u64) -> Position {
        Position {
            collateral_supplied: collateral,
            principal_minted: principal,
            accrued_interest: interest,
            ..Position::default()
        }
    }

    fn valuation(collateral_price: u64, debt_price: u64) -> Valuation {
        Valuation {
            collateral_price,
            debt_price,
            collateral_decimals: 9,
            debt_decimals: 9,
        }
    }

    #[test]
    fn boundary_at_eighty_percent() {
        let v = valuation(2_000, 1);
        assert!(is_solvent(&position(UNIT, 1_600 * UNIT, 0), &v, 8_000).unwrap());
        assert!(!is_solvent(&position(UNIT, 1_601 * UNIT, 0), &v, 8_000).unwrap());
    }

    #[test]
    fn interest_counts_towards_debt() {
        let v = valuation(2_000, 1);
        assert!(is_solvent(&position(UNIT, 1_599 * UNIT, UNIT), &v, 8_000).unwrap());
        assert!(!is_solvent(&position(UNIT, 1_599 * UNIT, 2 * UNIT), &v, 8_000).unwrap());
    }

    #[test]
    fn decimals_are_normalised_per_leg() {
        // 1 SOL-like (9 dp) at 150.000000 against 100 USD-like (6 dp) at 1.000000
        let v = Valuation {
            collateral_price: 150_000_000,
            debt_price: 1_000_000,
            collateral_decimals: 9,
            debt_decimals: 6,
        };
        assert!(is_solvent(&position(UNIT, 100_000_000, 0), &v, 7_000).unwrap());
        assert!(!is_solvent(&position(UNIT, 106_000_000, 0), &v, 7_000).unwrap());
    }

    #[test]
    fn debt_free_position_is_always_solvent() {
        let v = valuation(0, 1);
        assert!(is_solvent(&position(0, 0, 0), &v, 1).unwrap());
    }

    #[test]
    fn health_reports_current_ltv() {
        let v = valuation(2_000, 1);
        let h = health(&position(UNIT, 1_000 * UNIT, 0), &v, 8_000).unwrap();

        assert_eq!(h.collateral_value, 2_000);
        assert_eq!(h.debt_value, 1_000);
        assert_eq!(h.ltv_bps, 5_000);
        assert!(h.solvent);

        let h = health(&position(0, UNIT, 0), &v, 8_000).unwrap();
        assert_eq!(h.ltv_bps, u64::MAX);
        assert!(!h.solvent);
    }
}
