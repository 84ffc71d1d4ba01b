use anchor_lang::prelude::*;

use crate::state::{LedgerError, Position, RATE_PRECISION, SECONDS_PER_YEAR};

/// Simple interest on `principal` at `rate_bps` per year over `elapsed` seconds.
/// Truncates, so it may under-accrue by less than one unit but never over-accrues.
pub fn interest_for(principal: u64, rate_bps: u64, elapsed: u64) -> Result<u64> {
    let numerator = (principal as u128)
        .checked_mul(rate_bps as u128)
        .and_then(|v| v.checked_mul(elapsed as u128))
        .ok_or(LedgerError::ArithmeticOverflow)?;
    let denominator = (SECONDS_PER_YEAR as u128) * (RATE_PRECISION as u128);

    u64::try_from(numerator / denominator).map_err(|_| error!(LedgerError::ArithmeticOverflow))
}

/// Bring `position` current to `now` at its stored rate and return the interest added.
///
/// A position without principal only has its clock moved forward, so debt reopened
/// later never accrues over the idle period.
pub fn accrue_interest(position: &mut Position, now: i64) -> Result<u64> {
    let now = now.max(position.last_accrual_ts);

    if position.principal_minted == 0 {
        position.last_accrual_ts = now;
        return Ok(0);
    }

    let elapsed = (now - position.last_accrual_ts) as u64;
    let interest = interest_for(position.principal_minted, position.interest_rate_bps, elapsed)?;

    position.accrued_interest = position
        .accrued_interest
        .checked_add(interest)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    position.last_accrual_ts = now;

    Ok(interest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400;
    const YEAR: i64 = SECONDS_PER_YEAR as i64;

    fn position(principal: u64, rate_bps: u64, last_accrual_ts: i64) -> Position {
        Position {
            borrower: Pubkey::new_unique(),
            principal_minted: principal,
            interest_rate_bps: rate_bps,
            last_accrual_ts,
            ..Position::default()
        }
    }

    #[test]
    fn one_year_at_five_percent() {
        let mut p = position(1_000, 500, 0);
        let added = accrue_interest(&mut p, YEAR).unwrap();

        assert_eq!(added, 50);
        assert_eq!(p.accrued_interest, 50);
        assert_eq!(p.principal_minted, 1_000);
        assert_eq!(p.last_accrual_ts, YEAR);
    }

    #[test]
    fn zero_principal_only_moves_the_clock() {
        let mut p = position(0, 500, 100);
        p.accrued_interest = 7;

        assert_eq!(accrue_interest(&mut p, 100 + 10 * YEAR).unwrap(), 0);
        assert_eq!(p.accrued_interest, 7);
        assert_eq!(p.last_accrual_ts, 100 + 10 * YEAR);
    }

    #[test]
    fn clock_never_moves_backwards() {
        let mut p = position(1_000_000, 1_000, 5_000);
        assert_eq!(accrue_interest(&mut p, 4_000).unwrap(), 0);
        assert_eq!(p.last_accrual_ts, 5_000);
    }

    #[test]
    fn truncates_towards_zero() {
        // 1000 * 500 * 1 / (31_536_000 * 10_000) rounds to nothing
        let mut p = position(1_000, 500, 0);
        assert_eq!(accrue_interest(&mut p, 1).unwrap(), 0);
        assert_eq!(p.last_accrual_ts, 1);
    }

    #[test]
    fn accrual_is_monotonic_in_elapsed_time() {
        let principal = 123_456_789_000;
        let mut previous = 0;
        for t in [0, 1, DAY, 7 * DAY, 30 * DAY, YEAR, 3 * YEAR] {
            let mut p = position(principal, 750, 0);
            accrue_interest(&mut p, t).unwrap();
            assert!(p.accrued_interest >= previous);
            previous = p.accrued_interest;
        }
    }

    #[test]
    fn split_accrual_within_one_unit_per_call() {
        let principal = 987_654_321;
        let (t1, t2) = (13 * DAY + 17, 200 * DAY + 3);

        let mut whole = position(principal, 1_234, 0);
        accrue_interest(&mut whole, t1 + t2).unwrap();

        let mut split = position(principal, 1_234, 0);
        accrue_interest(&mut split, t1).unwrap();
        accrue_interest(&mut split, t1 + t2).unwrap();

        assert!(split.accrued_interest <= whole.accrued_interest);
        assert!(whole.accrued_interest - split.accrued_interest <= 2);
    }

    #[test]
    fn overflowing_interest_is_rejected() {
        let mut p = position(u64::MAX, 10_000, 0);
        p.accrued_interest = u64::MAX - 1;
        assert!(accrue_interest(&mut p, YEAR).is_err());
    }
}
