use anchor_lang::prelude::*;

pub const REGISTRY_SEED: &[u8] = b"registry";
pub const SYNTHETIC_SEED: &[u8] = b"synthetic";
pub const COLLATERAL_SEED: &[u8] = b"collateral";
pub const PAIR_SEED: &[u8] = b"pair";

pub const BPS_DENOMINATOR: u64 = 10_000;
pub const MAX_INTEREST_RATE_BPS: u64 = 10_000; // 100% APR
pub const MAX_LIQUIDATION_PENALTY_BPS: u64 = 5_000; // 50% bonus on seized collateral

/// Global registry settings. One per deployment.
#[account]
#[derive(InitSpace)]
pub struct RegistryConfig {
    pub authority: Pubkey,
    /// Wallet credited with interest revenue on repayment
    pub treasury: Pubkey,
    pub bump: u8,
}

/// A mintable synthetic asset. The ledger authority PDA must be its mint authority.
#[account]
#[derive(InitSpace)]
pub struct SyntheticAsset {
    pub mint: Pubkey,
    pub price_feed_id: [u8; 32],
    /// Upper bound on total minted supply; zero means minting is paused
    pub mint_cap: u64,
    pub paused: bool,
    pub bump: u8,
}

/// A collateral asset accepted into custody.
#[account]
#[derive(InitSpace)]
pub struct CollateralAsset {
    pub mint: Pubkey,
    pub price_feed_id: [u8; 32],
    /// Upper bound on the custody vault balance; zero means deposits are paused
    pub supply_cap: u64,
    pub whitelisted: bool,
    pub paused: bool,
    pub bump: u8,
}

/// Borrowing terms for one (collateral, synthetic) combination.
#[account]
#[derive(InitSpace)]
pub struct PairConfig {
    pub collateral_mint: Pubkey,
    pub synthetic_mint: Pubkey,
    pub interest_rate_bps: u64, // annual, applied linearly per second
    pub ltv_bps: u64,
    pub liquidation_penalty_bps: u64,
    pub bump: u8,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairParams {
    pub interest_rate_bps: u64,
    pub ltv_bps: u64,
    pub liquidation_penalty_bps: u64,
}

impl PairParams {
    pub fn validate(&self) -> Result<()> {
        require!(
            self.interest_rate_bps <= MAX_INTEREST_RATE_BPS,
            RegistryError::InvalidInterestRate
        );
        require!(
            self.ltv_bps > 0 && self.ltv_bps <= BPS_DENOMINATOR,
            RegistryError::InvalidLtv
        );
        require!(
            self.liquidation_penalty_bps <= MAX_LIQUIDATION_PENALTY_BPS,
            RegistryError::InvalidLiquidationPenalty
        );
        Ok(())
    }
}

#[error_code]
pub enum RegistryError {
    #[msg("Unauthorized access")]
    Unauthorized,
    #[msg("Interest rate must not exceed 10000 bps")]
    InvalidInterestRate,
    #[msg("LTV must be between 1 and 10000 bps")]
    InvalidLtv,
    #[msg("Liquidation penalty must not exceed 5000 bps")]
    InvalidLiquidationPenalty,
    #[msg("Price feed id must not be empty")]
    InvalidPriceFeed,
    #[msg("Collateral and synthetic mints must differ")]
    InvalidPair,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(rate: u64, ltv: u64, penalty: u64) -> PairParams {
        PairParams {
            interest_rate_bps: rate,
            ltv_bps: ltv,
            liquidation_penalty_bps: penalty,
        }
    }

    fn code(result: Result<()>) -> u32 {
        match result {
            Err(anchor_lang::error::Error::AnchorError(e)) => e.error_code_number,
            other => panic!("expected anchor error, got {:?}", other),
        }
    }

    #[test]
    fn accepts_typical_terms() {
        assert!(params(500, 8_000, 1_000).validate().is_ok());
        assert!(params(0, 10_000, 0).validate().is_ok());
        assert!(params(MAX_INTEREST_RATE_BPS, 1, MAX_LIQUIDATION_PENALTY_BPS)
            .validate()
            .is_ok());
    }

    #[test]
    fn rejects_out_of_range_terms() {
        assert_eq!(
            code(params(10_001, 8_000, 1_000).validate()),
            u32::from(RegistryError::InvalidInterestRate)
        );
        assert_eq!(
            code(params(500, 0, 1_000).validate()),
            u32::from(RegistryError::InvalidLtv)
        );
        assert_eq!(
            code(params(500, 10_001, 1_000).validate()),
            u32::from(RegistryError::InvalidLtv)
        );
        assert_eq!(
            code(params(500, 8_000, 5_001).validate()),
            u32::from(RegistryError::InvalidLiquidationPenalty)
        );
    }
}
