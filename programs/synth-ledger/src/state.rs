use anchor_lang::prelude::*;

pub const AUTHORITY_SEED: &[u8] = b"authority";
pub const VAULT_SEED: &[u8] = b"vault";
pub const POSITION_SEED: &[u8] = b"position";
pub const USER_POSITIONS_SEED: &[u8] = b"user_positions";

/// Basis-point denominator shared by rates, LTV and penalties
pub const RATE_PRECISION: u64 = 10_000;
pub const SECONDS_PER_YEAR: u64 = 31_536_000; // 365 days
/// Principal and interest at or below this many base units count as repaid
pub const DUST_THRESHOLD: u64 = 1;
/// Capacity of `UserPositions::entries`; keep in step with its `max_len`
pub const MAX_OPEN_POSITIONS: usize = 16;

/// Oracle prices are normalised to this many decimals before reaching the engine
pub const PRICE_DECIMALS: u32 = 6;
pub const MAX_PRICE_AGE_SECONDS: u64 = 60;

/// A borrower's debt against one (collateral, synthetic) pair.
///
/// PDA: `[b"position", borrower, collateral_mint, synthetic_mint]`, so at most one
/// exists per triple. A zeroed account (default borrower) is treated as absent.
#[account]
#[derive(InitSpace, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub borrower: Pubkey,
    pub collateral_mint: Pubkey,
    pub synthetic_mint: Pubkey,
    /// Collateral in custody, collateral-native precision
    pub collateral_supplied: u64,
    /// Outstanding minted synthetic, excluding interest
    pub principal_minted: u64,
    /// Unpaid interest, synthetic precision
    pub accrued_interest: u64,
    pub last_accrual_ts: i64,
    /// Rate snapshot applied from `last_accrual_ts` onward
    pub interest_rate_bps: u64,
    pub bump: u8,
}

impl Position {
    pub fn position_key(&self) -> PositionKey {
        PositionKey {
            borrower: self.borrower,
            collateral_mint: self.collateral_mint,
            synthetic_mint: self.synthetic_mint,
        }
    }

    pub fn total_debt(&self) -> Result<u64> {
        self.principal_minted
            .checked_add(self.accrued_interest)
            .ok_or_else(|| error!(LedgerError::ArithmeticOverflow))
    }

    pub fn has_debt(&self) -> bool {
        self.principal_minted > 0 || self.accrued_interest > 0
    }

    /// Rounding residue left after repayment; treated as settled, never collected
    pub fn is_dust_closed(&self) -> bool {
        self.principal_minted <= DUST_THRESHOLD && self.accrued_interest <= DUST_THRESHOLD
    }

    pub fn is_fully_closed(&self) -> bool {
        self.principal_minted == 0 && self.accrued_interest == 0 && self.collateral_supplied == 0
    }
}

/// Identity of a position independent of where it is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositionKey {
    pub borrower: Pubkey,
    pub collateral_mint: Pubkey,
    pub synthetic_mint: Pubkey,
}

impl PositionKey {
    pub fn new(borrower: Pubkey, collateral_mint: Pubkey, synthetic_mint: Pubkey) -> Self {
        Self {
            borrower,
            collateral_mint,
            synthetic_mint,
        }
    }

    pub fn pair(&self) -> PairKey {
        PairKey {
            collateral_mint: self.collateral_mint,
            synthetic_mint: self.synthetic_mint,
        }
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, InitSpace)]
pub struct PairKey {
    pub collateral_mint: Pubkey,
    pub synthetic_mint: Pubkey,
}

/// Open pairs for one borrower. PDA: `[b"user_positions", borrower]`.
#[account]
#[derive(InitSpace, Debug, Default)]
pub struct UserPositions {
    pub borrower: Pubkey,
    #[max_len(16)]
    pub entries: Vec<PairKey>,
    pub bump: u8,
}

#[error_code]
pub enum LedgerError {
    #[msg("Amount must be positive and within the available quantity")]
    InputInvalid,
    #[msg("Asset or asset pair is not registered")]
    AssetNotRecognized,
    #[msg("Asset is paused")]
    AssetPaused,
    #[msg("Position not found")]
    PositionNotFound,
    #[msg("Position has no debt")]
    NoDebt,
    #[msg("Position would be insolvent")]
    Insolvent,
    #[msg("Position is solvent and cannot be liquidated")]
    Solvent,
    #[msg("Mint or supply cap exceeded")]
    CapExceeded,
    #[msg("Seized collateral exceeds the position's collateral")]
    SeizeExceedsCollateral,
    #[msg("Arithmetic overflow")]
    ArithmeticOverflow,
    #[msg("Borrower has reached the maximum number of open positions")]
    PositionIndexFull,
    #[msg("Invalid oracle price")]
    InvalidOraclePrice,
    #[msg("Token account for this transfer was not supplied")]
    CustodyAccountMissing,
    #[msg("Insufficient funds")]
    InsufficientFunds,
}
