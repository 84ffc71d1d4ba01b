use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};
use pyth_solana_receiver_sdk::price_update::PriceUpdateV2;
use synth_registry::{RegistryConfig, COLLATERAL_SEED, PAIR_SEED, REGISTRY_SEED, SYNTHETIC_SEED};

use crate::adapters::{AccountStore, PythOracle, RegistryView, TokenCustody};
use crate::engine::{self, PairConfigStore, PositionLedger, PriceOracle, RepayOutcome, Valuation};
use crate::state::*;

/// Lock collateral and mint synthetic against it, opening the position if needed
pub fn borrow(ctx: Context<Borrow>, borrow_amount: u64, collateral_amount: u64) -> Result<()> {
    let clock = Clock::get()?;
    let (position_bump, index_bump, authority_bump) = (
        ctx.bumps.position,
        ctx.bumps.user_positions,
        ctx.bumps.authority,
    );
    let accounts = &mut *ctx.accounts;
    let borrower = accounts.borrower.key();
    let collateral = accounts.collateral_mint.key();
    let synthetic = accounts.synthetic_mint.key();

    let registry = RegistryView::new(&accounts.registry)
        .with_synthetic(&accounts.synthetic_asset, &accounts.synthetic_mint)?
        .with_collateral(&accounts.collateral_asset, &accounts.collateral_mint)?
        .with_pair(&accounts.pair_config)?;
    let oracle = PythOracle::new(clock.clone())
        .with_feed(&registry, collateral, &accounts.collateral_price_update)
        .with_feed(&registry, synthetic, &accounts.synthetic_price_update);
    let mut custody = TokenCustody::new(
        accounts.token_program.to_account_info(),
        accounts.authority.to_account_info(),
        authority_bump,
    )
    .with_mint(&accounts.synthetic_mint)
    .with_vault(&accounts.vault)
    .with_wallet(
        &accounts.borrower_collateral_account,
        Some(accounts.borrower.to_account_info()),
    )
    .with_wallet(&accounts.borrower_synthetic_account, None);
    let mut store = AccountStore::new(
        &mut accounts.position,
        position_bump,
        &mut accounts.user_positions,
        index_bump,
    );

    let receipt = PositionLedger::new(
        &mut store,
        &registry,
        &oracle,
        &mut custody,
        clock.unix_timestamp,
    )
    .borrow(&borrower, &synthetic, borrow_amount, &collateral, collateral_amount)?;

    let position = &receipt.position;
    emit!(Borrowed {
        borrower,
        collateral_mint: collateral,
        synthetic_mint: synthetic,
        collateral_amount,
        borrow_amount,
        collateral_supplied: position.collateral_supplied,
        principal_minted: position.principal_minted,
        accrued_interest: position.accrued_interest,
        interest_rate_bps: position.interest_rate_bps,
        opened: receipt.opened,
    });
    Ok(())
}

/// Burn synthetic against the position's debt, interest first.
/// `repay_amount == 0` repays everything.
pub fn repay(ctx: Context<Repay>, repay_amount: u64, claim_collateral: bool) -> Result<()> {
    let clock = Clock::get()?;
    let accounts = &mut *ctx.accounts;
    let borrower = accounts.borrower.key();
    let collateral = accounts.collateral_mint.key();
    let synthetic = accounts.synthetic_mint.key();
    let (position_bump, index_bump) = (accounts.position.bump, accounts.user_positions.bump);

    // repay never prices the position
    let registry = RegistryView::new(&accounts.registry);
    let oracle = PythOracle::new(clock.clone());
    let mut custody = TokenCustody::new(
        accounts.token_program.to_account_info(),
        accounts.authority.to_account_info(),
        ctx.bumps.authority,
    )
    .with_mint(&accounts.synthetic_mint)
    .with_vault(&accounts.vault)
    .with_wallet(
        &accounts.borrower_synthetic_account,
        Some(accounts.borrower.to_account_info()),
    )
    .with_wallet(&accounts.borrower_collateral_account, None)
    .with_wallet(&accounts.treasury_synthetic_account, None);
    let mut store = AccountStore::new(
        &mut accounts.position,
        position_bump,
        &mut accounts.user_positions,
        index_bump,
    );

    let receipt = PositionLedger::new(
        &mut store,
        &registry,
        &oracle,
        &mut custody,
        clock.unix_timestamp,
    )
    .repay(&borrower, &collateral, &synthetic, repay_amount, claim_collateral)?;

    if receipt.dust_forgiven > 0 {
        msg!("Forgave {} of dust debt", receipt.dust_forgiven);
    }

    let position = &receipt.position;
    match receipt.outcome {
        RepayOutcome::Partial => emit!(PartiallyRepaid {
            borrower,
            collateral_mint: collateral,
            synthetic_mint: synthetic,
            interest_paid: receipt.settlement.interest_paid,
            principal_paid: receipt.settlement.principal_paid,
            principal_remaining: position.principal_minted,
            interest_remaining: position.accrued_interest,
        }),
        RepayOutcome::Full => emit!(FullyRepaid {
            borrower,
            collateral_mint: collateral,
            synthetic_mint: synthetic,
            interest_paid: receipt.settlement.interest_paid,
            principal_paid: receipt.settlement.principal_paid,
            dust_forgiven: receipt.dust_forgiven,
            collateral_returned: receipt.collateral_returned,
        }),
    }

    if receipt.closed {
        close_position(&accounts.position, &accounts.borrower)?;
    }
    Ok(())
}

/// Release collateral, provided any remaining debt stays within LTV
pub fn withdraw(ctx: Context<Withdraw>, amount: u64) -> Result<()> {
    let clock = Clock::get()?;
    let accounts = &mut *ctx.accounts;
    let borrower = accounts.borrower.key();
    let collateral = accounts.collateral_mint.key();
    let synthetic = accounts.synthetic_mint.key();
    let (position_bump, index_bump) = (accounts.position.bump, accounts.user_positions.bump);

    let registry = RegistryView::new(&accounts.registry)
        .with_synthetic(&accounts.synthetic_asset, &accounts.synthetic_mint)?
        .with_collateral(&accounts.collateral_asset, &accounts.collateral_mint)?
        .with_pair(&accounts.pair_config)?;
    let oracle = PythOracle::new(clock.clone())
        .with_feed(&registry, collateral, &accounts.collateral_price_update)
        .with_feed(&registry, synthetic, &accounts.synthetic_price_update);
    let mut custody = TokenCustody::new(
        accounts.token_program.to_account_info(),
        accounts.authority.to_account_info(),
        ctx.bumps.authority,
    )
    .with_vault(&accounts.vault)
    .with_wallet(&accounts.borrower_collateral_account, None);
    let mut store = AccountStore::new(
        &mut accounts.position,
        position_bump,
        &mut accounts.user_positions,
        index_bump,
    );

    let receipt = PositionLedger::new(
        &mut store,
        &registry,
        &oracle,
        &mut custody,
        clock.unix_timestamp,
    )
    .withdraw(&borrower, &collateral, &synthetic, amount)?;

    emit!(CollateralWithdrawn {
        borrower,
        collateral_mint: collateral,
        synthetic_mint: synthetic,
        amount,
        collateral_remaining: receipt.position.collateral_supplied,
    });

    if receipt.closed {
        close_position(&accounts.position, &accounts.borrower)?;
    }
    Ok(())
}

/// Bring a position's interest current. Permissionless.
pub fn accrue_interest(ctx: Context<AccrueInterest>) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let position = &mut ctx.accounts.position;
    require_keys_neq!(
        position.borrower,
        Pubkey::default(),
        LedgerError::PositionNotFound
    );

    let interest = engine::accrue_interest(position, now)?;

    emit!(InterestAccrued {
        borrower: position.borrower,
        collateral_mint: position.collateral_mint,
        synthetic_mint: position.synthetic_mint,
        interest,
        accrued_interest: position.accrued_interest,
        timestamp: position.last_accrual_ts,
    });
    Ok(())
}

/// Current debt-to-collateral ratio in basis points, interest included.
/// Read-only: accrual is computed on a copy.
pub fn health_check(ctx: Context<HealthCheck>) -> Result<u64> {
    let clock = Clock::get()?;
    let accounts = &ctx.accounts;
    let collateral = accounts.collateral_mint.key();
    let synthetic = accounts.synthetic_mint.key();

    let mut position = Position::clone(&accounts.position);
    require_keys_neq!(
        position.borrower,
        Pubkey::default(),
        LedgerError::PositionNotFound
    );
    engine::accrue_interest(&mut position, clock.unix_timestamp)?;

    let registry = RegistryView::new(&accounts.registry)
        .with_synthetic(&accounts.synthetic_asset, &accounts.synthetic_mint)?
        .with_collateral(&accounts.collateral_asset, &accounts.collateral_mint)?
        .with_pair(&accounts.pair_config)?;
    let terms = registry
        .pair_terms(&collateral, &synthetic)
        .ok_or(LedgerError::AssetNotRecognized)?;
    let oracle = PythOracle::new(clock)
        .with_feed(&registry, collateral, &accounts.collateral_price_update)
        .with_feed(&registry, synthetic, &accounts.synthetic_price_update);

    let valuation = Valuation {
        collateral_price: oracle.price(&collateral)?,
        debt_price: oracle.price(&synthetic)?,
        collateral_decimals: accounts.collateral_mint.decimals,
        debt_decimals: accounts.synthetic_mint.decimals,
    };
    let health = engine::health(&position, &valuation, terms.ltv_bps)?;

    msg!(
        "Health: ltv {} bps of {} max, collateral value {}, debt value {}, solvent {}",
        health.ltv_bps,
        health.max_ltv_bps,
        health.collateral_value,
        health.debt_value,
        health.solvent
    );
    Ok(health.ltv_bps)
}

/// Refund a deleted position's rent to its borrower.
pub(crate) fn close_position<'info>(
    position: &Account<'info, Position>,
    borrower: &AccountInfo<'info>,
) -> Result<()> {
    emit!(PositionClosed {
        borrower: borrower.key(),
        position: position.key(),
    });
    position.close(borrower.clone())
}

#[derive(Accounts)]
pub struct Borrow<'info> {
    #[account(mut)]
    pub borrower: Signer<'info>,

    #[account(
        init_if_needed,
        payer = borrower,
        space = 8 + Position::INIT_SPACE,
        seeds = [
            POSITION_SEED,
            borrower.key().as_ref(),
            collateral_mint.key().as_ref(),
            synthetic_mint.key().as_ref()
        ],
        bump
    )]
    pub position: Box<Account<'info, Position>>,

    #[account(
        init_if_needed,
        payer = borrower,
        space = 8 + UserPositions::INIT_SPACE,
        seeds = [USER_POSITIONS_SEED, borrower.key().as_ref()],
        bump
    )]
    pub user_positions: Box<Account<'info, UserPositions>>,

    #[account(seeds = [REGISTRY_SEED], bump = registry.bump, seeds::program = synth_registry::ID)]
    pub registry: Box<Account<'info, RegistryConfig>>,

    /// CHECK: Registry entry for the synthetic mint, may be uninitialized; read via RegistryView
    #[account(
        seeds = [SYNTHETIC_SEED, synthetic_mint.key().as_ref()],
        bump,
        seeds::program = synth_registry::ID
    )]
    pub synthetic_asset: UncheckedAccount<'info>,

    /// CHECK: Registry entry for the collateral mint, may be uninitialized; read via RegistryView
    #[account(
        seeds = [COLLATERAL_SEED, collateral_mint.key().as_ref()],
        bump,
        seeds::program = synth_registry::ID
    )]
    pub collateral_asset: UncheckedAccount<'info>,

    /// CHECK: Pair terms, may be uninitialized; read via RegistryView
    #[account(
        seeds = [PAIR_SEED, collateral_mint.key().as_ref(), synthetic_mint.key().as_ref()],
        bump,
        seeds::program = synth_registry::ID
    )]
    pub pair_config: UncheckedAccount<'info>,

    #[account(mut)]
    pub synthetic_mint: Box<Account<'info, Mint>>,
    pub collateral_mint: Box<Account<'info, Mint>>,

    #[account(mut, token::mint = collateral_mint, token::authority = borrower)]
    pub borrower_collateral_account: Box<Account<'info, TokenAccount>>,

    #[account(mut, token::mint = synthetic_mint, token::authority = borrower)]
    pub borrower_synthetic_account: Box<Account<'info, TokenAccount>>,

    #[account(mut, seeds = [VAULT_SEED, collateral_mint.key().as_ref()], bump)]
    pub vault: Box<Account<'info, TokenAccount>>,

    /// CHECK: PDA owning every vault and holding mint authority over synthetics
    #[account(seeds = [AUTHORITY_SEED], bump)]
    pub authority: UncheckedAccount<'info>,

    #[account(owner = pyth_solana_receiver_sdk::ID)]
    pub collateral_price_update: Account<'info, PriceUpdateV2>,

    #[account(owner = pyth_solana_receiver_sdk::ID)]
    pub synthetic_price_update: Account<'info, PriceUpdateV2>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct Repay<'info> {
    #[account(mut)]
    pub borrower: Signer<'info>,

    #[account(
        mut,
        seeds = [
            POSITION_SEED,
            borrower.key().as_ref(),
            collateral_mint.key().as_ref(),
            synthetic_mint.key().as_ref()
        ],
        bump = position.bump
    )]
    pub position: Box<Account<'info, Position>>,

    #[account(
        mut,
        seeds = [USER_POSITIONS_SEED, borrower.key().as_ref()],
        bump = user_positions.bump
    )]
    pub user_positions: Box<Account<'info, UserPositions>>,

    #[account(seeds = [REGISTRY_SEED], bump = registry.bump, seeds::program = synth_registry::ID)]
    pub registry: Box<Account<'info, RegistryConfig>>,

    #[account(mut)]
    pub synthetic_mint: Box<Account<'info, Mint>>,
    pub collateral_mint: Box<Account<'info, Mint>>,

    #[account(mut, token::mint = synthetic_mint, token::authority = borrower)]
    pub borrower_synthetic_account: Box<Account<'info, TokenAccount>>,

    #[account(mut, token::mint = collateral_mint, token::authority = borrower)]
    pub borrower_collateral_account: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        token::mint = synthetic_mint,
        constraint = treasury_synthetic_account.owner == registry.treasury
            @ LedgerError::CustodyAccountMissing
    )]
    pub treasury_synthetic_account: Box<Account<'info, TokenAccount>>,

    #[account(mut, seeds = [VAULT_SEED, collateral_mint.key().as_ref()], bump)]
    pub vault: Box<Account<'info, TokenAccount>>,

    /// CHECK: PDA owning every vault and holding mint authority over synthetics
    #[account(seeds = [AUTHORITY_SEED], bump)]
    pub authority: UncheckedAccount<'info>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct Withdraw<'info> {
    #[account(mut)]
    pub borrower: Signer<'info>,

    #[account(
        mut,
        seeds = [
            POSITION_SEED,
            borrower.key().as_ref(),
            collateral_mint.key().as_ref(),
            synthetic_mint.key().as_ref()
        ],
        bump = position.bump
    )]
    pub position: Box<Account<'info, Position>>,

    #[account(
        mut,
        seeds = [USER_POSITIONS_SEED, borrower.key().as_ref()],
        bump = user_positions.bump
    )]
    pub user_positions: Box<Account<'info, UserPositions>>,

    #[account(seeds = [REGISTRY_SEED], bump = registry.bump, seeds::program = synth_registry::ID)]
    pub registry: Box<Account<'info, RegistryConfig>>,

    /// CHECK: Registry entry for the synthetic mint; read via RegistryView
    #[account(
        seeds = [SYNTHETIC_SEED, synthetic_mint.key().as_ref()],
        bump,
        seeds::program = synth_registry::ID
    )]
    pub synthetic_asset: UncheckedAccount<'info>,

    /// CHECK: Registry entry for the collateral mint; read via RegistryView
    #[account(
        seeds = [COLLATERAL_SEED, collateral_mint.key().as_ref()],
        bump,
        seeds::program = synth_registry::ID
    )]
    pub collateral_asset: UncheckedAccount<'info>,

    /// CHECK: Pair terms; read via RegistryView
    #[account(
        seeds = [PAIR_SEED, collateral_mint.key().as_ref(), synthetic_mint.key().as_ref()],
        bump,
        seeds::program = synth_registry::ID
    )]
    pub pair_config: UncheckedAccount<'info>,

    pub synthetic_mint: Box<Account<'info, Mint>>,
    pub collateral_mint: Box<Account<'info, Mint>>,

    #[account(mut, token::mint = collateral_mint, token::authority = borrower)]
    pub borrower_collateral_account: Box<Account<'info, TokenAccount>>,

    #[account(mut, seeds = [VAULT_SEED, collateral_mint.key().as_ref()], bump)]
    pub vault: Box<Account<'info, TokenAccount>>,

    /// CHECK: PDA owning every vault and holding mint authority over synthetics
    #[account(seeds = [AUTHORITY_SEED], bump)]
    pub authority: UncheckedAccount<'info>,

    #[account(owner = pyth_solana_receiver_sdk::ID)]
    pub collateral_price_update: Account<'info, PriceUpdateV2>,

    #[account(owner = pyth_solana_receiver_sdk::ID)]
    pub synthetic_price_update: Account<'info, PriceUpdateV2>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct AccrueInterest<'info> {
    #[account(
        mut,
        seeds = [
            POSITION_SEED,
            position.borrower.as_ref(),
            position.collateral_mint.as_ref(),
            position.synthetic_mint.as_ref()
        ],
        bump = position.bump
    )]
    pub position: Account<'info, Position>,
}

#[derive(Accounts)]
pub struct HealthCheck<'info> {
    #[account(
        seeds = [
            POSITION_SEED,
            position.borrower.as_ref(),
            collateral_mint.key().as_ref(),
            synthetic_mint.key().as_ref()
        ],
        bump = position.bump
    )]
    pub position: Box<Account<'info, Position>>,

    #[account(seeds = [REGISTRY_SEED], bump = registry.bump, seeds::program = synth_registry::ID)]
    pub registry: Box<Account<'info, RegistryConfig>>,

    /// CHECK: Registry entry for the synthetic mint; read via RegistryView
    #[account(
        seeds = [SYNTHETIC_SEED, synthetic_mint.key().as_ref()],
        bump,
        seeds::program = synth_registry::ID
    )]
    pub synthetic_asset: UncheckedAccount<'info>,

    /// CHECK: Registry entry for the collateral mint; read via RegistryView
    #[account(
        seeds = [COLLATERAL_SEED, collateral_mint.key().as_ref()],
        bump,
        seeds::program = synth_registry::ID
    )]
    pub collateral_asset: UncheckedAccount<'info>,

    /// CHECK: Pair terms; read via RegistryView
    #[account(
        seeds = [PAIR_SEED, collateral_mint.key().as_ref(), synthetic_mint.key().as_ref()],
        bump,
        seeds::program = synth_registry::ID
    )]
    pub pair_config: UncheckedAccount<'info>,

    pub synthetic_mint: Box<Account<'info, Mint>>,
    pub collateral_mint: Box<Account<'info, Mint>>,

    #[account(owner = pyth_solana_receiver_sdk::ID)]
    pub collateral_price_update: Account<'info, PriceUpdateV2>,

    #[account(owner = pyth_solana_receiver_sdk::ID)]
    pub synthetic_price_update: Account<'info, PriceUpdateV2>,
}

#[event]
pub struct Borrowed {
    pub borrower: Pubkey,
    pub collateral_mint: Pubkey,
    pub synthetic_mint: Pubkey,
    pub collateral_amount: u64,
    pub borrow_amount: u64,
    pub collateral_supplied: u64,
    pub principal_minted: u64,
    pub accrued_interest: u64,
    pub interest_rate_bps: u64,
    pub opened: bool,
}

#[event]
pub struct PartiallyRepaid {
    pub borrower: Pubkey,
    pub collateral_mint: Pubkey,
    pub synthetic_mint: Pubkey,
    pub interest_paid: u64,
    pub principal_paid: u64,
    pub principal_remaining: u64,
    pub interest_remaining: u64,
}

#[event]
pub struct FullyRepaid {
    pub borrower: Pubkey,
    pub collateral_mint: Pubkey,
    pub synthetic_mint: Pubkey,
    pub interest_paid: u64,
    pub principal_paid: u64,
    pub dust_forgiven: u64,
    pub collateral_returned: u64,
}

#[event]
pub struct CollateralWithdrawn {
    pub borrower: Pubkey,
    pub collateral_mint: Pubkey,
    pub synthetic_mint: Pubkey,
    pub amount: u64,
    pub collateral_remaining: u64,
}

#[event]
pub struct PositionClosed {
    pub borrower: Pubkey,
    pub position: Pubkey,
}

#[event]
pub struct InterestAccrued {
    pub borrower: Pubkey,
    pub collateral_mint: Pubkey,
    pub synthetic_mint: Pubkey,
    pub interest: u64,
    pub accrued_interest: u64,
    pub timestamp: i64,
}
