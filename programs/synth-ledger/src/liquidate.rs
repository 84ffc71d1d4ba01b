use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};
use pyth_solana_receiver_sdk::price_update::PriceUpdateV2;
use synth_registry::{RegistryConfig, COLLATERAL_SEED, PAIR_SEED, REGISTRY_SEED, SYNTHETIC_SEED};

use crate::adapters::{AccountStore, PythOracle, RegistryView, TokenCustody};
use crate::debt::close_position;
use crate::engine::PositionLedger;
use crate::state::*;

/// Repay an insolvent position's debt and take its collateral plus the pair
/// penalty. `repay_amount == 0` repays the whole debt. Anyone may call this.
pub fn liquidate(ctx: Context<Liquidate>, repay_amount: u64) -> Result<()> {
    let clock = Clock::get()?;
    let accounts = &mut *ctx.accounts;
    let liquidator = accounts.liquidator.key();
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
    .with_mint(&accounts.synthetic_mint)
    .with_vault(&accounts.vault)
    .with_wallet(
        &accounts.liquidator_synthetic_account,
        Some(accounts.liquidator.to_account_info()),
    )
    .with_wallet(&accounts.liquidator_collateral_account, None);
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
    .liquidate(&liquidator, &borrower, &collateral, &synthetic, repay_amount)?;

    emit!(PositionLiquidated {
        liquidator,
        borrower,
        collateral_mint: collateral,
        synthetic_mint: synthetic,
        repaid: receipt.repaid,
        interest_paid: receipt.settlement.interest_paid,
        principal_paid: receipt.settlement.principal_paid,
        collateral_seized: receipt.seizure.total,
        liquidation_bonus: receipt.seizure.bonus,
        principal_remaining: receipt.position.principal_minted,
        collateral_remaining: receipt.position.collateral_supplied,
    });

    if receipt.closed {
        close_position(&accounts.position, &accounts.borrower)?;
    }
    Ok(())
}

#[derive(Accounts)]
pub struct Liquidate<'info> {
    #[account(mut)]
    pub liquidator: Signer<'info>,

    /// CHECK: Owner of the position being liquidated; receives its rent if it closes
    #[account(mut)]
    pub borrower: UncheckedAccount<'info>,

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

    #[account(mut, token::mint = synthetic_mint, token::authority = liquidator)]
    pub liquidator_synthetic_account: Box<Account<'info, TokenAccount>>,

    #[account(mut, token::mint = collateral_mint, token::authority = liquidator)]
    pub liquidator_collateral_account: Box<Account<'info, TokenAccount>>,

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

#[event]
pub struct PositionLiquidated {
    pub liquidator: Pubkey,
    pub borrower: Pubkey,
    pub collateral_mint: Pubkey,
    pub synthetic_mint: Pubkey,
    pub repaid: u64,
    pub interest_paid: u64,
    pub principal_paid: u64,
    pub collateral_seized: u64,
    pub liquidation_bonus: u64,
    pub principal_remaining: u64,
    pub collateral_remaining: u64,
}
