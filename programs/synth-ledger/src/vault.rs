use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::state::*;

/// Create the custody account for a collateral mint. Permissionless; the
/// account is owned by the ledger authority PDA.
pub fn initialize_vault(ctx: Context<InitializeVault>) -> Result<()> {
    msg!(
        "Vault {} created for collateral {}",
        ctx.accounts.vault.key(),
        ctx.accounts.collateral_mint.key()
    );
    Ok(())
}

#[derive(Accounts)]
pub struct InitializeVault<'info> {
    #[account(mut)]
    pub payer: Signer<'info>,

    pub collateral_mint: Account<'info, Mint>,

    #[account(
        init,
        payer = payer,
        seeds = [VAULT_SEED, collateral_mint.key().as_ref()],
        bump,
        token::mint = collateral_mint,
        token::authority = authority
    )]
    pub vault: Account<'info, TokenAccount>,

    /// CHECK: PDA owning every vault and holding mint authority over synthetics
    #[account(seeds = [AUTHORITY_SEED], bump)]
    pub authority: UncheckedAccount<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}
