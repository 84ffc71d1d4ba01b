use anchor_lang::prelude::*;
use anchor_spl::token::Mint;

pub mod state;
pub use state::*;

declare_id!("3xSyRgYkS3W1Y9cQmVb8tP4nRk2hD6eJqLw7uZfA5oGe");

#[program]
pub mod synth_registry {
    use super::*;

    /// Create the registry and record the protocol treasury
    pub fn initialize_registry(ctx: Context<InitializeRegistry>) -> Result<()> {
        let registry = &mut ctx.accounts.registry;
        registry.authority = ctx.accounts.authority.key();
        registry.treasury = ctx.accounts.treasury.key();
        registry.bump = ctx.bumps.registry;

        msg!("Registry initialized with treasury {}", registry.treasury);
        Ok(())
    }

    /// Point interest revenue at a different wallet
    pub fn set_treasury(ctx: Context<SetTreasury>) -> Result<()> {
        let registry = &mut ctx.accounts.registry;
        require_keys_eq!(
            registry.authority,
            ctx.accounts.authority.key(),
            RegistryError::Unauthorized
        );
        registry.treasury = ctx.accounts.treasury.key();

        msg!("Treasury set to {}", registry.treasury);
        Ok(())
    }

    /// Whitelist a mint as a synthetic asset the ledger may issue
    pub fn register_synthetic_asset(
        ctx: Context<RegisterSyntheticAsset>,
        price_feed_id: [u8; 32],
        mint_cap: u64,
    ) -> Result<()> {
        require!(price_feed_id != [0u8; 32], RegistryError::InvalidPriceFeed);

        let asset = &mut ctx.accounts.synthetic_asset;
        asset.mint = ctx.accounts.mint.key();
        asset.price_feed_id = price_feed_id;
        asset.mint_cap = mint_cap;
        asset.paused = false;
        asset.bump = ctx.bumps.synthetic_asset;

        emit!(AssetRegistered {
            mint: asset.mint,
            kind: AssetKind::Synthetic,
            cap: mint_cap,
        });
        Ok(())
    }

    /// Whitelist a mint as collateral
    pub fn register_collateral_asset(
        ctx: Context<RegisterCollateralAsset>,
        price_feed_id: [u8; 32],
        supply_cap: u64,
    ) -> Result<()> {
        require!(price_feed_id != [0u8; 32], RegistryError::InvalidPriceFeed);

        let asset = &mut ctx.accounts.collateral_asset;
        asset.mint = ctx.accounts.mint.key();
        asset.price_feed_id = price_feed_id;
        asset.supply_cap = supply_cap;
        asset.whitelisted = true;
        asset.paused = false;
        asset.bump = ctx.bumps.collateral_asset;

        emit!(AssetRegistered {
            mint: asset.mint,
            kind: AssetKind::Collateral,
            cap: supply_cap,
        });
        Ok(())
    }

    pub fn update_synthetic_asset(
        ctx: Context<UpdateSyntheticAsset>,
        mint_cap: u64,
        paused: bool,
    ) -> Result<()> {
        let asset = &mut ctx.accounts.synthetic_asset;
        asset.mint_cap = mint_cap;
        asset.paused = paused;

        emit!(AssetUpdated {
            mint: asset.mint,
            kind: AssetKind::Synthetic,
            cap: mint_cap,
            whitelisted: true,
            paused,
        });
        Ok(())
    }

    pub fn update_collateral_asset(
        ctx: Context<UpdateCollateralAsset>,
        supply_cap: u64,
        whitelisted: bool,
        paused: bool,
    ) -> Result<()> {
        let asset = &mut ctx.accounts.collateral_asset;
        asset.supply_cap = supply_cap;
        asset.whitelisted = whitelisted;
        asset.paused = paused;

        emit!(AssetUpdated {
            mint: asset.mint,
            kind: AssetKind::Collateral,
            cap: supply_cap,
            whitelisted,
            paused,
        });
        Ok(())
    }

    /// Create or replace the borrowing terms for a (collateral, synthetic) pair.
    /// Open positions pick up a new rate on their next borrow.
    pub fn configure_pair(ctx: Context<ConfigurePair>, params: PairParams) -> Result<()> {
        params.validate()?;
        require_keys_neq!(
            ctx.accounts.collateral_asset.mint,
            ctx.accounts.synthetic_asset.mint,
            RegistryError::InvalidPair
        );

        let pair = &mut ctx.accounts.pair_config;
        pair.collateral_mint = ctx.accounts.collateral_asset.mint;
        pair.synthetic_mint = ctx.accounts.synthetic_asset.mint;
        pair.interest_rate_bps = params.interest_rate_bps;
        pair.ltv_bps = params.ltv_bps;
        pair.liquidation_penalty_bps = params.liquidation_penalty_bps;
        pair.bump = ctx.bumps.pair_config;

        emit!(PairConfigured {
            collateral_mint: pair.collateral_mint,
            synthetic_mint: pair.synthetic_mint,
            interest_rate_bps: params.interest_rate_bps,
            ltv_bps: params.ltv_bps,
            liquidation_penalty_bps: params.liquidation_penalty_bps,
        });
        Ok(())
    }
}

#[derive(Accounts)]
pub struct InitializeRegistry<'info> {
    #[account(
        init,
        payer = authority,
        space = 8 + RegistryConfig::INIT_SPACE,
        seeds = [REGISTRY_SEED],
        bump
    )]
    pub registry: Account<'info, RegistryConfig>,
    #[account(mut)]
    pub authority: Signer<'info>,
    /// CHECK: Wallet that owns the treasury token accounts; never read or written
    pub treasury: UncheckedAccount<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct SetTreasury<'info> {
    #[account(mut, seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, RegistryConfig>,
    pub authority: Signer<'info>,
    /// CHECK: Wallet that owns the treasury token accounts; never read or written
    pub treasury: UncheckedAccount<'info>,
}

#[derive(Accounts)]
pub struct RegisterSyntheticAsset<'info> {
    #[account(
        seeds = [REGISTRY_SEED],
        bump = registry.bump,
        has_one = authority @ RegistryError::Unauthorized
    )]
    pub registry: Account<'info, RegistryConfig>,
    #[account(mut)]
    pub authority: Signer<'info>,
    pub mint: Account<'info, Mint>,
    #[account(
        init,
        payer = authority,
        space = 8 + SyntheticAsset::INIT_SPACE,
        seeds = [SYNTHETIC_SEED, mint.key().as_ref()],
        bump
    )]
    pub synthetic_asset: Account<'info, SyntheticAsset>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct RegisterCollateralAsset<'info> {
    #[account(
        seeds = [REGISTRY_SEED],
        bump = registry.bump,
        has_one = authority @ RegistryError::Unauthorized
    )]
    pub registry: Account<'info, RegistryConfig>,
    #[account(mut)]
    pub authority: Signer<'info>,
    pub mint: Account<'info, Mint>,
    #[account(
        init,
        payer = authority,
        space = 8 + CollateralAsset::INIT_SPACE,
        seeds = [COLLATERAL_SEED, mint.key().as_ref()],
        bump
    )]
    pub collateral_asset: Account<'info, CollateralAsset>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct UpdateSyntheticAsset<'info> {
    #[account(
        seeds = [REGISTRY_SEED],
        bump = registry.bump,
        has_one = authority @ RegistryError::Unauthorized
    )]
    pub registry: Account<'info, RegistryConfig>,
    pub authority: Signer<'info>,
    #[account(
        mut,
        seeds = [SYNTHETIC_SEED, synthetic_asset.mint.as_ref()],
        bump = synthetic_asset.bump
    )]
    pub synthetic_asset: Account<'info, SyntheticAsset>,
}

#[derive(Accounts)]
pub struct UpdateCollateralAsset<'info> {
    #[account(
        seeds = [REGISTRY_SEED],
        bump = registry.bump,
        has_one = authority @ RegistryError::Unauthorized
    )]
    pub registry: Account<'info, RegistryConfig>,
    pub authority: Signer<'info>,
    #[account(
        mut,
        seeds = [COLLATERAL_SEED, collateral_asset.mint.as_ref()],
        bump = collateral_asset.bump
    )]
    pub collateral_asset: Account<'info, CollateralAsset>,
}

#[derive(Accounts)]
pub struct ConfigurePair<'info> {
    #[account(
        seeds = [REGISTRY_SEED],
        bump = registry.bump,
        has_one = authority @ RegistryError::Unauthorized
    )]
    pub registry: Account<'info, RegistryConfig>,
    #[account(mut)]
    pub authority: Signer<'info>,
    #[account(
        seeds = [COLLATERAL_SEED, collateral_asset.mint.as_ref()],
        bump = collateral_asset.bump
    )]
    pub collateral_asset: Account<'info, CollateralAsset>,
    #[account(
        seeds = [SYNTHETIC_SEED, synthetic_asset.mint.as_ref()],
        bump = synthetic_asset.bump
    )]
    pub synthetic_asset: Account<'info, SyntheticAsset>,
    #[account(
        init_if_needed,
        payer = authority,
        space = 8 + PairConfig::INIT_SPACE,
        seeds = [
            PAIR_SEED,
            collateral_asset.mint.as_ref(),
            synthetic_asset.mint.as_ref()
        ],
        bump
    )]
    pub pair_config: Account<'info, PairConfig>,
    pub system_program: Program<'info, System>,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    Synthetic,
    Collateral,
}

#[event]
pub struct AssetRegistered {
    pub mint: Pubkey,
    pub kind: AssetKind,
    pub cap: u64,
}

#[event]
pub struct AssetUpdated {
    pub mint: Pubkey,
    pub kind: AssetKind,
    pub cap: u64,
    pub whitelisted: bool,
    pub paused: bool,
}

#[event]
pub struct PairConfigured {
    pub collateral_mint: Pubkey,
    pub synthetic_mint: Pubkey,
    pub interest_rate_bps: u64,
    pub ltv_bps: u64,
    pub liquidation_penalty_bps: u64,
}
