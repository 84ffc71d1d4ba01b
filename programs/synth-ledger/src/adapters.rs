//! Account-backed implementations of the engine collaborators.

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Burn, Mint, MintTo, TokenAccount, Transfer};
use pyth_solana_receiver_sdk::price_update::PriceUpdateV2;
use synth_registry::{CollateralAsset, PairConfig, RegistryConfig, SyntheticAsset};

use crate::engine::{
    AssetCustody, AssetState, PairConfigStore, PairTerms, PositionIndex, PositionStore,
    PriceOracle,
};
use crate::state::*;

/// Pyth exponents outside this range are rejected before scaling
const MAX_EXPONENT_ABS: i32 = 18;

/// Registry accounts are passed unchecked so an unregistered asset surfaces as a
/// ledger error rather than an account validation failure.
pub fn read_registry_account<T: AccountDeserialize>(info: &AccountInfo) -> Result<Option<T>> {
    if info.owner != &synth_registry::ID || info.data_is_empty() {
        return Ok(None);
    }
    let data = info.try_borrow_data()?;
    T::try_deserialize(&mut &data[..]).map(Some)
}

/// Snapshot of the registry state one instruction needs.
pub struct RegistryView {
    treasury: Pubkey,
    synthetic: Option<SyntheticAsset>,
    collateral: Option<CollateralAsset>,
    pair: Option<PairConfig>,
    decimals: Vec<(Pubkey, u8)>,
}

impl RegistryView {
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            treasury: config.treasury,
            synthetic: None,
            collateral: None,
            pair: None,
            decimals: Vec::with_capacity(2),
        }
    }

    pub fn with_synthetic(mut self, asset: &AccountInfo, mint: &Account<Mint>) -> Result<Self> {
        self.synthetic = read_registry_account::<SyntheticAsset>(asset)?
            .filter(|registered| registered.mint == mint.key());
        self.decimals.push((mint.key(), mint.decimals));
        Ok(self)
    }

    pub fn with_collateral(mut self, asset: &AccountInfo, mint: &Account<Mint>) -> Result<Self> {
        self.collateral = read_registry_account::<CollateralAsset>(asset)?
            .filter(|registered| registered.mint == mint.key());
        self.decimals.push((mint.key(), mint.decimals));
        Ok(self)
    }

    pub fn with_pair(mut self, pair: &AccountInfo) -> Result<Self> {
        self.pair = read_registry_account::<PairConfig>(pair)?;
        Ok(self)
    }

    pub fn price_feed_id(&self, asset: &Pubkey) -> Option<[u8; 32]> {
        match (&self.synthetic, &self.collateral) {
            (Some(synthetic), _) if synthetic.mint == *asset => Some(synthetic.price_feed_id),
            (_, Some(collateral)) if collateral.mint == *asset => Some(collateral.price_feed_id),
            _ => None,
        }
    }
}

impl PairConfigStore for RegistryView {
    fn pair_terms(&self, collateral: &Pubkey, synthetic: &Pubkey) -> Option<PairTerms> {
        self.pair
            .as_ref()
            .filter(|pair| pair.collateral_mint == *collateral && pair.synthetic_mint == *synthetic)
            .map(|pair| PairTerms {
                interest_rate_bps: pair.interest_rate_bps,
                ltv_bps: pair.ltv_bps,
                liquidation_penalty_bps: pair.liquidation_penalty_bps,
            })
    }

    fn synthetic_asset(&self, asset: &Pubkey) -> Option<AssetState> {
        // registration is the whitelist for synthetics
        self.synthetic
            .as_ref()
            .filter(|synthetic| synthetic.mint == *asset)
            .map(|synthetic| AssetState {
                whitelisted: true,
                cap: synthetic.mint_cap,
                paused: synthetic.paused,
            })
    }

    fn collateral_asset(&self, asset: &Pubkey) -> Option<AssetState> {
        self.collateral
            .as_ref()
            .filter(|collateral| collateral.mint == *asset)
            .map(|collateral| AssetState {
                whitelisted: collateral.whitelisted,
                cap: collateral.supply_cap,
                paused: collateral.paused,
            })
    }

    fn decimals(&self, asset: &Pubkey) -> Result<u8> {
        self.decimals
            .iter()
            .find(|(mint, _)| mint == asset)
            .map(|(_, decimals)| *decimals)
            .ok_or_else(|| error!(LedgerError::AssetNotRecognized))
    }

    fn treasury(&self) -> Result<Pubkey> {
        Ok(self.treasury)
    }
}

/// Scale a Pyth `price * 10^exponent` to `PRICE_DECIMALS` fixed point.
pub fn normalize_price(price: i64, exponent: i32) -> Result<u64> {
    require!(price > 0, LedgerError::InvalidOraclePrice);
    require!(
        exponent.abs() <= MAX_EXPONENT_ABS,
        LedgerError::InvalidOraclePrice
    );

    let price = price as u128;
    let shift = exponent + PRICE_DECIMALS as i32;
    let scaled = if shift >= 0 {
        price
            .checked_mul(10u128.pow(shift as u32))
            .ok_or(LedgerError::ArithmeticOverflow)?
    } else {
        price / 10u128.pow(shift.unsigned_abs())
    };

    require!(scaled > 0, LedgerError::InvalidOraclePrice);
    u64::try_from(scaled).map_err(|_| error!(LedgerError::InvalidOraclePrice))
}

struct PriceFeed<'a> {
    mint: Pubkey,
    feed_id: [u8; 32],
    update: &'a PriceUpdateV2,
}

/// Reads Pyth pull-oracle updates, rejecting anything older than
/// `MAX_PRICE_AGE_SECONDS`.
pub struct PythOracle<'a> {
    clock: Clock,
    feeds: Vec<PriceFeed<'a>>,
}

impl<'a> PythOracle<'a> {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            feeds: Vec::with_capacity(2),
        }
    }

    /// Attach the update for `mint`; a mint without a registered feed is skipped.
    pub fn with_feed(
        mut self,
        registry: &RegistryView,
        mint: Pubkey,
        update: &'a PriceUpdateV2,
    ) -> Self {
        if let Some(feed_id) = registry.price_feed_id(&mint) {
            self.feeds.push(PriceFeed {
                mint,
                feed_id,
                update,
            });
        }
        self
    }
}

impl PriceOracle for PythOracle<'_> {
    fn price(&self, asset: &Pubkey) -> Result<u64> {
        let feed = self
            .feeds
            .iter()
            .find(|feed| feed.mint == *asset)
            .ok_or(LedgerError::InvalidOraclePrice)?;
        let price = feed.update.get_price_no_older_than(
            &self.clock,
            MAX_PRICE_AGE_SECONDS,
            &feed.feed_id,
        )?;
        normalize_price(price.price, price.exponent)
    }
}

struct MintHandle<'info> {
    key: Pubkey,
    info: AccountInfo<'info>,
    supply: u64,
}

struct VaultHandle<'info> {
    mint: Pubkey,
    info: AccountInfo<'info>,
    balance: u64,
}

struct WalletHandle<'info> {
    mint: Pubkey,
    owner: Pubkey,
    info: AccountInfo<'info>,
    /// Present when the owner signed and may be debited
    signer: Option<AccountInfo<'info>>,
}

/// SPL token custody. Vaults and synthetic mints are controlled by the
/// `[b"authority"]` PDA; user-side debits are signed by the user.
///
/// Supply and vault figures are the values at load time, which is when the
/// engine reads them.
pub struct TokenCustody<'info> {
    token_program: AccountInfo<'info>,
    authority: AccountInfo<'info>,
    authority_bump: u8,
    mints: Vec<MintHandle<'info>>,
    vaults: Vec<VaultHandle<'info>>,
    wallets: Vec<WalletHandle<'info>>,
}

impl<'info> TokenCustody<'info> {
    pub fn new(
        token_program: AccountInfo<'info>,
        authority: AccountInfo<'info>,
        authority_bump: u8,
    ) -> Self {
        Self {
            token_program,
            authority,
            authority_bump,
            mints: Vec::new(),
            vaults: Vec::new(),
            wallets: Vec::new(),
        }
    }

    pub fn with_mint(mut self, mint: &Account<'info, Mint>) -> Self {
        self.mints.push(MintHandle {
            key: mint.key(),
            info: mint.to_account_info(),
            supply: mint.supply,
        });
        self
    }

    pub fn with_vault(mut self, vault: &Account<'info, TokenAccount>) -> Self {
        self.vaults.push(VaultHandle {
            mint: vault.mint,
            info: vault.to_account_info(),
            balance: vault.amount,
        });
        self
    }

    pub fn with_wallet(
        mut self,
        account: &Account<'info, TokenAccount>,
        signer: Option<AccountInfo<'info>>,
    ) -> Self {
        self.wallets.push(WalletHandle {
            mint: account.mint,
            owner: account.owner,
            info: account.to_account_info(),
            signer,
        });
        self
    }

    fn mint_handle(&self, asset: &Pubkey) -> Result<&MintHandle<'info>> {
        self.mints
            .iter()
            .find(|mint| mint.key == *asset)
            .ok_or_else(|| error!(LedgerError::CustodyAccountMissing))
    }

    fn vault(&self, asset: &Pubkey) -> Result<&VaultHandle<'info>> {
        self.vaults
            .iter()
            .find(|vault| vault.mint == *asset)
            .ok_or_else(|| error!(LedgerError::CustodyAccountMissing))
    }

    fn wallet(&self, asset: &Pubkey, owner: &Pubkey) -> Result<&WalletHandle<'info>> {
        self.wallets
            .iter()
            .find(|wallet| wallet.mint == *asset && wallet.owner == *owner)
            .ok_or_else(|| error!(LedgerError::CustodyAccountMissing))
    }

    fn signing_wallet(
        &self,
        asset: &Pubkey,
        owner: &Pubkey,
    ) -> Result<(AccountInfo<'info>, AccountInfo<'info>)> {
        let wallet = self.wallet(asset, owner)?;
        let signer = wallet
            .signer
            .clone()
            .ok_or(LedgerError::CustodyAccountMissing)?;
        Ok((wallet.info.clone(), signer))
    }
}

impl<'info> AssetCustody for TokenCustody<'info> {
    fn transfer_in(&mut self, asset: &Pubkey, from: &Pubkey, amount: u64) -> Result<()> {
        let (source, owner) = self.signing_wallet(asset, from)?;
        let cpi_accounts = Transfer {
            from: source,
            to: self.vault(asset)?.info.clone(),
            authority: owner,
        };
        let cpi_ctx = CpiContext::new(self.token_program.clone(), cpi_accounts);
        token::transfer(cpi_ctx, amount)
    }

    fn transfer_out(&mut self, asset: &Pubkey, to: &Pubkey, amount: u64) -> Result<()> {
        let bump = [self.authority_bump];
        let seeds: &[&[u8]] = &[AUTHORITY_SEED, &bump];
        let signer = &[seeds];

        let cpi_accounts = Transfer {
            from: self.vault(asset)?.info.clone(),
            to: self.wallet(asset, to)?.info.clone(),
            authority: self.authority.clone(),
        };
        let cpi_ctx = CpiContext::new_with_signer(self.token_program.clone(), cpi_accounts, signer);
        token::transfer(cpi_ctx, amount)
    }

    fn mint(&mut self, asset: &Pubkey, to: &Pubkey, amount: u64) -> Result<()> {
        let bump = [self.authority_bump];
        let seeds: &[&[u8]] = &[AUTHORITY_SEED, &bump];
        let signer = &[seeds];

        let cpi_accounts = MintTo {
            mint: self.mint_handle(asset)?.info.clone(),
            to: self.wallet(asset, to)?.info.clone(),
            authority: self.authority.clone(),
        };
        let cpi_ctx = CpiContext::new_with_signer(self.token_program.clone(), cpi_accounts, signer);
        token::mint_to(cpi_ctx, amount)
    }

    fn burn(&mut self, asset: &Pubkey, from: &Pubkey, amount: u64) -> Result<()> {
        let (source, owner) = self.signing_wallet(asset, from)?;
        let cpi_accounts = Burn {
            mint: self.mint_handle(asset)?.info.clone(),
            from: source,
            authority: owner,
        };
        let cpi_ctx = CpiContext::new(self.token_program.clone(), cpi_accounts);
        token::burn(cpi_ctx, amount)
    }

    fn minted_supply(&self, asset: &Pubkey) -> Result<u64> {
        Ok(self.mint_handle(asset)?.supply)
    }

    fn custody_balance(&self, asset: &Pubkey) -> Result<u64> {
        Ok(self.vault(asset)?.balance)
    }
}

/// One position account and its owner's index, as loaded for an instruction.
pub struct AccountStore<'a> {
    position: &'a mut Position,
    user_positions: &'a mut UserPositions,
    position_bump: u8,
    index_bump: u8,
    closed: bool,
}

impl<'a> AccountStore<'a> {
    pub fn new(
        position: &'a mut Position,
        position_bump: u8,
        user_positions: &'a mut UserPositions,
        index_bump: u8,
    ) -> Self {
        Self {
            position,
            user_positions,
            position_bump,
            index_bump,
            closed: false,
        }
    }

    /// True once the engine deleted the position; the caller closes the account.
    pub fn closed(&self) -> bool {
        self.closed
    }
}

impl PositionStore for AccountStore<'_> {
    fn position(&self, key: &PositionKey) -> Option<Position> {
        let live = !self.closed && self.position.borrower != Pubkey::default();
        (live && self.position.position_key() == *key).then(|| self.position.clone())
    }

    fn put_position(&mut self, position: Position) -> Result<()> {
        *self.position = Position {
            bump: self.position_bump,
            ..position
        };
        self.closed = false;
        Ok(())
    }

    fn remove_position(&mut self, key: &PositionKey) -> Result<()> {
        require_keys_eq!(self.position.borrower, key.borrower, LedgerError::PositionNotFound);
        *self.position = Position::default();
        self.closed = true;
        Ok(())
    }

    fn index(&self, _borrower: &Pubkey) -> PositionIndex {
        PositionIndex::from_entries(self.user_positions.entries.clone())
    }

    fn put_index(&mut self, borrower: &Pubkey, index: PositionIndex) -> Result<()> {
        self.user_positions.borrower = *borrower;
        self.user_positions.entries = index.into_entries();
        self.user_positions.bump = self.index_bump;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_price_scales_to_six_decimals() {
        // 150.12345678 at expo -8
        assert_eq!(normalize_price(15_012_345_678, -8).unwrap(), 150_123_456);
        // 1.00 at expo -2
        assert_eq!(normalize_price(100, -2).unwrap(), 1_000_000);
        assert_eq!(normalize_price(3, 0).unwrap(), 3_000_000);
    }

    #[test]
    fn normalize_price_rejects_bad_input() {
        assert!(normalize_price(0, -8).is_err());
        assert!(normalize_price(-5, -8).is_err());
        // below one micro-unit
        assert!(normalize_price(9, -8).is_err());
        assert!(normalize_price(1, 19).is_err());
    }

    #[test]
    fn account_store_treats_zeroed_position_as_absent() {
        let mut position = Position::default();
        let mut user_positions = UserPositions::default();
        let key = PositionKey::new(
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        );
        let mut store = AccountStore::new(&mut position, 254, &mut user_positions, 253);

        assert!(store.position(&key).is_none());

        store
            .put_position(Position {
                borrower: key.borrower,
                collateral_mint: key.collateral_mint,
                synthetic_mint: key.synthetic_mint,
                collateral_supplied: 10,
                ..Position::default()
            })
            .unwrap();
        let loaded = store.position(&key).unwrap();
        assert_eq!(loaded.bump, 254);
        assert_eq!(loaded.collateral_supplied, 10);

        let mut index = store.index(&key.borrower);
        index.insert(key.pair()).unwrap();
        store.put_index(&key.borrower, index).unwrap();

        store.remove_position(&key).unwrap();
        assert!(store.closed());
        assert!(store.position(&key).is_none());
        assert_eq!(user_positions.entries, vec![key.pair()]);
        assert_eq!(user_positions.bump, 253);
    }
}
