//! In-memory collaborators and a small world fixture for engine tests.

use std::collections::BTreeMap;

use anchor_lang::prelude::*;

use crate::engine::collaborators::{
    AssetCustody, AssetState, PairConfigStore, PairTerms, PositionStore, PriceOracle,
};
use crate::engine::index::PositionIndex;
use crate::engine::ledger::PositionLedger;
use crate::state::{LedgerError, Position, PositionKey};

pub const PRICE_UNIT: u64 = 1_000_000;
pub const SYN_UNIT: u64 = 1_000_000;
pub const COL_UNIT: u64 = 1_000_000_000;
pub const INITIAL_COLLATERAL: u64 = 10 * COL_UNIT;

pub const RATE_BPS: u64 = 500;
pub const LTV_BPS: u64 = 8_000;
pub const PENALTY_BPS: u64 = 1_000;

pub type TestLedger<'a> =
    PositionLedger<'a, MemoryStore, StaticRegistry, StaticOracle, MemoryCustody>;

pub fn assert_ledger_error<T: std::fmt::Debug>(result: Result<T>, expected: LedgerError) {
    match result {
        Err(Error::AnchorError(e)) => assert_eq!(
            e.error_code_number,
            u32::from(expected),
            "expected {:?}, got {}",
            expected,
            e.error_name
        ),
        other => panic!("expected {:?}, got {:?}", expected, other),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStore {
    pub positions: BTreeMap<PositionKey, Position>,
    pub indexes: BTreeMap<Pubkey, PositionIndex>,
}

impl PositionStore for MemoryStore {
    fn position(&self, key: &PositionKey) -> Option<Position> {
        self.positions.get(key).cloned()
    }

    fn put_position(&mut self, position: Position) -> Result<()> {
        self.positions.insert(position.position_key(), position);
        Ok(())
    }

    fn remove_position(&mut self, key: &PositionKey) -> Result<()> {
        self.positions.remove(key);
        Ok(())
    }

    fn index(&self, borrower: &Pubkey) -> PositionIndex {
        self.indexes.get(borrower).cloned().unwrap_or_default()
    }

    fn put_index(&mut self, borrower: &Pubkey, index: PositionIndex) -> Result<()> {
        self.indexes.insert(*borrower, index);
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct StaticRegistry {
    pub synthetics: BTreeMap<Pubkey, AssetState>,
    pub collaterals: BTreeMap<Pubkey, AssetState>,
    pub pairs: BTreeMap<(Pubkey, Pubkey), PairTerms>,
    pub decimals: BTreeMap<Pubkey, u8>,
    pub treasury: Pubkey,
}

impl StaticRegistry {
    pub fn set_rate(&mut self, collateral: &Pubkey, synthetic: &Pubkey, rate_bps: u64) {
        if let Some(terms) = self.pairs.get_mut(&(*collateral, *synthetic)) {
            terms.interest_rate_bps = rate_bps;
        }
    }
}

impl PairConfigStore for StaticRegistry {
    fn pair_terms(&self, collateral: &Pubkey, synthetic: &Pubkey) -> Option<PairTerms> {
        self.pairs.get(&(*collateral, *synthetic)).copied()
    }

    fn synthetic_asset(&self, asset: &Pubkey) -> Option<AssetState> {
        self.synthetics.get(asset).copied()
    }

    fn collateral_asset(&self, asset: &Pubkey) -> Option<AssetState> {
        self.collaterals.get(asset).copied()
    }

    fn decimals(&self, asset: &Pubkey) -> Result<u8> {
        self.decimals
            .get(asset)
            .copied()
            .ok_or_else(|| error!(LedgerError::AssetNotRecognized))
    }

    fn treasury(&self) -> Result<Pubkey> {
        Ok(self.treasury)
    }
}

#[derive(Clone, Debug, Default)]
pub struct StaticOracle {
    pub prices: BTreeMap<Pubkey, u64>,
}

impl StaticOracle {
    pub fn set(&mut self, asset: Pubkey, price: u64) {
        self.prices.insert(asset, price);
    }
}

impl PriceOracle for StaticOracle {
    fn price(&self, asset: &Pubkey) -> Result<u64> {
        self.prices
            .get(asset)
            .copied()
            .ok_or_else(|| error!(LedgerError::InvalidOraclePrice))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryCustody {
    wallets: BTreeMap<(Pubkey, Pubkey), u64>,
    supplies: BTreeMap<Pubkey, u64>,
    vaults: BTreeMap<Pubkey, u64>,
}

fn debit(balance: &mut u64, amount: u64) -> Result<()> {
    *balance = balance
        .checked_sub(amount)
        .ok_or(LedgerError::InsufficientFunds)?;
    Ok(())
}

impl MemoryCustody {
    pub fn wallet(&self, asset: &Pubkey, owner: &Pubkey) -> u64 {
        self.wallets.get(&(*asset, *owner)).copied().unwrap_or(0)
    }

    pub fn set_wallet(&mut self, asset: &Pubkey, owner: &Pubkey, amount: u64) {
        self.wallets.insert((*asset, *owner), amount);
    }

    pub fn supply(&self, asset: &Pubkey) -> u64 {
        self.supplies.get(asset).copied().unwrap_or(0)
    }

    pub fn vault(&self, asset: &Pubkey) -> u64 {
        self.vaults.get(asset).copied().unwrap_or(0)
    }
}

impl AssetCustody for MemoryCustody {
    fn transfer_in(&mut self, asset: &Pubkey, from: &Pubkey, amount: u64) -> Result<()> {
        debit(self.wallets.entry((*asset, *from)).or_default(), amount)?;
        *self.vaults.entry(*asset).or_default() += amount;
        Ok(())
    }

    fn transfer_out(&mut self, asset: &Pubkey, to: &Pubkey, amount: u64) -> Result<()> {
        debit(self.vaults.entry(*asset).or_default(), amount)?;
        *self.wallets.entry((*asset, *to)).or_default() += amount;
        Ok(())
    }

    fn mint(&mut self, asset: &Pubkey, to: &Pubkey, amount: u64) -> Result<()> {
        *self.wallets.entry((*asset, *to)).or_default() += amount;
        *self.supplies.entry(*asset).or_default() += amount;
        Ok(())
    }

    fn burn(&mut self, asset: &Pubkey, from: &Pubkey, amount: u64) -> Result<()> {
        debit(self.wallets.entry((*asset, *from)).or_default(), amount)?;
        let supply = self.supplies.entry(*asset).or_default();
        *supply = supply.saturating_sub(amount);
        Ok(())
    }

    fn minted_supply(&self, asset: &Pubkey) -> Result<u64> {
        Ok(self.supply(asset))
    }

    fn custody_balance(&self, asset: &Pubkey) -> Result<u64> {
        Ok(self.vault(asset))
    }
}

/// One synthetic (6 dp, $1) and one collateral (9 dp, $2000) with a 5% / 80% / 10%
/// pair, two funded borrowers and a treasury.
#[derive(Clone, Debug)]
pub struct World {
    pub store: MemoryStore,
    pub registry: StaticRegistry,
    pub oracle: StaticOracle,
    pub custody: MemoryCustody,
    pub now: i64,
    pub synthetic: Pubkey,
    pub collateral: Pubkey,
    pub alice: Pubkey,
    pub bob: Pubkey,
    pub treasury: Pubkey,
}

impl World {
    pub fn new() -> Self {
        let synthetic = Pubkey::new_unique();
        let treasury = Pubkey::new_unique();
        let mut w = Self {
            store: MemoryStore::default(),
            registry: StaticRegistry {
                treasury,
                ..StaticRegistry::default()
            },
            oracle: StaticOracle::default(),
            custody: MemoryCustody::default(),
            now: 1_700_000_000,
            synthetic,
            collateral: Pubkey::default(),
            alice: Pubkey::new_unique(),
            bob: Pubkey::new_unique(),
            treasury,
        };

        w.registry.synthetics.insert(
            synthetic,
            AssetState {
                whitelisted: true,
                cap: u64::MAX,
                paused: false,
            },
        );
        w.registry.decimals.insert(synthetic, 6);
        w.oracle.set(synthetic, PRICE_UNIT);
        w.collateral = w.add_collateral(9, 2_000 * PRICE_UNIT);
        w
    }

    /// Register another collateral paired with the synthetic and fund both borrowers.
    pub fn add_collateral(&mut self, decimals: u8, price: u64) -> Pubkey {
        let mint = Pubkey::new_unique();
        self.registry.collaterals.insert(
            mint,
            AssetState {
                whitelisted: true,
                cap: u64::MAX,
                paused: false,
            },
        );
        self.registry.pairs.insert(
            (mint, self.synthetic),
            PairTerms {
                interest_rate_bps: RATE_BPS,
                ltv_bps: LTV_BPS,
                liquidation_penalty_bps: PENALTY_BPS,
            },
        );
        self.registry.decimals.insert(mint, decimals);
        self.oracle.set(mint, price);
        self.custody.set_wallet(&mint, &self.alice, INITIAL_COLLATERAL);
        self.custody.set_wallet(&mint, &self.bob, INITIAL_COLLATERAL);
        mint
    }

    /// Run `op` as one unit of work; ledger and custody are restored if it fails.
    pub fn transact<T>(&mut self, op: impl FnOnce(&mut TestLedger<'_>) -> Result<T>) -> Result<T> {
        let store = self.store.clone();
        let custody = self.custody.clone();

        let mut ledger = PositionLedger::new(
            &mut self.store,
            &self.registry,
            &self.oracle,
            &mut self.custody,
            self.now,
        );
        let result = op(&mut ledger);

        if result.is_err() {
            self.store = store;
            self.custody = custody;
        }
        result
    }

    pub fn same_state_as(&self, other: &World) -> bool {
        self.store == other.store && self.custody == other.custody
    }

    pub fn wallet(&self, asset: &Pubkey, owner: &Pubkey) -> u64 {
        self.custody.wallet(asset, owner)
    }

    /// Position on the default pair.
    pub fn position(&self, borrower: &Pubkey) -> Option<Position> {
        self.store.position(&PositionKey::new(
            *borrower,
            self.collateral,
            self.synthetic,
        ))
    }

    pub fn is_indexed(&self, borrower: &Pubkey, collateral: &Pubkey, synthetic: &Pubkey) -> bool {
        self.store
            .index(borrower)
            .contains(&PositionKey::new(*borrower, *collateral, *synthetic).pair())
    }

    pub fn index_len(&self, borrower: &Pubkey) -> usize {
        self.store.index(borrower).len()
    }
}
