extern crate alloc;

use crate as pallet_dca_manager;
use crate::types::{AssetConversionApi, PriceQuote};
use polkadot_sdk::frame_support::traits::fungibles::Mutate;
use polkadot_sdk::frame_support::traits::tokens::{Fortitude, Precision, Preservation};
use polkadot_sdk::frame_support::{
  PalletId, construct_runtime, derive_impl,
  traits::{ConstU32, ConstU64, ConstU128, Get},
};
use polkadot_sdk::frame_system;
use polkadot_sdk::sp_runtime::{
  BuildStorage, DispatchError, Permill,
  testing::H256,
  traits::{BlakeTwo256, IdentityLookup},
};
use primitives::{AssetKind, params, pallet_ids, well_known};
use std::cell::RefCell;

/// Funding stablecoin and purchase target the mock runtime is wired for
pub const STABLE_ID: u32 = well_known::USDT;
pub const TARGET_ID: u32 = well_known::ETH;

thread_local! {
    pub static POOL: RefCell<Option<(u128, u128)>> = const { RefCell::new(None) };
    pub static QUOTE: RefCell<Option<PriceQuote>> = const { RefCell::new(None) };
    pub static SEED_OVERRIDE: RefCell<Option<H256>> = const { RefCell::new(None) };
    pub static RANDOMNESS_DOWN: RefCell<bool> = const { RefCell::new(false) };
    pub static SWAP_FORCE_FAIL: RefCell<bool> = const { RefCell::new(false) };
}

/// Seed the stable/target pool with the given reserves
pub fn set_pool(reserve_stable: u128, reserve_target: u128) {
  POOL.with(|p| *p.borrow_mut() = Some((reserve_stable, reserve_target)));
}

pub fn pool_reserves() -> Option<(u128, u128)> {
  POOL.with(|p| *p.borrow())
}

/// Publish an oracle observation for the stable/target pair
pub fn set_quote(price: u128, timestamp: u64) {
  QUOTE.with(|q| {
    *q.borrow_mut() = Some(PriceQuote {
      price,
      timestamp,
      source: 1,
    })
  });
}

pub fn clear_quote() {
  QUOTE.with(|q| *q.borrow_mut() = None);
}

/// Pin the next seeds to a fixed value; `None` restores subject-derived seeds
pub fn set_seed_override(seed: Option<H256>) {
  SEED_OVERRIDE.with(|s| *s.borrow_mut() = seed);
}

/// A seed whose derived jitter is exactly `jitter` (must fit the window)
pub fn seed_with_jitter(jitter: u64) -> H256 {
  H256::from_low_u64_be(jitter)
}

pub fn set_randomness_down(down: bool) {
  RANDOMNESS_DOWN.with(|d| *d.borrow_mut() = down);
}

pub fn force_swap_failure(fail: bool) {
  SWAP_FORCE_FAIL.with(|f| *f.borrow_mut() = fail);
}

type Block = frame_system::mocking::MockBlock<Test>;

construct_runtime!(
  pub struct Test {
    System: frame_system,
    Balances: polkadot_sdk::pallet_balances,
    Assets: polkadot_sdk::pallet_assets,
    Timestamp: polkadot_sdk::pallet_timestamp,
    DcaManager: pallet_dca_manager,
  }
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
  type Block = Block;
  type AccountId = u64;
  type Lookup = IdentityLookup<Self::AccountId>;
  type Hash = H256;
  type Hashing = BlakeTwo256;
  type AccountData = polkadot_sdk::pallet_balances::AccountData<u128>;
}

impl polkadot_sdk::pallet_balances::Config for Test {
  type MaxLocks = ();
  type MaxReserves = ();
  type ReserveIdentifier = [u8; 8];
  type Balance = u128;
  type DustRemoval = ();
  type RuntimeEvent = RuntimeEvent;
  type ExistentialDeposit = ConstU128<1>;
  type AccountStore = System;
  type WeightInfo = ();
  type FreezeIdentifier = ();
  type MaxFreezes = ();
  type RuntimeHoldReason = ();
  type RuntimeFreezeReason = ();
  type DoneSlashHandler = ();
}

impl polkadot_sdk::pallet_assets::Config for Test {
  type RuntimeEvent = RuntimeEvent;
  type Balance = u128;
  type AssetId = u32;
  type AssetIdParameter = u32;
  type Currency = Balances;
  type CreateOrigin = polkadot_sdk::frame_support::traits::AsEnsureOriginWithArg<
    frame_system::EnsureSigned<Self::AccountId>,
  >;
  type ForceOrigin = frame_system::EnsureRoot<Self::AccountId>;
  type AssetDeposit = ConstU128<1>;
  type AssetAccountDeposit = ConstU128<1>;
  type MetadataDepositBase = ConstU128<1>;
  type MetadataDepositPerByte = ConstU128<1>;
  type ApprovalDeposit = ConstU128<1>;
  type StringLimit = ConstU32<50>;
  type Freezer = ();
  type Extra = ();
  type CallbackHandle = ();
  type WeightInfo = ();
  type RemoveItemsLimit = ConstU32<5>;
  type Holder = ();
  type ReserveData = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = ();
}

impl polkadot_sdk::pallet_timestamp::Config for Test {
  type Moment = u64;
  type OnTimestampSet = ();
  type MinimumPeriod = ConstU64<1>;
  type WeightInfo = ();
}

pub struct MockPriceOracle;
impl pallet_dca_manager::PriceOracle for MockPriceOracle {
  fn latest_quote(_asset_in: AssetKind, _asset_out: AssetKind) -> Option<PriceQuote> {
    QUOTE.with(|q| *q.borrow())
  }
}

pub struct MockRandomness;
impl pallet_dca_manager::RandomnessSource<H256> for MockRandomness {
  fn request_random(subject: &[u8]) -> Result<H256, DispatchError> {
    if RANDOMNESS_DOWN.with(|d| *d.borrow()) {
      return Err(DispatchError::Other("randomness offline"));
    }
    if let Some(seed) = SEED_OVERRIDE.with(|s| *s.borrow()) {
      return Ok(seed);
    }
    Ok(H256(polkadot_sdk::sp_io::hashing::blake2_256(subject)))
  }
}

pub struct MockAssetConversion;
impl AssetConversionApi<u64, u128> for MockAssetConversion {
  fn swap_exact_in(
    who: &u64,
    asset_in: AssetKind,
    asset_out: AssetKind,
    amount_in: u128,
    min_amount_out: u128,
    recipient: &u64,
  ) -> Result<u128, DispatchError> {
    if SWAP_FORCE_FAIL.with(|f| *f.borrow()) {
      return Err(DispatchError::Other("AMM offline"));
    }

    let (mut reserve_in, mut reserve_out) = POOL
      .with(|p| *p.borrow())
      .ok_or(DispatchError::Other("Pool not found"))?;

    // POOL is stored as (stable, target); flip for target -> stable swaps
    if asset_in != StableAssetStub::get() {
      core::mem::swap(&mut reserve_in, &mut reserve_out);
    }

    // XYK: amount_out = (amount_in * reserve_out) / (reserve_in + amount_in)
    let amount_out = amount_in
      .checked_mul(reserve_out)
      .and_then(|v| v.checked_div(reserve_in.saturating_add(amount_in)))
      .ok_or(DispatchError::Arithmetic(
        polkadot_sdk::sp_runtime::ArithmeticError::Overflow,
      ))?;

    if amount_out < min_amount_out {
      return Err(DispatchError::Other("Slippage limit exceeded"));
    }

    // Burn input tokens from who
    match asset_in {
      AssetKind::Native => {
        return Err(DispatchError::Other("Native side not wired in mock"));
      }
      AssetKind::Local(id) | AssetKind::Foreign(id) => {
        <Assets as Mutate<u64>>::burn_from(
          id,
          who,
          amount_in,
          Preservation::Expendable,
          Precision::Exact,
          Fortitude::Polite,
        )?;
      }
    }

    // Mint output tokens to recipient
    match asset_out {
      AssetKind::Native => {
        return Err(DispatchError::Other("Native side not wired in mock"));
      }
      AssetKind::Local(id) | AssetKind::Foreign(id) => {
        <Assets as Mutate<u64>>::mint_into(id, recipient, amount_out)?;
      }
    }

    // Update reserves, restoring the (stable, target) orientation
    let new_reserve_in = reserve_in.saturating_add(amount_in);
    let new_reserve_out = reserve_out.saturating_sub(amount_out);

    let oriented = if asset_in == StableAssetStub::get() {
      (new_reserve_in, new_reserve_out)
    } else {
      (new_reserve_out, new_reserve_in)
    };
    POOL.with(|p| *p.borrow_mut() = Some(oriented));

    Ok(amount_out)
  }
}

pub struct PalletIdStub;
impl Get<PalletId> for PalletIdStub {
  fn get() -> PalletId {
    PalletId(*pallet_ids::DCA_MANAGER_PALLET_ID)
  }
}

pub struct StableAssetStub;
impl Get<AssetKind> for StableAssetStub {
  fn get() -> AssetKind {
    AssetKind::Local(STABLE_ID)
  }
}

pub struct TargetAssetStub;
impl Get<AssetKind> for TargetAssetStub {
  fn get() -> AssetKind {
    AssetKind::Local(TARGET_ID)
  }
}

pub struct MaxPriceDeviationStub;
impl Get<Permill> for MaxPriceDeviationStub {
  fn get() -> Permill {
    params::MAX_PRICE_DEVIATION
  }
}

pub struct SlippageToleranceStub;
impl Get<Permill> for SlippageToleranceStub {
  fn get() -> Permill {
    params::SLIPPAGE_TOLERANCE
  }
}

impl pallet_dca_manager::Config for Test {
  type Assets = Assets;
  type Currency = Balances;
  type AssetConversion = MockAssetConversion;
  type PriceOracle = MockPriceOracle;
  type Randomness = MockRandomness;
  type TimeProvider = Timestamp;
  type AdminOrigin = frame_system::EnsureRoot<Self::AccountId>;
  type PalletId = PalletIdStub;
  type StableAsset = StableAssetStub;
  type TargetAsset = TargetAssetStub;
  type QuoteStalenessBound = ConstU64<{ params::QUOTE_STALENESS_BOUND }>;
  type MaxPriceDeviation = MaxPriceDeviationStub;
  type SlippageTolerance = SlippageToleranceStub;
  type MaxExecutionJitter = ConstU64<{ params::MAX_EXECUTION_JITTER }>;
  type WeightInfo = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = TestBenchmarkHelper;
}

#[cfg(feature = "runtime-benchmarks")]
pub struct TestBenchmarkHelper;

#[cfg(feature = "runtime-benchmarks")]
impl crate::BenchmarkHelper<u64> for TestBenchmarkHelper {
  fn setup_trade_env() -> polkadot_sdk::sp_runtime::DispatchResult {
    let now = Timestamp::get();
    set_pool(1_000_000 * params::PRECISION, 1_000_000 * params::PRECISION);
    set_quote(params::PRECISION, now);
    Ok(())
  }

  fn fund_stable(who: &u64, amount: u128) -> polkadot_sdk::sp_runtime::DispatchResult {
    <Assets as Mutate<u64>>::mint_into(STABLE_ID, who, amount)?;
    Ok(())
  }

  fn set_time(now: u64) {
    Timestamp::set_timestamp(now);
  }
}

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  let mut t = frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();

  polkadot_sdk::pallet_assets::GenesisConfig::<Test> {
    assets: alloc::vec![(STABLE_ID, 1, true, 1), (TARGET_ID, 1, true, 1)],
    metadata: alloc::vec![],
    accounts: alloc::vec![],
    reserves: alloc::vec![],
    next_asset_id: None,
  }
  .assimilate_storage(&mut t)
  .unwrap();

  // Custody account gets its provider ref (ED-free)
  pallet_dca_manager::GenesisConfig::<Test>::default()
    .assimilate_storage(&mut t)
    .unwrap();

  POOL.with(|p| *p.borrow_mut() = None);
  QUOTE.with(|q| *q.borrow_mut() = None);
  SEED_OVERRIDE.with(|s| *s.borrow_mut() = None);
  RANDOMNESS_DOWN.with(|d| *d.borrow_mut() = false);
  SWAP_FORCE_FAIL.with(|f| *f.borrow_mut() = false);

  t.into()
}
