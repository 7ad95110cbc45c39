//! DCA Manager Pallet
//!
//! Recurring-investment (dollar-cost averaging) engine: accounts register a
//! plan describing a periodic stable-asset purchase of a target asset, and any
//! caller may trigger execution of due plans.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod types;
pub use types::{AssetKind, *};

#[cfg(test)]
pub mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub mod weights;
pub use weights::WeightInfo;

/// Helper for benchmarking: seeds the trading environment (assets, pool
/// liquidity, oracle quote, clock) that the collaborators need
#[cfg(feature = "runtime-benchmarks")]
pub trait BenchmarkHelper<AccountId> {
  fn setup_trade_env() -> frame::deps::sp_runtime::DispatchResult;
  fn fund_stable(who: &AccountId, amount: u128) -> frame::deps::sp_runtime::DispatchResult;
  fn set_time(now: u64);
}

#[cfg(feature = "runtime-benchmarks")]
impl<AccountId> BenchmarkHelper<AccountId> for () {
  fn setup_trade_env() -> frame::deps::sp_runtime::DispatchResult {
    Ok(())
  }
  fn fund_stable(_who: &AccountId, _amount: u128) -> frame::deps::sp_runtime::DispatchResult {
    Ok(())
  }
  fn set_time(_now: u64) {}
}

#[frame::pallet]
pub mod pallet {
  use super::WeightInfo;
  use crate::types::{
    AssetConversionApi, BoundedPrice, JitterDecision, Plan, PriceOracle, RandomnessSource,
    TriggerProposal,
  };
  use frame::deps::{
    frame_support::{
      PalletId,
      traits::{
        EnsureOrigin, Time,
        fungible::{Inspect as NativeInspect, Mutate as NativeMutate},
        fungibles::{Inspect as FungiblesInspect, Mutate as FungiblesMutate},
        tokens::Preservation,
      },
    },
    sp_runtime::{
      DispatchError, Permill,
      traits::{AccountIdConversion, Saturating as _},
    },
  };
  use frame::prelude::*;
  use primitives::{AssetKind, Balance, Moment};

  /// Context tag for randomness subjects, scoping seeds to trigger requests
  const SEED_CONTEXT: &[u8; 8] = b"dca/trig";

  #[pallet::config]
  pub trait Config: frame_system::Config {
    /// Asset management interface for fungible tokens
    type Assets: FungiblesInspect<Self::AccountId, AssetId = u32, Balance = Balance>
      + FungiblesMutate<Self::AccountId>;
    /// Native currency interface
    type Currency: NativeInspect<Self::AccountId, Balance = Balance>
      + NativeMutate<Self::AccountId>;
    /// AMM router the swap executor delegates to
    type AssetConversion: AssetConversionApi<Self::AccountId, Balance>;
    /// Price oracle supplying the quotes the price guard validates
    type PriceOracle: PriceOracle;
    /// Verifiable randomness provider feeding the execution-jitter gate
    type Randomness: RandomnessSource<Self::Hash>;
    /// Clock used for all plan scheduling decisions
    type TimeProvider: Time<Moment = Moment>;
    /// Origin allowed to maintain the reference price
    type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;
    /// Pallet ID for custody account derivation
    #[pallet::constant]
    type PalletId: Get<PalletId>;
    /// Stable asset plans are funded with
    #[pallet::constant]
    type StableAsset: Get<AssetKind>;
    /// Target asset plans purchase
    #[pallet::constant]
    type TargetAsset: Get<AssetKind>;
    /// Maximum age of an oracle quote before it is rejected
    #[pallet::constant]
    type QuoteStalenessBound: Get<Moment>;
    /// Maximum allowed deviation of a quote from the reference price
    #[pallet::constant]
    type MaxPriceDeviation: Get<Permill>;
    /// Haircut applied to a validated quote when deriving the swap floor
    #[pallet::constant]
    type SlippageTolerance: Get<Permill>;
    /// Width of the randomness-derived execution jitter window
    #[pallet::constant]
    type MaxExecutionJitter: Get<Moment>;
    /// Weight information for extrinsics
    type WeightInfo: WeightInfo;
    /// Helper for benchmarking
    #[cfg(feature = "runtime-benchmarks")]
    type BenchmarkHelper: crate::BenchmarkHelper<Self::AccountId>;
  }

  /// The pallet module, the place to define dispatchable calls, storage items, events, errors, etc.
  ///
  /// ## Trigger Gating
  /// A trigger attempt runs through a fixed gate sequence: ledger eligibility
  /// (budget, then time), price guard, randomness gate, swap, commit. The
  /// commit is the last step and the only plan mutation, so a failure at any
  /// gate leaves the ledger and custody untouched.
  ///
  /// ## Execution Jitter
  /// Plan schedules are public, so the exact instant a plan becomes eligible
  /// would otherwise be predictable and front-runnable. Each trigger request
  /// draws a request-bound random seed and must additionally wait out a
  /// seed-derived jitter before execution is admitted.
  ///
  /// ## Custody
  /// The full budget is pulled into the pallet-derived account at creation and
  /// only ever leaves through a committed swap (exactly one period's amount)
  /// or through the owner's withdrawal of the unspent remainder.
  #[pallet::pallet]
  pub struct Pallet<T>(PhantomData<T>);

  /// Plan records, at most one per account; never removed, a drained plan
  /// stays in its terminal exhausted state
  #[pallet::storage]
  #[pallet::getter(fn plans)]
  pub type Plans<T: Config> =
    StorageMap<_, Blake2_128Concat, T::AccountId, Plan<T::AccountId>, OptionQuery>;

  /// Reference price the guard checks quotes against (admin-maintained);
  /// unset disables the deviation check
  #[pallet::storage]
  #[pallet::getter(fn reference_price)]
  pub type ReferencePrice<T: Config> = StorageValue<_, Balance, OptionQuery>;

  /// Seeds consumed by committed triggers; a seed showing up twice is a replay
  #[pallet::storage]
  pub type ConsumedSeeds<T: Config> = StorageMap<_, Blake2_128Concat, T::Hash, (), OptionQuery>;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    /// A plan was registered and its budget taken into custody
    PlanCreated {
      owner: T::AccountId,
      frequency: Moment,
      amount: Balance,
      total: Balance,
    },
    /// One period of a plan executed and committed
    PlanTriggered {
      owner: T::AccountId,
      amount_in: Balance,
      amount_out: Balance,
      total_remaining: Balance,
    },
    /// The committed trigger drained the budget below one period's amount
    PlanExhausted { owner: T::AccountId },
    /// Unspent budget released back to the plan owner
    UnspentWithdrawn {
      owner: T::AccountId,
      amount: Balance,
      total_remaining: Balance,
    },
    /// Reference price maintained by the admin origin
    ReferencePriceUpdated {
      old_price: Option<Balance>,
      new_price: Balance,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// Creation parameters violate `frequency > 0`, `amount > 0`, `total >= amount`
    InvalidParameters,
    /// The account already has a plan (active or exhausted)
    PlanAlreadyExists,
    /// No plan registered for the account
    PlanNotFound,
    /// The plan's frequency has not elapsed since the last trigger
    NotDue,
    /// Remaining budget no longer covers one period; terminal
    Exhausted,
    /// Jitter window still open; retry later without consuming eligibility
    NotYetAdmitted,
    /// The randomness seed was already consumed by a committed trigger
    SeedReused,
    /// The randomness provider returned no seed
    RandomnessUnavailable,
    /// The oracle has no quote for the configured pair
    QuoteUnavailable,
    /// The quote is older than the staleness bound
    StaleQuote,
    /// The quote deviates from the reference price beyond the allowed band
    OutOfBand,
    /// The AMM rejected the swap; nothing moved
    SwapFailed,
    /// The plan changed between proposal and commit
    StaleProposal,
    /// Withdrawal exceeds the unspent budget
    InsufficientBalance,
    /// Arithmetic overflow in calculation
    ArithmeticOverflow,
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Register a recurring-purchase plan for the calling account.
    ///
    /// Pulls the full `total` of the stable asset into custody, then stores
    /// the record with `last_triggered_at = 0`. One plan per account; an
    /// exhausted plan still occupies the slot.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::create_plan())]
    pub fn create_plan(
      origin: OriginFor<T>,
      frequency: Moment,
      amount: Balance,
      total: Balance,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;

      ensure!(
        frequency > 0 && amount > 0 && total >= amount,
        Error::<T>::InvalidParameters
      );
      ensure!(!Plans::<T>::contains_key(&who), Error::<T>::PlanAlreadyExists);

      // Funds move before the record exists; the ledger assumes custody holds
      // the full budget from here on.
      Self::transfer_asset(
        T::StableAsset::get(),
        &who,
        &Self::account_id(),
        total,
        Preservation::Preserve,
      )?;

      let plan = Plan {
        owner: who.clone(),
        frequency,
        amount,
        total,
        last_triggered_at: 0,
      };
      Plans::<T>::insert(&who, &plan);

      Self::deposit_event(Event::PlanCreated {
        owner: who,
        frequency,
        amount,
        total,
      });

      Ok(())
    }

    /// Attempt to execute one period of `account`'s plan.
    ///
    /// Permissionless: any signed caller may trigger any plan. The attempt is
    /// all-or-nothing; every gate failure aborts the dispatch and rolls back.
    #[pallet::call_index(1)]
    #[pallet::weight(T::WeightInfo::trigger_plan())]
    pub fn trigger_plan(origin: OriginFor<T>, account: T::AccountId) -> DispatchResult {
      ensure_signed(origin)?;

      Self::do_trigger_plan(&account)?;

      Ok(())
    }

    /// Release up to the current unspent budget back to the plan owner.
    ///
    /// Debits `total` by the withdrawn amount; the plan may thereby become
    /// exhausted but is never removed.
    #[pallet::call_index(2)]
    #[pallet::weight(T::WeightInfo::withdraw_unspent())]
    pub fn withdraw_unspent(origin: OriginFor<T>, amount: Balance) -> DispatchResult {
      let who = ensure_signed(origin)?;

      ensure!(amount > 0, Error::<T>::InvalidParameters);

      Plans::<T>::try_mutate(&who, |maybe_plan| -> DispatchResult {
        let plan = maybe_plan.as_mut().ok_or(Error::<T>::PlanNotFound)?;
        ensure!(amount <= plan.total, Error::<T>::InsufficientBalance);

        Self::transfer_asset(
          T::StableAsset::get(),
          &Self::account_id(),
          &who,
          amount,
          Preservation::Expendable,
        )?;
        plan.total = plan.total.saturating_sub(amount);

        Self::deposit_event(Event::UnspentWithdrawn {
          owner: who.clone(),
          amount,
          total_remaining: plan.total,
        });

        Ok(())
      })
    }

    /// Maintain the reference price the guard checks quotes against
    #[pallet::call_index(3)]
    #[pallet::weight(T::WeightInfo::update_reference_price())]
    pub fn update_reference_price(origin: OriginFor<T>, new_price: Balance) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;

      ensure!(new_price > 0, Error::<T>::InvalidParameters);

      let old_price = ReferencePrice::<T>::get();
      ReferencePrice::<T>::put(new_price);

      Self::deposit_event(Event::ReferencePriceUpdated {
        old_price,
        new_price,
      });

      Ok(())
    }
  }

  impl<T: Config> Pallet<T> {
    /// Get the custody account ID (derived from PalletId)
    pub fn account_id() -> T::AccountId {
      T::PalletId::get().into_account_truncating()
    }

    /// Run one trigger attempt end to end.
    ///
    /// Sequence: read plan -> ledger eligibility -> price guard -> randomness
    /// gate -> swap -> commit -> events. No storage is written before the
    /// swap has succeeded and the commit is the only plan mutation, so a
    /// failed attempt has no effect and funds never leave custody early.
    pub fn do_trigger_plan(account: &T::AccountId) -> Result<Balance, DispatchError> {
      let now = T::TimeProvider::now();
      let plan = Plans::<T>::get(account).ok_or(Error::<T>::PlanNotFound)?;

      let proposal = Self::propose_trigger(&plan, now)?;
      let bounded = Self::validate_quote(now)?;
      let decision = Self::admit_execution(account, &plan, now)?;

      let min_out = bounded
        .min_out(plan.amount)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      let amount_out = Self::execute_swap(plan.amount, min_out, &plan.owner)?;

      // Nothing is written until the swap has succeeded: gate failures and
      // swap failures leave no trace and burn no seed.
      ConsumedSeeds::<T>::insert(&decision.seed, ());
      Self::commit_trigger(account, &proposal)?;

      Self::deposit_event(Event::PlanTriggered {
        owner: plan.owner.clone(),
        amount_in: plan.amount,
        amount_out,
        total_remaining: proposal.post_total,
      });
      if proposal.post_total < plan.amount {
        Self::deposit_event(Event::PlanExhausted { owner: plan.owner });
      }

      Ok(amount_out)
    }

    /// Ledger eligibility: compute the proposed debit/advance transition
    /// without committing it.
    ///
    /// The budget gate dominates the time gate so an exhausted plan reports
    /// `Exhausted` no matter how much time has elapsed.
    pub fn propose_trigger(
      plan: &Plan<T::AccountId>,
      now: Moment,
    ) -> Result<TriggerProposal<T::AccountId>, DispatchError> {
      ensure!(plan.is_active(), Error::<T>::Exhausted);
      ensure!(now >= plan.earliest_eligible_at(), Error::<T>::NotDue);

      Ok(TriggerProposal {
        owner: plan.owner.clone(),
        prior_total: plan.total,
        prior_last_triggered_at: plan.last_triggered_at,
        post_total: plan.total.saturating_sub(plan.amount),
        triggered_at: now,
      })
    }

    /// Write a proposed transition; the sole mutator of a plan record.
    ///
    /// The stored record must still match the state the proposal was computed
    /// against, otherwise another attempt committed in between and this
    /// proposal is stale. Committing the same proposal twice fails the same
    /// way, which rules out double debits.
    pub fn commit_trigger(
      account: &T::AccountId,
      proposal: &TriggerProposal<T::AccountId>,
    ) -> DispatchResult {
      Plans::<T>::try_mutate(account, |maybe_plan| -> DispatchResult {
        let plan = maybe_plan.as_mut().ok_or(Error::<T>::PlanNotFound)?;
        ensure!(
          plan.total == proposal.prior_total
            && plan.last_triggered_at == proposal.prior_last_triggered_at,
          Error::<T>::StaleProposal
        );

        plan.total = proposal.post_total;
        plan.last_triggered_at = proposal.triggered_at;

        Ok(())
      })
    }

    /// Price guard: validate the oracle quote and derive the swap floor.
    ///
    /// Pure validation, no mutation. A stale or out-of-band quote is never
    /// substituted with anything; the attempt just fails soft.
    pub fn validate_quote(now: Moment) -> Result<BoundedPrice, DispatchError> {
      let quote = T::PriceOracle::latest_quote(T::StableAsset::get(), T::TargetAsset::get())
        .ok_or(Error::<T>::QuoteUnavailable)?;

      ensure!(
        now.saturating_sub(quote.timestamp) <= T::QuoteStalenessBound::get(),
        Error::<T>::StaleQuote
      );

      if let Some(reference) = ReferencePrice::<T>::get() {
        let allowed = T::MaxPriceDeviation::get().mul_floor(reference);
        ensure!(
          quote.price.abs_diff(reference) <= allowed,
          Error::<T>::OutOfBand
        );
      }

      let floor_per_unit = Permill::from_percent(100)
        .saturating_sub(T::SlippageTolerance::get())
        .mul_floor(quote.price);

      Ok(BoundedPrice { floor_per_unit })
    }

    /// Randomness gate: request-bound seed, replay check, jitter admission.
    ///
    /// The subject ties the seed to this account and this attempt (the plan
    /// state advances on every commit), so seeds are neither predictable
    /// before the request nor reusable across requests.
    pub fn admit_execution(
      account: &T::AccountId,
      plan: &Plan<T::AccountId>,
      now: Moment,
    ) -> Result<JitterDecision<T::Hash>, DispatchError> {
      let subject = (SEED_CONTEXT, account, plan.last_triggered_at, plan.total).encode();
      let seed = T::Randomness::request_random(&subject)
        .map_err(|_| Error::<T>::RandomnessUnavailable)?;

      ensure!(
        !ConsumedSeeds::<T>::contains_key(&seed),
        Error::<T>::SeedReused
      );

      let jitter = Self::derive_jitter(&seed);
      let admissible_at = plan.earliest_eligible_at().saturating_add(jitter);
      ensure!(now >= admissible_at, Error::<T>::NotYetAdmitted);

      Ok(JitterDecision {
        seed,
        jitter,
        admissible_at,
      })
    }

    /// Jitter in `[0, MaxExecutionJitter]` from the low 64 bits of the seed
    fn derive_jitter(seed: &T::Hash) -> Moment {
      let window = T::MaxExecutionJitter::get();
      if window == 0 {
        return 0;
      }

      let bytes = seed.as_ref();
      let mut raw = [0u8; 8];
      if bytes.len() >= 8 {
        raw.copy_from_slice(&bytes[bytes.len() - 8..]);
      } else {
        raw[8 - bytes.len()..].copy_from_slice(bytes);
      }

      u64::from_be_bytes(raw) % window.saturating_add(1)
    }

    /// Swap executor: delegate one period's purchase to the AMM.
    ///
    /// The realized output is credited straight to the plan owner. Collaborator
    /// failure surfaces as `SwapFailed` with no partial effect; retry policy
    /// stays with the caller of `trigger_plan`.
    pub fn execute_swap(
      amount_in: Balance,
      min_out: Balance,
      recipient: &T::AccountId,
    ) -> Result<Balance, DispatchError> {
      let custody = Self::account_id();

      T::AssetConversion::swap_exact_in(
        &custody,
        T::StableAsset::get(),
        T::TargetAsset::get(),
        amount_in,
        min_out,
        recipient,
      )
      .map_err(|_| Error::<T>::SwapFailed.into())
    }

    /// Move `amount` of `asset` between accounts, dispatching on asset kind
    fn transfer_asset(
      asset: AssetKind,
      from: &T::AccountId,
      to: &T::AccountId,
      amount: Balance,
      preservation: Preservation,
    ) -> DispatchResult {
      match asset {
        AssetKind::Native => {
          <T::Currency as NativeMutate<T::AccountId>>::transfer(from, to, amount, preservation)?;
        }
        AssetKind::Local(id) | AssetKind::Foreign(id) => {
          T::Assets::transfer(id, from, to, amount, preservation)?;
        }
      }

      Ok(())
    }
  }

  /// Genesis configuration: the custody account starts with a provider
  /// reference so it needs no existential deposit
  #[pallet::genesis_config]
  #[derive(frame::prelude::DefaultNoBound)]
  pub struct GenesisConfig<T: Config> {
    #[serde(skip)]
    pub _marker: core::marker::PhantomData<T>,
  }

  #[pallet::genesis_build]
  impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
    fn build(&self) {
      // Custody account survives zero native balance via provider reference
      frame_system::Pallet::<T>::inc_providers(&Pallet::<T>::account_id());
    }
  }
}
