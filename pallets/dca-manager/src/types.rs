use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use polkadot_sdk::frame_support::pallet_prelude::*;
use polkadot_sdk::sp_core::U256;

// Re-export AssetKind from primitives as the single source of truth
pub use primitives::AssetKind;
use primitives::{Balance, Moment, params::PRECISION};

/// A recurring-purchase schedule and its remaining budget, owned by one account.
///
/// Active/Exhausted is derived from `total` and `amount`, never stored.
#[derive(
  Clone, Debug, Decode, DecodeWithMemTracking, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo,
)]
pub struct Plan<AccountId> {
  /// Account the plan belongs to; set at creation, immutable.
  pub owner: AccountId,
  /// Minimum duration between consecutive triggers, in milliseconds.
  pub frequency: Moment,
  /// Stable amount debited from `total` on each successful trigger.
  pub amount: Balance,
  /// Remaining stable budget held in custody.
  pub total: Balance,
  /// Timestamp of the most recent successful trigger; 0 until the first one.
  pub last_triggered_at: Moment,
}

impl<AccountId> Plan<AccountId> {
  /// The remaining budget still covers at least one period.
  pub fn is_active(&self) -> bool {
    self.total >= self.amount
  }

  /// Terminal state: no further trigger can ever succeed.
  pub fn is_exhausted(&self) -> bool {
    !self.is_active()
  }

  /// Earliest instant at which the next trigger may pass the time gate.
  /// A plan that has never triggered is eligible immediately.
  pub fn earliest_eligible_at(&self) -> Moment {
    if self.last_triggered_at == 0 {
      0
    } else {
      self.last_triggered_at.saturating_add(self.frequency)
    }
  }
}

/// Proposed ledger transition for one trigger attempt.
///
/// Produced by `propose_trigger` and written by `commit_trigger`. The `prior_*`
/// fields pin the plan state the proposal was computed against; a commit that
/// finds anything else in storage is stale and must be rejected.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TriggerProposal<AccountId> {
  pub owner: AccountId,
  pub prior_total: Balance,
  pub prior_last_triggered_at: Moment,
  pub post_total: Balance,
  pub triggered_at: Moment,
}

/// An oracle price observation: target units per `PRECISION` stable units,
/// stamped with the observation time and the reporting source.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PriceQuote {
  pub price: Balance,
  pub timestamp: Moment,
  pub source: u32,
}

/// A validated quote reduced to the per-unit minimum-output floor the swap
/// executor must enforce.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BoundedPrice {
  /// Slippage-adjusted floor, target units per `PRECISION` stable units.
  pub floor_per_unit: Balance,
}

impl BoundedPrice {
  /// Minimum acceptable swap output for `amount_in` stable units.
  ///
  /// `None` on arithmetic overflow.
  pub fn min_out(&self, amount_in: Balance) -> Option<Balance> {
    let scaled = U256::from(amount_in)
      .checked_mul(U256::from(self.floor_per_unit))?
      .checked_div(U256::from(PRECISION))?;
    if scaled > U256::from(Balance::MAX) {
      return None;
    }
    Some(scaled.as_u128())
  }
}

/// Outcome of the randomness gate for one admitted trigger request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JitterDecision<Hash> {
  /// Request-bound seed; marked consumed when the trigger commits.
  pub seed: Hash,
  /// Jitter drawn from the seed, within the configured window.
  pub jitter: Moment,
  /// Earliest-eligible time plus jitter; execution is admitted at or after this.
  pub admissible_at: Moment,
}

/// AMM router interface for exact-in swaps against pooled liquidity
pub trait AssetConversionApi<AccountId, Balance> {
  /// Swap exactly `amount_in` of `asset_in` held by `who` into `asset_out`,
  /// crediting the realized output to `recipient`.
  ///
  /// Fails without partial effect when the realized output would fall below
  /// `min_amount_out` or the pool lacks liquidity.
  fn swap_exact_in(
    who: &AccountId,
    asset_in: AssetKind,
    asset_out: AssetKind,
    amount_in: Balance,
    min_amount_out: Balance,
    recipient: &AccountId,
  ) -> Result<Balance, DispatchError>;
}

/// Price oracle interface supplying timestamped observations
pub trait PriceOracle {
  /// Latest observation for the pair, if the oracle currently has one
  fn latest_quote(asset_in: AssetKind, asset_out: AssetKind) -> Option<PriceQuote>;
}

/// Verifiable randomness provider consumed by the execution-jitter gate
pub trait RandomnessSource<Hash> {
  /// Random seed bound to `subject`; distinct subjects yield independent seeds
  fn request_random(subject: &[u8]) -> Result<Hash, DispatchError>;
}
