//! Ecosystem Constants for the DCA Engine
//!
//! This module centralizes all system-level constants: the dedicated pallet ID
//! used for custody account derivation and the fundamental economic parameters
//! that bound trigger execution.
//!
//! These constants are the single source of truth and are re-used across
//! runtime configurations via the primitives crate.

/// Balance type alias for consistency across the ecosystem
pub type Balance = u128;

/// Timestamp type used for plan scheduling, in milliseconds since the epoch
pub type Moment = u64;

/// Pallet identifiers for deriving pallet-owned accounts.
///
/// These IDs are used by Polkadot SDK's `PalletId::into_account_truncating()`
/// to deterministically generate accounts for pallet-specific operations.
pub mod pallet_ids {
  /// DCA Manager pallet ID (recurring-purchase engine and custody account)
  pub const DCA_MANAGER_PALLET_ID: &[u8; 8] = b"dcamngr0";
}

/// Ecosystem parameters defining mathematical constants and thresholds.
pub mod params {
  use super::{Balance, Moment};
  use sp_arithmetic::Permill;

  /// Precision scalar for all price calculations (10^12).
  ///
  /// Oracle quotes are expressed as target units per `PRECISION` stable units,
  /// and all minimum-output math uses this precision to avoid rounding drift.
  pub const PRECISION: Balance = 1_000_000_000_000;

  /// Maximum age of an oracle quote before it is rejected (5 minutes).
  ///
  /// A quote older than this must never bound a swap; the trigger fails soft
  /// and can be retried once a fresh observation lands.
  pub const QUOTE_STALENESS_BOUND: Moment = 300_000;

  /// Maximum allowed deviation of a quote from the reference price (10%).
  ///
  /// Circuit breaker threshold: a quote outside this band is treated as
  /// manipulated or anomalous and is never acted upon.
  pub const MAX_PRICE_DEVIATION: Permill = Permill::from_percent(10);

  /// Haircut applied to the validated quote when deriving the swap's
  /// minimum-output floor (2%).
  pub const SLIPPAGE_TOLERANCE: Permill = Permill::from_percent(2);

  /// Width of the randomness-derived execution jitter window (1 minute).
  ///
  /// Each trigger request draws a jitter in `[0, MAX_EXECUTION_JITTER]` from
  /// its seed; execution is admitted only once the jitter has elapsed past the
  /// plan's earliest-eligible time. This removes the exact, publicly
  /// predictable execution instant that front-runners would otherwise target.
  pub const MAX_EXECUTION_JITTER: Moment = 60_000;
}
