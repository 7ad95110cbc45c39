use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

/// This enum is the single source of truth for asset identity across the DCA
/// engine: the plan ledger, price guard, swap executor, and custody accounting
/// all address assets through it.
///
/// - `Native`: The chain's native token (managed by pallet-balances).
/// - `Local(u32)`: Local assets (managed by pallet-assets).
/// - `Foreign(u32)`: Bridged assets in the 0xF... namespace.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  MaxEncodedLen,
  Ord,
  PartialEq,
  PartialOrd,
  TypeInfo,
  Serialize,
  Deserialize,
)]
pub enum AssetKind {
  /// Native token managed by pallet-balances
  #[default]
  Native,
  /// Local asset managed by pallet-assets
  Local(u32),
  /// Foreign asset managed by pallet-assets via a bridge mapping (0xF... namespace)
  Foreign(u32),
}

impl From<u32> for AssetKind {
  fn from(asset_id: u32) -> Self {
    AssetKind::Local(asset_id)
  }
}

// Bitmask Architecture for Asset Classification
//
// 32-bit ID Structure:
// [ 4 bits: Type ] [ 28 bits: Index/ID ]
//
// Types:
// 0x1... -> Standard Tokens (purchase targets)
// 0x2... -> Stablecoins (funding/budget assets)
// 0xF... -> Foreign/Bridged Assets

pub const MASK_TYPE: u32 = 0xF000_0000;
pub const MASK_INDEX: u32 = 0x0FFF_FFFF;

pub const TYPE_STD: u32 = 0x1000_0000;
pub const TYPE_STABLE: u32 = 0x2000_0000;
pub const TYPE_FOREIGN: u32 = 0xF000_0000;

/// Helper trait to inspect AssetKind properties
pub trait AssetInspector {
  fn is_native(&self) -> bool;
  fn local_id(&self) -> Option<u32>;

  // Bitmask checks
  fn is_std(&self) -> bool;
  fn is_stable(&self) -> bool;
  fn is_foreign(&self) -> bool;
}

impl AssetInspector for AssetKind {
  fn is_native(&self) -> bool {
    matches!(self, AssetKind::Native)
  }

  fn local_id(&self) -> Option<u32> {
    match self {
      AssetKind::Local(id) | AssetKind::Foreign(id) => Some(*id),
      _ => None,
    }
  }

  fn is_std(&self) -> bool {
    match self {
      AssetKind::Local(id) => (id & MASK_TYPE) == TYPE_STD,
      _ => false,
    }
  }

  fn is_stable(&self) -> bool {
    match self {
      AssetKind::Local(id) => (id & MASK_TYPE) == TYPE_STABLE,
      _ => false,
    }
  }

  fn is_foreign(&self) -> bool {
    match self {
      AssetKind::Foreign(_) => true,
      AssetKind::Local(id) => (id & MASK_TYPE) == TYPE_FOREIGN,
      _ => false,
    }
  }
}

/// Helper to construct compile-time IDs
const fn make_id(type_mask: u32, index: u32) -> u32 {
  type_mask | (index & MASK_INDEX)
}

/// Well-known asset constants serving as system defaults.
///
/// The engine is deployed against one funding stablecoin and one purchase
/// target; these are the canonical choices.
pub mod well_known {
  use super::*;

  // Standard Tokens (0x1...)
  pub const DOT: u32 = make_id(TYPE_STD, 1);
  pub const ETH: u32 = make_id(TYPE_STD, 3);
  pub const BTC: u32 = make_id(TYPE_STD, 4);

  // Stablecoins (0x2...)
  pub const USDT: u32 = make_id(TYPE_STABLE, 1);
  pub const USDC: u32 = make_id(TYPE_STABLE, 2);
}
