#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use polkadot_sdk::frame_support::{traits::Get, weights::{Weight, constants::RocksDbWeight}};
use core::marker::PhantomData;

pub trait WeightInfo {
	fn create_plan() -> Weight;
	fn trigger_plan() -> Weight;
	fn withdraw_unspent() -> Weight;
	fn update_reference_price() -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config> WeightInfo for SubstrateWeight<T> {
	fn create_plan() -> Weight {
		Weight::from_parts(45_000_000, 3000)
			.saturating_add(T::DbWeight::get().reads(3))
			.saturating_add(T::DbWeight::get().writes(3))
	}
	fn trigger_plan() -> Weight {
		Weight::from_parts(95_000_000, 6000)
			.saturating_add(T::DbWeight::get().reads(6))
			.saturating_add(T::DbWeight::get().writes(5))
	}
	fn withdraw_unspent() -> Weight {
		Weight::from_parts(40_000_000, 3000)
			.saturating_add(T::DbWeight::get().reads(2))
			.saturating_add(T::DbWeight::get().writes(3))
	}
	fn update_reference_price() -> Weight {
		Weight::from_parts(15_000_000, 1000)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
}

impl WeightInfo for () {
	fn create_plan() -> Weight {
		Weight::from_parts(45_000_000, 3000)
	}
	fn trigger_plan() -> Weight {
		Weight::from_parts(95_000_000, 6000)
	}
	fn withdraw_unspent() -> Weight {
		Weight::from_parts(40_000_000, 3000)
	}
	fn update_reference_price() -> Weight {
		Weight::from_parts(15_000_000, 1000)
	}
}
