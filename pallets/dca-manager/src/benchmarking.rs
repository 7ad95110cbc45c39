extern crate alloc;

use crate::*;
use frame::deps::frame_benchmarking::v2::*;
use frame::deps::frame_support::traits::EnsureOrigin;
use frame::deps::frame_system::RawOrigin;
use primitives::params::PRECISION;

const BENCH_TIME: u64 = 1_700_000_000_000;
const BENCH_FREQUENCY: u64 = 86_400_000;

fn seeded_plan_owner<T: Config>() -> T::AccountId {
  let caller: T::AccountId = whitelisted_caller();
  T::BenchmarkHelper::set_time(BENCH_TIME);
  T::BenchmarkHelper::setup_trade_env().expect("trade env must seed");
  T::BenchmarkHelper::fund_stable(&caller, 20 * PRECISION).expect("funding must succeed");
  Pallet::<T>::create_plan(
    RawOrigin::Signed(caller.clone()).into(),
    BENCH_FREQUENCY,
    PRECISION,
    10 * PRECISION,
  )
  .expect("plan creation must succeed");
  caller
}

#[benchmarks]
mod benches {
  use super::*;

  #[benchmark]
  fn create_plan() {
    let caller: T::AccountId = whitelisted_caller();
    T::BenchmarkHelper::set_time(BENCH_TIME);
    T::BenchmarkHelper::setup_trade_env().expect("trade env must seed");
    T::BenchmarkHelper::fund_stable(&caller, 20 * PRECISION).expect("funding must succeed");

    #[extrinsic_call]
    create_plan(
      RawOrigin::Signed(caller.clone()),
      BENCH_FREQUENCY,
      PRECISION,
      10 * PRECISION,
    );

    assert!(Plans::<T>::contains_key(&caller));
  }

  #[benchmark]
  fn trigger_plan() {
    let caller = seeded_plan_owner::<T>();

    #[extrinsic_call]
    trigger_plan(RawOrigin::Signed(caller.clone()), caller.clone());

    assert_eq!(
      Plans::<T>::get(&caller).map(|p| p.total),
      Some(9 * PRECISION)
    );
  }

  #[benchmark]
  fn withdraw_unspent() {
    let caller = seeded_plan_owner::<T>();

    #[extrinsic_call]
    withdraw_unspent(RawOrigin::Signed(caller.clone()), 5 * PRECISION);

    assert_eq!(
      Plans::<T>::get(&caller).map(|p| p.total),
      Some(5 * PRECISION)
    );
  }

  #[benchmark]
  fn update_reference_price() {
    let origin =
      T::AdminOrigin::try_successful_origin().expect("AdminOrigin must have a successful origin");

    #[extrinsic_call]
    update_reference_price(origin, PRECISION);

    assert_eq!(ReferencePrice::<T>::get(), Some(PRECISION));
  }

  #[cfg(test)]
  use crate::mock::{Test, new_test_ext};
  #[cfg(test)]
  impl_benchmark_test_suite!(Pallet, new_test_ext(), Test);
}
