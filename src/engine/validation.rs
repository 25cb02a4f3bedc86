// ============================================================================
// Execution Validation
// Pure eligibility checks and amount computation for one execution
// ============================================================================

use crate::domain::{Address, Order};
use crate::numeric::mul_div_floor;

use super::errors::CoordinatorError;

/// Minimum native units left behind in the scoped account after a trade.
/// Draining an account to zero can trip dust/health invariants in the margin
/// protocol, so exactly one unit stays.
pub const BALANCE_FLOOR: u128 = 1;

/// Schedule-side eligibility: the order must exist, have executions left and
/// be past its next execution time.
pub fn check_schedule(order: &Order, now: u64) -> Result<(), CoordinatorError> {
    if order.scope.is_empty() {
        return Err(CoordinatorError::OrderIsCancelled);
    }
    if order.executions_left == 0 {
        return Err(CoordinatorError::NoExecutionsLeft);
    }
    if now < order.next_execution_time {
        return Err(CoordinatorError::NotTimeYet);
    }
    Ok(())
}

/// Control-side eligibility: the account's current controller must still be
/// the owner the order was bound to. Divergence invalidates the order.
pub fn check_controller(order: &Order, controller: Address) -> Result<(), CoordinatorError> {
    if controller != order.owner {
        return Err(CoordinatorError::InvalidOrder);
    }
    Ok(())
}

/// Trade size for this execution: the fixed per-interval slice, clamped so
/// the account keeps [`BALANCE_FLOOR`] units of `token_in`.
pub fn clamp_amount_in(
    amount_per_interval: u128,
    balance: u128,
) -> Result<u128, CoordinatorError> {
    if balance <= BALANCE_FLOOR {
        return Err(CoordinatorError::NothingToSell);
    }
    Ok(amount_per_interval.min(balance - BALANCE_FLOOR))
}

/// Minimum acceptable proceeds: `amount_in` valued at `rate_per_unit` units
/// of `token_out` per `one_unit` of `token_in`, floor-rounded.
pub fn min_amount_out(
    amount_in: u128,
    rate_per_unit: u128,
    one_unit: u128,
) -> Result<u128, CoordinatorError> {
    Ok(mul_div_floor(amount_in, rate_per_unit, one_unit)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountScope, OrderParams};
    use proptest::prelude::*;

    fn order() -> Order {
        OrderParams {
            owner: Address::from_low_u64(1),
            scope: AccountScope::new(Address::from_low_u64(10), Address::from_low_u64(11)),
            token_in: Address::from_low_u64(100),
            token_out: Address::from_low_u64(101),
            amount_per_interval: 200_000,
            interval: 86_400,
            first_execution_time: 1_000_000,
            executions: 10,
        }
        .into_order()
    }

    #[test]
    fn test_schedule_checks_in_order() {
        let mut o = Order::default();
        assert_eq!(
            check_schedule(&o, u64::MAX),
            Err(CoordinatorError::OrderIsCancelled)
        );

        o = order();
        o.executions_left = 0;
        assert_eq!(
            check_schedule(&o, u64::MAX),
            Err(CoordinatorError::NoExecutionsLeft)
        );

        let o = order();
        assert_eq!(
            check_schedule(&o, o.next_execution_time - 1),
            Err(CoordinatorError::NotTimeYet)
        );
        assert_eq!(check_schedule(&o, o.next_execution_time), Ok(()));
    }

    #[test]
    fn test_controller_divergence() {
        let o = order();
        assert_eq!(check_controller(&o, o.owner), Ok(()));
        assert_eq!(
            check_controller(&o, Address::from_low_u64(2)),
            Err(CoordinatorError::InvalidOrder)
        );
    }

    #[test]
    fn test_clamp_leaves_one_unit() {
        // balance below the slice: clamp to balance - 1
        assert_eq!(clamp_amount_in(200_000, 150_000), Ok(149_999));
        // balance above the slice: full slice
        assert_eq!(clamp_amount_in(200_000, 1_000_000), Ok(200_000));
        // exact balance still keeps a unit behind
        assert_eq!(clamp_amount_in(200_000, 200_000), Ok(199_999));
    }

    #[test]
    fn test_clamp_floor() {
        assert_eq!(clamp_amount_in(100, 0), Err(CoordinatorError::NothingToSell));
        assert_eq!(clamp_amount_in(100, 1), Err(CoordinatorError::NothingToSell));
        assert_eq!(clamp_amount_in(100, 2), Ok(1));
    }

    #[test]
    fn test_min_amount_out_truncates() {
        // 149_999 at 0.999999 out per unit of 1e6 in
        assert_eq!(
            min_amount_out(149_999, 999_999, 1_000_000),
            Ok(149_998)
        );
        assert_eq!(min_amount_out(0, 1, 1), Ok(0));
    }

    proptest! {
        #[test]
        fn prop_amount_in_bounds(
            slice in 1u128..=u64::MAX as u128,
            balance in 0u128..=u64::MAX as u128,
        ) {
            match clamp_amount_in(slice, balance) {
                Ok(amount) => {
                    prop_assert!(balance > BALANCE_FLOOR);
                    prop_assert!(amount <= slice);
                    prop_assert!(amount <= balance - BALANCE_FLOOR);
                    prop_assert!(amount > 0);
                }
                Err(e) => {
                    prop_assert_eq!(e, CoordinatorError::NothingToSell);
                    prop_assert!(balance <= BALANCE_FLOOR);
                }
            }
        }

        #[test]
        fn prop_min_out_never_rounds_up(
            amount in 0u128..=u64::MAX as u128,
            rate in 0u128..=u64::MAX as u128,
            unit in 1u128..=u64::MAX as u128,
        ) {
            let out = min_amount_out(amount, rate, unit).unwrap();
            // floor(a*r/u) * u <= a*r
            prop_assert!(out * unit <= amount * rate);
        }
    }
}
