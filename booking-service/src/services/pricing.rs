//! Totals computation for bookings and adoption orders.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Round to cents, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Tax and grand total for a subtotal. Each step is rounded to cents.
pub fn calculate_totals(subtotal: Decimal, tax_percent: Decimal) -> Totals {
    let tax_amount = round2(subtotal * tax_percent / Decimal::ONE_HUNDRED);
    let total = round2(subtotal + tax_amount);
    Totals { tax_amount, total }
}

/// Sum of line prices, rounded to cents.
pub fn subtotal<I>(prices: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    round2(prices.into_iter().sum())
}

/// Convert a base-currency amount to processor minor units (cents).
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}
