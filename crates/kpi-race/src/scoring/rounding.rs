//! Fixed-point rounding policy shared by every rollup level.
//!
//! All rounding is half-up (midpoint away from zero). Running sums keep full precision and are
//! only rounded at the boundaries named below.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Scale of a ratio once normalized from a 0-100 percentage to a 0-1 fraction.
pub const RATIO_SCALE: u32 = 6;
/// Scale of intermediate quotients (fractions, per-period averages, stage contributions).
pub const INTERMEDIATE_SCALE: u32 = 4;
/// Scale of every externally visible weight or percentage.
pub const DISPLAY_SCALE: u32 = 2;

pub(crate) const HUNDRED: Decimal = dec!(100);

/// Rounds half-up to exactly `scale` decimal places, padding trailing zeros.
pub fn half_up(value: Decimal, scale: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

pub fn display(value: Decimal) -> Decimal {
    half_up(value, DISPLAY_SCALE)
}

/// Converts a stored 0-100 ratio into a 0-1 fraction at [`RATIO_SCALE`].
pub fn normalize_ratio(ratio: Decimal) -> Decimal {
    half_up(ratio / HUNDRED, RATIO_SCALE)
}

/// `part / whole` at [`INTERMEDIATE_SCALE`], times 100. Zero when `whole` is not positive.
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    half_up(part / whole, INTERMEDIATE_SCALE) * HUNDRED
}

/// `total / count` at [`INTERMEDIATE_SCALE`]. Zero when `count` is zero.
pub fn average_over(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    half_up(total / Decimal::from(count as u64), INTERMEDIATE_SCALE)
}
