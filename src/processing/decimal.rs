//! Fixed-point accumulator for `AVG` and `SUM`.
//!
//! Values are held as `i128` units of 10⁻¹⁰, so adding thousands of two-decimal grades stays
//! exact where repeated `f64` addition would drift. Totals beyond that range are reported as
//! `None` by the checked operations, and the caller switches to `f64` arithmetic.

/// Number of fractional decimal digits kept by [`Fixed`].
pub const SCALE_DIGITS: u32 = 10;
const SCALE: i128 = 10_i128.pow(SCALE_DIGITS);
/// Units of [`Fixed`] per hundredth.
const PER_HUNDREDTH: i128 = SCALE / 100;

/// A decimal number with [`SCALE_DIGITS`] fractional digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fixed(i128);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);

    /// Convert `value`, rounding to the nearest unit.
    ///
    /// Returns `None` for non-finite values and magnitudes that do not fit in `i128` units.
    pub fn checked_from_f64(value: f64) -> Option<Self> {
        let scaled = (value * SCALE as f64).round();
        if !scaled.is_finite() || scaled.abs() >= i128::MAX as f64 {
            return None;
        }
        Some(Fixed(scaled as i128))
    }

    pub fn checked_add(self, rhs: Fixed) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Fixed)
    }

    /// Exact total of `values`, or `None` as soon as a value or partial sum leaves the range.
    pub fn checked_sum(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values.into_iter().try_fold(Fixed::ZERO, |total, v| {
            total.checked_add(Fixed::checked_from_f64(v)?)
        })
    }

    /// Value rounded half away from zero to two decimals.
    pub fn round2(self) -> f64 {
        div_round_half_away(self.0, PER_HUNDREDTH) as f64 / 100.0
    }

    /// `self / count`, rounded half away from zero to two decimals.
    ///
    /// Returns `None` when `count` is zero.
    pub fn mean2(self, count: usize) -> Option<f64> {
        if count == 0 {
            return None;
        }
        let divisor = i128::try_from(count).ok()?.checked_mul(PER_HUNDREDTH)?;
        Some(div_round_half_away(self.0, divisor) as f64 / 100.0)
    }
}

/// Round an `f64` half away from zero to two decimals.
///
/// Magnitudes too large to carry hundredths are already whole and come back unchanged.
pub fn round2_f64(value: f64) -> f64 {
    let hundredths = value * 100.0;
    if hundredths.is_finite() && hundredths.abs() < 2_f64.powi(53) {
        hundredths.round() / 100.0
    } else {
        value
    }
}

/// Integer division rounding half away from zero. `divisor` must be positive.
fn div_round_half_away(value: i128, divisor: i128) -> i128 {
    let quotient = value / divisor;
    let remainder = value % divisor;
    if remainder.unsigned_abs() * 2 >= divisor.unsigned_abs() {
        quotient + value.signum()
    } else {
        quotient
    }
}
