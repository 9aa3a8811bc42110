use crate::catalog::Token;
use crate::error::{Error, MathError};
use alloy_primitives::U256;

/// Default tolerance, in base units, for excess fractional digits.
pub const DEFAULT_PRECISION_EPSILON: f64 = 1e-9;

/// Significant decimal digits that survive a trip through `f64` unchanged.
const F64_EXACT_DIGITS: usize = 15;

/// Converts between decimal token amounts and integer base units.
///
/// Amounts are read at their shortest round-trip decimal representation, so
/// `0.1` is treated as exactly one tenth and never as the binary value
/// nearest to it. Digits beyond the token's precision must amount to less
/// than `epsilon` of a base unit away from a whole base unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPointConverter {
    epsilon: f64,
}

impl Default for FixedPointConverter {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_PRECISION_EPSILON,
        }
    }
}

impl FixedPointConverter {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon: epsilon.abs(),
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// `amount * 10^decimals`, rounded to the nearest base unit with ties
    /// toward zero.
    pub fn to_base_units(&self, token: &Token, amount: f64) -> Result<U256, Error> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::InvalidAmountError(amount));
        }

        let decimals = token.decimals as usize;
        let repr = format!("{amount}");
        let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

        let (kept, excess) = frac_part.split_at(frac_part.len().min(decimals));
        let digits = format!("{int_part}{kept:0<decimals$}");
        let mut base = U256::from_str_radix(&digits, 10).map_err(|_| MathError::Overflow)?;

        if !excess.is_empty() {
            // fraction of one base unit left over after the kept digits
            let fraction: f64 = format!("0.{excess}").parse().unwrap_or_default();
            if fraction.min(1.0 - fraction) > self.epsilon {
                return Err(Error::PrecisionError {
                    symbol: token.symbol,
                    amount,
                    decimals: token.decimals,
                });
            }
            if fraction > 0.5 {
                base = base.checked_add(U256::ONE).ok_or(MathError::Overflow)?;
            }
        }

        Ok(base)
    }

    /// `amount / 10^decimals` as the nearest `f64`.
    pub fn to_decimal(&self, token: &Token, amount: U256) -> f64 {
        let decimals = token.decimals as usize;
        let digits = amount.to_string();
        let repr = if decimals == 0 {
            digits
        } else {
            let padded = format!("{digits:0>width$}", width = decimals + 1);
            let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
            format!("{int_part}.{frac_part}")
        };
        repr.parse().unwrap_or_default()
    }

    /// Like [`Self::to_decimal`], but rounds `amount` up to at most 15
    /// significant digits first, so converting the result back never
    /// yields fewer base units than `amount`.
    pub fn to_decimal_ceil(&self, token: &Token, amount: U256) -> f64 {
        let digits = amount.to_string().len();
        if digits <= F64_EXACT_DIGITS {
            return self.to_decimal(token, amount);
        }
        let step = pow10((digits - F64_EXACT_DIGITS) as u8);
        let remainder = amount % step;
        let rounded = if remainder.is_zero() {
            amount
        } else {
            (amount - remainder).saturating_add(step)
        };
        self.to_decimal(token, rounded)
    }
}

/// `10^decimals` as a 256-bit integer.
pub fn pow10(decimals: u8) -> U256 {
    U256::from(10u8).pow(U256::from(decimals))
}
