//! # Basis-Point Fees
//!
//! Fee rates are expressed in basis points over [`BASE`]. Splitting an amount
//! rounds the fee down; the remainder goes to the principal side of the
//! split, so `fee + net == amount` always holds.
//!
//! ## Security Invariant
//!
//! Raw fee inputs arrive as `u64` and are range-checked against their maximum
//! *before* narrowing to `u16`. A caller passing `u64::MAX` gets `FeeTooHigh`,
//! never a silently truncated rate.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::CoreError;

/// Denominator of every fee rate (100.00%).
pub const BASE: u16 = 10_000;

/// Upper bound on an escrow's agent fee (10%).
pub const MAX_AGENT_FEE: u16 = 1_000;

/// A fee rate in basis points, always `<= BASE`.
///
/// Serializes as a bare integer. Deserialization goes through
/// [`FeeRate::bounded`] against [`BASE`], so a decoded rate keeps the same
/// invariant as a constructed one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u64")]
pub struct FeeRate(u16);

/// Result of splitting an amount at a fee rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    /// `floor(amount * rate / BASE)`.
    pub fee: Amount,
    /// `amount - fee`.
    pub net: Amount,
}

impl FeeRate {
    /// No fee.
    pub const ZERO: Self = Self(0);

    /// Validate a raw rate against `max` and narrow it.
    ///
    /// `max` itself is clamped to [`BASE`], so a rate above 100% is
    /// unrepresentable regardless of the caller's limit.
    pub fn bounded(raw: u64, max: u16) -> Result<Self, CoreError> {
        let limit = max.min(BASE);
        if raw > u64::from(limit) {
            return Err(CoreError::FeeTooHigh { fee: raw, max: limit });
        }
        // raw <= limit <= BASE fits in u16
        Ok(Self(raw as u16))
    }

    /// The rate in basis points of [`BASE`].
    pub fn basis_points(&self) -> u16 {
        self.0
    }

    /// Split `amount` into a rounded-down fee and the remainder.
    pub fn split(&self, amount: Amount) -> Result<FeeSplit, CoreError> {
        let fee = mul_div_floor(amount.get(), u128::from(self.0), u128::from(BASE))?;
        let net = amount
            .get()
            .checked_sub(fee)
            .ok_or(CoreError::Overflow("fee split remainder"))?;
        Ok(FeeSplit {
            fee: Amount::new(fee),
            net: Amount::new(net),
        })
    }
}

impl TryFrom<u64> for FeeRate {
    type Error = CoreError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::bounded(raw, BASE)
    }
}

impl std::fmt::Display for FeeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}bp", self.0)
    }
}

/// `floor(a * num / den)` without forming the full product.
///
/// Decomposes `a = q * den + r`, so the result is `q * num + floor(r * num / den)`.
/// Exact for every `a` as long as `num <= den`, which fee rates guarantee.
fn mul_div_floor(a: u128, num: u128, den: u128) -> Result<u128, CoreError> {
    if den == 0 {
        return Err(CoreError::Overflow("fee denominator"));
    }
    let q = a / den;
    let r = a % den;
    let high = q.checked_mul(num).ok_or(CoreError::Overflow("fee quotient"))?;
    let low = r.checked_mul(num).ok_or(CoreError::Overflow("fee remainder"))? / den;
    high.checked_add(low).ok_or(CoreError::Overflow("fee sum"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_accepts_up_to_max() {
        assert_eq!(FeeRate::bounded(1000, MAX_AGENT_FEE).unwrap().basis_points(), 1000);
        assert_eq!(FeeRate::bounded(0, MAX_AGENT_FEE).unwrap(), FeeRate::ZERO);
    }

    #[test]
    fn bounded_rejects_above_max() {
        assert_eq!(
            FeeRate::bounded(1001, MAX_AGENT_FEE),
            Err(CoreError::FeeTooHigh { fee: 1001, max: 1000 })
        );
    }

    #[test]
    fn bounded_rejects_wide_input_without_wrapping() {
        // 65_536 + 10 would narrow to 10 if truncated first.
        assert!(FeeRate::bounded(65_546, MAX_AGENT_FEE).is_err());
        assert_eq!(
            FeeRate::bounded(u64::MAX, 50),
            Err(CoreError::FeeTooHigh { fee: u64::MAX, max: 50 })
        );
    }

    #[test]
    fn max_above_base_is_clamped() {
        assert!(FeeRate::bounded(10_000, u16::MAX).is_ok());
        assert!(FeeRate::bounded(10_001, u16::MAX).is_err());
    }

    #[test]
    fn split_rounds_fee_down() {
        let rate = FeeRate::bounded(500, MAX_AGENT_FEE).unwrap();
        let split = rate.split(Amount::new(500_000)).unwrap();
        assert_eq!(split.fee, Amount::new(25_000));
        assert_eq!(split.net, Amount::new(475_000));

        // 5% of 19 = 0.95 -> 0
        let small = rate.split(Amount::new(19)).unwrap();
        assert_eq!(small.fee, Amount::ZERO);
        assert_eq!(small.net, Amount::new(19));
    }

    #[test]
    fn split_of_zero_is_zero() {
        let split = FeeRate::bounded(1000, MAX_AGENT_FEE).unwrap().split(Amount::ZERO).unwrap();
        assert_eq!(split, FeeSplit { fee: Amount::ZERO, net: Amount::ZERO });
    }

    #[test]
    fn split_near_u128_max_does_not_overflow() {
        let rate = FeeRate::bounded(10_000, BASE).unwrap();
        let split = rate.split(Amount::new(u128::MAX)).unwrap();
        assert_eq!(split.fee, Amount::new(u128::MAX));
        assert_eq!(split.net, Amount::ZERO);

        let rate = FeeRate::bounded(9_999, BASE).unwrap();
        let split = rate.split(Amount::new(u128::MAX)).unwrap();
        assert_eq!(split.fee.get() + split.net.get(), u128::MAX);
    }

    #[test]
    fn display_shows_basis_points() {
        assert_eq!(FeeRate::bounded(25, 50).unwrap().to_string(), "25bp");
    }

    #[test]
    fn serde_is_a_bare_integer() {
        let rate = FeeRate::bounded(500, MAX_AGENT_FEE).unwrap();
        assert_eq!(serde_json::to_string(&rate).unwrap(), "500");
        assert_eq!(serde_json::from_str::<FeeRate>("500").unwrap(), rate);
    }

    #[test]
    fn deserialize_rejects_rates_above_base() {
        assert_eq!(serde_json::from_str::<FeeRate>("10000").unwrap().basis_points(), BASE);
        for raw in ["10001", "65535", "65546", "18446744073709551615"] {
            assert!(serde_json::from_str::<FeeRate>(raw).is_err(), "{raw}");
        }
        assert!(serde_json::from_str::<FeeRate>("-1").is_err());
    }
}
