//! Miscellaneous helper utilities.

use crate::errors::{AppError, Result};
use bigdecimal::{BigDecimal, RoundingMode};
use ethers::types::U256;
use num_bigint::{BigInt, Sign};
use num_traits::One;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize `tracing` subscriber with env-based filter.
///
/// If `RUST_LOG` is not set, defaults to `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Convert a decimal amount (e.g. `2.5`) into the asset's smallest unit.
///
/// Digits below `10^-decimals` round up, so a raw balance is below the result
/// exactly when its decimal value is below `amount`.
pub fn to_base_units(amount: &BigDecimal, decimals: u8) -> Result<U256> {
    let scale = BigDecimal::new(BigInt::one(), -(decimals as i64));
    bigdecimal_to_u256(&(amount * scale), RoundingMode::Ceiling)
}

/// Convert a raw on-chain amount into decimal units, for logs and messages.
pub fn from_base_units(amount: U256, decimals: u8) -> BigDecimal {
    BigDecimal::new(u256_to_bigint(amount), decimals as i64)
}

/// `floor(quoted * (1 - slippage))`.
pub fn min_amount_out(quoted: U256, slippage: &BigDecimal) -> Result<U256> {
    let factor = BigDecimal::one() - slippage;
    let quoted = BigDecimal::new(u256_to_bigint(quoted), 0);
    bigdecimal_to_u256(&(quoted * factor), RoundingMode::Floor)
}

fn u256_to_bigint(value: U256) -> BigInt {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    BigInt::from_bytes_be(Sign::Plus, &bytes)
}

fn bigdecimal_to_u256(value: &BigDecimal, mode: RoundingMode) -> Result<U256> {
    let (int, _) = value.with_scale_round(0, mode).into_bigint_and_exponent();
    let (sign, bytes) = int.to_bytes_be();
    if sign == Sign::Minus {
        return Err(AppError::Other(format!("negative amount: {value}")));
    }
    if bytes.len() > 32 {
        return Err(AppError::Other(format!("amount {value} does not fit in U256")));
    }
    Ok(U256::from_big_endian(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn scales_decimal_amounts_to_base_units() {
        let five = BigDecimal::from(5);
        assert_eq!(
            to_base_units(&five, 18).unwrap(),
            U256::from(5u64) * U256::exp10(18)
        );
        let frac = BigDecimal::from_str("2.5").unwrap();
        assert_eq!(to_base_units(&frac, 6).unwrap(), U256::from(2_500_000u64));
    }

    #[test]
    fn sub_unit_digits_round_up() {
        let fine = BigDecimal::from_str("2.0000001").unwrap();
        assert_eq!(to_base_units(&fine, 6).unwrap(), U256::from(2_000_001u64));
        let fine = BigDecimal::from_str("0.1234561").unwrap();
        assert_eq!(to_base_units(&fine, 6).unwrap(), U256::from(123_457u64));
    }

    #[test]
    fn large_amounts_survive_the_bigint_bridge() {
        assert_eq!(from_base_units(U256::MAX, 0), BigDecimal::new(u256_to_bigint(U256::MAX), 0));
        assert_eq!(
            to_base_units(&from_base_units(U256::MAX, 18), 18).unwrap(),
            U256::MAX
        );
        let too_big = from_base_units(U256::MAX, 0) + BigDecimal::from(1);
        assert!(to_base_units(&too_big, 0).is_err());
    }

    #[test]
    fn rejects_negative_amounts() {
        let neg = BigDecimal::from(-1);
        assert!(to_base_units(&neg, 6).is_err());
    }

    #[test]
    fn min_amount_out_applies_slippage_and_floors() {
        let slippage = BigDecimal::from_str("0.005").unwrap();
        assert_eq!(
            min_amount_out(U256::from(1_000_000u64), &slippage).unwrap(),
            U256::from(995_000u64)
        );
        // 999 * 0.995 = 994.005
        assert_eq!(
            min_amount_out(U256::from(999u64), &slippage).unwrap(),
            U256::from(994u64)
        );
        assert_eq!(
            min_amount_out(U256::from(7u64), &BigDecimal::from(0)).unwrap(),
            U256::from(7u64)
        );
    }

    #[test]
    fn base_units_render_as_decimals() {
        let shown = from_base_units(U256::from(1_500_000u64), 6);
        assert_eq!(shown, BigDecimal::from_str("1.5").unwrap());
    }
}
