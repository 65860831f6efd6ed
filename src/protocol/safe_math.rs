//! Safe Math
//!
//! This module contains basic functions to perform arithmetic operations on
//! `BigDecimal` values without panicking. Should an operation be impossible,
//! a result containing `SimulationError` is returned.
use bigdecimal::BigDecimal;
use num_traits::{One, Zero};

use crate::protocol::errors::SimulationError;

pub fn safe_div(a: &BigDecimal, b: &BigDecimal) -> Result<BigDecimal, SimulationError> {
    if b.is_zero() {
        return Err(SimulationError::FatalError("Division by zero".to_string()));
    }
    Ok(a / b)
}

pub fn safe_inverse(a: &BigDecimal) -> Result<BigDecimal, SimulationError> {
    safe_div(&BigDecimal::one(), a)
}

pub fn safe_sqrt(a: &BigDecimal) -> Result<BigDecimal, SimulationError> {
    a.sqrt()
        .ok_or_else(|| SimulationError::FatalError("Square root of negative value".to_string()))
}

#[cfg(test)]
mod safe_math_tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::exact("10", "4", "2.5")]
    #[case::identity("7.25", "1", "7.25")]
    #[case::negative("-9", "3", "-3")]
    fn test_safe_div(#[case] a: &str, #[case] b: &str, #[case] expected: &str) {
        let a = BigDecimal::from_str(a).unwrap();
        let b = BigDecimal::from_str(b).unwrap();
        assert_eq!(safe_div(&a, &b).unwrap(), BigDecimal::from_str(expected).unwrap());
    }

    #[test]
    fn test_safe_div_by_zero() {
        let res = safe_div(&BigDecimal::one(), &BigDecimal::zero());
        assert_eq!(res, Err(SimulationError::FatalError("Division by zero".to_string())));
    }

    #[test]
    fn test_safe_inverse() {
        let value = BigDecimal::from_str("8").unwrap();
        assert_eq!(safe_inverse(&value).unwrap(), BigDecimal::from_str("0.125").unwrap());
        assert!(safe_inverse(&BigDecimal::zero()).is_err());
    }

    #[test]
    fn test_safe_sqrt() {
        let value = BigDecimal::from_str("4").unwrap();
        assert_eq!(safe_sqrt(&value).unwrap(), BigDecimal::from_str("2").unwrap());

        let negative = BigDecimal::from_str("-1").unwrap();
        assert!(safe_sqrt(&negative).is_err());
    }
}
