//! Lifecycle configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LifecycleError, LifecycleResult};

/// One leg of an anomaly response: a price multiplier applied to the
/// baseline and the USD notional to commit at that price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLeg {
    /// Target price = baseline price * multiplier.
    pub multiplier: Decimal,
    /// USD notional for this leg; size = notional / target price.
    pub notional: Decimal,
}

impl OrderLeg {
    pub fn new(multiplier: Decimal, notional: Decimal) -> Self {
        Self {
            multiplier,
            notional,
        }
    }

    /// Zip parallel multiplier/notional lists into legs.
    ///
    /// The two lists come from separate configuration keys; a length
    /// mismatch is a fatal configuration error.
    pub fn zip(
        multipliers: &[Decimal],
        notionals: &[Decimal],
    ) -> LifecycleResult<Vec<OrderLeg>> {
        if multipliers.len() != notionals.len() {
            return Err(LifecycleError::InvalidConfig(format!(
                "price multiplier count ({}) does not match order notional count ({})",
                multipliers.len(),
                notionals.len()
            )));
        }

        Ok(multipliers
            .iter()
            .zip(notionals.iter())
            .map(|(m, n)| OrderLeg::new(*m, *n))
            .collect())
    }
}

/// Configuration for the order/position lifecycle manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Cancel unfilled orders at or past this age (seconds).
    pub order_timeout_secs: i64,
    /// Close positions held at or past this age (seconds).
    pub position_close_timeout_secs: i64,
    /// Maximum concurrently active order sets across all symbols.
    pub max_concurrent_campaigns: usize,
    /// Legs placed per campaign, in configured order.
    pub legs: Vec<OrderLeg>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            order_timeout_secs: 600,
            position_close_timeout_secs: 1800,
            max_concurrent_campaigns: 1,
            legs: vec![OrderLeg::new(Decimal::from(3), Decimal::from(100))],
        }
    }
}

impl LifecycleConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> LifecycleResult<()> {
        if self.legs.is_empty() {
            return Err(LifecycleError::InvalidConfig(
                "at least one order leg is required".to_string(),
            ));
        }

        for leg in &self.legs {
            if !leg.multiplier.is_sign_positive() || leg.multiplier.is_zero() {
                return Err(LifecycleError::InvalidConfig(format!(
                    "leg multiplier must be positive, got {}",
                    leg.multiplier
                )));
            }
            if !leg.notional.is_sign_positive() || leg.notional.is_zero() {
                return Err(LifecycleError::InvalidConfig(format!(
                    "leg notional must be positive, got {}",
                    leg.notional
                )));
            }
        }

        if self.order_timeout_secs <= 0 {
            return Err(LifecycleError::InvalidConfig(
                "order_timeout_secs must be positive".to_string(),
            ));
        }

        if self.position_close_timeout_secs <= 0 {
            return Err(LifecycleError::InvalidConfig(
                "position_close_timeout_secs must be positive".to_string(),
            ));
        }

        if self.max_concurrent_campaigns == 0 {
            return Err(LifecycleError::InvalidConfig(
                "max_concurrent_campaigns must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_zip_matching_lengths() {
        let legs = OrderLeg::zip(&[dec!(0.5), dec!(3.0)], &[dec!(50), dec!(50)]).unwrap();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].multiplier, dec!(0.5));
        assert_eq!(legs[1].notional, dec!(50));
    }

    #[test]
    fn test_zip_mismatched_lengths_is_fatal() {
        let result = OrderLeg::zip(&[dec!(0.5), dec!(3.0)], &[dec!(50)]);
        assert!(matches!(result, Err(LifecycleError::InvalidConfig(_))));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(LifecycleConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_legs() {
        let config = LifecycleConfig {
            legs: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_positive_leg_values() {
        let config = LifecycleConfig {
            legs: vec![OrderLeg::new(dec!(0), dec!(100))],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = LifecycleConfig {
            legs: vec![OrderLeg::new(dec!(2), dec!(-5))],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let config = LifecycleConfig {
            max_concurrent_campaigns: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
