//! Checkout configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Checkout configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    /// Hours a pending transaction stays payable before the sweep expires it
    #[serde(default = "default_payment_deadline_hours")]
    pub payment_deadline_hours: u32,

    /// Where hosted invoice pages send the payer after success
    pub success_redirect_url: Option<String>,

    /// Where hosted invoice pages send the payer after failure
    pub failure_redirect_url: Option<String>,
}

impl CheckoutConfig {
    /// Validate checkout configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.payment_deadline_hours == 0 || self.payment_deadline_hours > 168 {
            return Err(ValidationError::InvalidPaymentDeadline);
        }
        Ok(())
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            payment_deadline_hours: default_payment_deadline_hours(),
            success_redirect_url: None,
            failure_redirect_url: None,
        }
    }
}

fn default_payment_deadline_hours() -> u32 {
    24
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_defaults() {
        let config = CheckoutConfig::default();
        assert_eq!(config.payment_deadline_hours, 24);
        assert!(config.success_redirect_url.is_none());
    }

    #[test]
    fn test_validation_zero_deadline() {
        let config = CheckoutConfig {
            payment_deadline_hours: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_deadline_over_a_week() {
        let config = CheckoutConfig {
            payment_deadline_hours: 200,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
