//! # Checkout Pricing
//!
//! Order summary derived from the cart subtotal. The cart preview and the
//! checkout page both call [`compute_totals`], so they can never disagree on
//! the displayed total.

use serde::{Deserialize, Serialize};

/// Orders strictly above this subtotal ship for free
pub const FREE_SHIPPING_THRESHOLD: f64 = 5000.0;

/// Shipping fee charged at or below the threshold
pub const FLAT_SHIPPING_FEE: f64 = 500.0;

/// Tax applied to the subtotal
pub const TAX_RATE: f64 = 0.10;

/// Pricing constants, overridable from `config/pricing.toml`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub free_shipping_threshold: f64,
    pub flat_shipping_fee: f64,
    pub tax_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: FREE_SHIPPING_THRESHOLD,
            flat_shipping_fee: FLAT_SHIPPING_FEE,
            tax_rate: TAX_RATE,
        }
    }
}

impl PricingConfig {
    /// Load from a TOML string; missing keys keep their defaults
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

/// Order summary for a subtotal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckoutTotals {
    pub subtotal: f64,
    pub shipping: f64,
    pub tax: f64,
    pub total: f64,
}

/// Derives [`CheckoutTotals`] from a subtotal
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CheckoutCalculator {
    config: PricingConfig,
}

impl CheckoutCalculator {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn compute_totals(&self, subtotal: f64) -> CheckoutTotals {
        // Strictly greater: an order of exactly the threshold still pays shipping.
        let shipping = if subtotal > self.config.free_shipping_threshold {
            0.0
        } else {
            self.config.flat_shipping_fee
        };
        let tax = subtotal * self.config.tax_rate;

        CheckoutTotals {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
        }
    }
}

/// [`CheckoutCalculator::compute_totals`] with the default constants
pub fn compute_totals(subtotal: f64) -> CheckoutTotals {
    CheckoutCalculator::default().compute_totals(subtotal)
}
