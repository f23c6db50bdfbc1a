//! # Checkout Configuration
//!
//! Explicit configuration handed to the cart when it is built.
//!
//! The tax rate and currency precision are read once, here, and passed in;
//! the cart never consults ambient state, so every calculation is testable
//! with a plain `CheckoutConfig`.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`TALLY_*`)
//! 2. Defaults (this file)

use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;

use crate::money::Money;
use crate::types::TaxRate;
use crate::validation::validate_tax_rate_bps;

/// Most decimal places any currency uses (ISO 4217 tops out at 4).
/// `format_money` treats anything larger as this.
pub const MAX_CURRENCY_DECIMALS: u8 = 4;

/// Checkout configuration.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutConfig {
    /// Store name (receipt header)
    pub store_name: String,

    /// Store address lines (receipt header)
    pub store_address: Vec<String>,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Number of decimal places for currency, at most [`MAX_CURRENCY_DECIMALS`]
    pub currency_decimals: u8,

    /// Tax rate applied to (subtotal − discount)
    pub tax_rate: TaxRate,

    /// Allowed difference between tendered and due for non-cash payments
    pub payment_tolerance: Money,

    /// Receipt width in characters (typically 32, 42, or 48)
    pub receipt_width: usize,
}

impl Default for CheckoutConfig {
    /// Returns default configuration suitable for development.
    ///
    /// ## Default Values
    /// - Store: "Tally Dev Store"
    /// - Currency: `$`, 2 decimals
    /// - Tax: 10%
    /// - Non-cash tolerance: exact
    /// - Receipt: 42 columns
    fn default() -> Self {
        CheckoutConfig {
            store_name: "Tally Dev Store".to_string(),
            store_address: vec!["1 Market Street".to_string()],
            currency_symbol: "$".to_string(),
            currency_decimals: 2,
            tax_rate: TaxRate::from_bps(1000),
            payment_tolerance: Money::zero(),
            receipt_width: 42,
        }
    }
}

impl CheckoutConfig {
    /// Creates a config from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `TALLY_STORE_NAME`: Override store name
    /// - `TALLY_TAX_RATE`: Override tax rate as a percentage (e.g., "8.25")
    /// - `TALLY_CURRENCY_SYMBOL`: Override currency symbol
    /// - `TALLY_CURRENCY_DECIMALS`: Override currency precision (0 to 4)
    /// - `TALLY_RECEIPT_WIDTH`: Override receipt width
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    ///
    /// Unparseable or out-of-range values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = CheckoutConfig::default();

        if let Some(store_name) = lookup("TALLY_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Some(symbol) = lookup("TALLY_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        if let Some(raw) = lookup("TALLY_CURRENCY_DECIMALS") {
            match raw.trim().parse::<u8>() {
                Ok(decimals) if decimals <= MAX_CURRENCY_DECIMALS => {
                    config.currency_decimals = decimals
                }
                _ => warn!(value = %raw, "Ignoring TALLY_CURRENCY_DECIMALS outside 0..=4"),
            }
        }

        if let Some(raw) = lookup("TALLY_TAX_RATE") {
            match raw.trim().parse::<f64>() {
                Ok(pct) if pct >= 0.0 => {
                    let rate = TaxRate::from_percentage(pct);
                    match validate_tax_rate_bps(rate.bps()) {
                        Ok(()) => config.tax_rate = rate,
                        Err(e) => warn!(value = %raw, error = %e, "Ignoring TALLY_TAX_RATE"),
                    }
                }
                _ => warn!(value = %raw, "Ignoring unparseable TALLY_TAX_RATE"),
            }
        }

        if let Some(raw) = lookup("TALLY_RECEIPT_WIDTH") {
            match raw.trim().parse::<usize>() {
                Ok(width) if (24..=80).contains(&width) => config.receipt_width = width,
                _ => warn!(value = %raw, "Ignoring TALLY_RECEIPT_WIDTH outside 24..=80"),
            }
        }

        config
    }

    /// Formats an amount as a currency string.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::{CheckoutConfig, Money};
    ///
    /// let config = CheckoutConfig::default();
    /// assert_eq!(config.format_money(Money::from_cents(1234)), "$12.34");
    /// ```
    pub fn format_money(&self, amount: Money) -> String {
        let cents = amount.cents();
        let decimals = self.currency_decimals.min(MAX_CURRENCY_DECIMALS);
        let divisor = 10_u64.pow(u32::from(decimals));
        let magnitude = cents.unsigned_abs();
        let whole = magnitude / divisor;
        let frac = magnitude % divisor;

        format!(
            "{}{}{}",
            if cents < 0 { "-" } else { "" },
            self.currency_symbol,
            if decimals > 0 {
                format!("{}.{:0width$}", whole, frac, width = decimals as usize)
            } else {
                whole.to_string()
            }
        )
    }
}
