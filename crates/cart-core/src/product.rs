//! # Product Types
//!
//! Product snapshot and currency types for harvest-cart.
//! The catalog itself lives in an external service; the cart only keeps a
//! denormalized snapshot of each product as it was when added.

use serde::{Deserialize, Serialize};

/// Settlement currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    NGN,
    GHS,
    KES,
    ZAR,
    USD,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::NGN => "NGN",
            Currency::GHS => "GHS",
            Currency::KES => "KES",
            Currency::ZAR => "ZAR",
            Currency::USD => "USD",
        }
    }

    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u8 {
        2
    }

    /// Convert a decimal amount to the smallest currency unit (kobo, pesewas, cents)
    pub fn to_smallest_unit(&self, amount: f64) -> i64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (amount * multiplier).round() as i64
    }

    /// Convert from smallest unit back to decimal
    pub fn from_smallest_unit(&self, amount: i64) -> f64 {
        let divisor = 10_f64.powi(self.decimal_places() as i32);
        amount as f64 / divisor
    }

    /// Display symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::NGN => "₦",
            Currency::GHS => "GH₵",
            Currency::KES => "KSh ",
            Currency::ZAR => "R",
            Currency::USD => "$",
        }
    }

    /// Format an amount for display (e.g., "₦1500.00")
    pub fn format(&self, amount: f64) -> String {
        format!("{}{:.2}", self.symbol(), amount)
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NGN" => Ok(Currency::NGN),
            "GHS" => Ok(Currency::GHS),
            "KES" => Ok(Currency::KES),
            "ZAR" => Ok(Currency::ZAR),
            "USD" => Ok(Currency::USD),
            other => Err(format!("unsupported currency: {}", other)),
        }
    }
}

/// A product as it looked when it was put in the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    /// Catalog product id (also the cart item id)
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Price per unit, in the marketplace currency
    #[serde(default)]
    pub unit_price: f64,

    /// Selling unit (e.g. "kg", "crate", "basket")
    #[serde(default)]
    pub unit: String,

    /// Image URLs
    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    pub farmer_name: String,

    #[serde(default)]
    pub business_name: String,

    #[serde(default)]
    pub location: String,
}

impl ProductSnapshot {
    /// Create a snapshot with the required pricing fields
    pub fn new(id: impl Into<String>, name: impl Into<String>, unit_price: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            unit: String::new(),
            images: Vec::new(),
            farmer_name: String::new(),
            business_name: String::new(),
            location: String::new(),
        }
    }

    /// Builder: set selling unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Builder: add an image URL
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.images.push(url.into());
        self
    }

    /// Builder: set the seller details
    pub fn with_seller(
        mut self,
        farmer_name: impl Into<String>,
        business_name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        self.farmer_name = farmer_name.into();
        self.business_name = business_name.into();
        self.location = location.into();
        self
    }
}
