//! # cart-wasm
//!
//! WebAssembly bindings for harvest-cart.
//!
//! This crate exposes the cart reducer and the order summary to the browser
//! so the storefront renders the same numbers the server charges:
//! - `WasmCart`, a client-side cart over the shared `CartState`
//! - `compute_totals` for the checkout summary
//! - `normalize_snapshot` for carts restored from `localStorage`
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmCart, compute_totals } from 'harvest-cart-wasm';
//!
//! await init();
//!
//! const cart = WasmCart.from_snapshot(localStorage.getItem('cart') ?? '[]');
//! cart.add({ id: 'p1', name: 'Roma Tomatoes', unitPrice: 300 }, 2);
//! localStorage.setItem('cart', cart.snapshot());
//!
//! console.log(compute_totals(cart.total_price()));
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use cart_core::{
    CartCommand, CartItem, CartState, CheckoutCalculator, CheckoutTotals, Currency,
    PricingConfig, ProductSnapshot,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Cart as handed to the UI
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CartView<'a> {
    items: &'a [CartItem],
    item_count: u64,
    totals: CheckoutTotals,
}

/// Client-side cart
#[wasm_bindgen]
#[derive(Debug)]
pub struct WasmCart {
    state: CartState,
    calculator: CheckoutCalculator,
}

#[wasm_bindgen]
impl WasmCart {
    /// Empty cart with default pricing
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        let mut state = CartState::new();
        state.initialize(Vec::new());
        Self {
            state,
            calculator: CheckoutCalculator::default(),
        }
    }

    /// Restore from a stored snapshot; unusable entries are dropped
    pub fn from_snapshot(raw: &str) -> Self {
        let mut state = CartState::new();
        state.initialize(cart_core::normalize_snapshot(raw));
        Self {
            state,
            calculator: CheckoutCalculator::default(),
        }
    }

    /// Override the pricing constants (`{free_shipping_threshold, flat_shipping_fee, tax_rate}`)
    pub fn set_pricing(&mut self, pricing: JsValue) -> Result<(), JsValue> {
        let pricing: PricingConfig = serde_wasm_bindgen::from_value(pricing)
            .map_err(|e| JsValue::from_str(&format!("Invalid pricing: {}", e)))?;
        self.calculator = CheckoutCalculator::new(pricing);
        Ok(())
    }

    /// Add a product snapshot; returns true if the cart changed
    pub fn add(&mut self, product: JsValue, quantity: i32) -> Result<bool, JsValue> {
        let product: ProductSnapshot = serde_wasm_bindgen::from_value(product)
            .map_err(|e| JsValue::from_str(&format!("Invalid product: {}", e)))?;
        Ok(self.add_product(product, quantity))
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.state.apply(CartCommand::Remove { id: id.to_string() })
    }

    /// Set a line's quantity; zero or less removes it
    pub fn set_quantity(&mut self, id: &str, quantity: i32) -> bool {
        self.state.apply(CartCommand::SetQuantity {
            id: id.to_string(),
            quantity: quantity.into(),
        })
    }

    pub fn clear(&mut self) -> bool {
        self.state.apply(CartCommand::Clear)
    }

    #[wasm_bindgen(getter)]
    pub fn item_count(&self) -> f64 {
        self.state.item_count() as f64
    }

    pub fn total_price(&self) -> f64 {
        self.state.total_price()
    }

    /// Items plus order summary
    pub fn view(&self) -> Result<JsValue, JsValue> {
        to_js(&self.cart_view())
    }

    /// Order summary for the current cart
    pub fn totals(&self) -> Result<JsValue, JsValue> {
        to_js(&self.calculator.compute_totals(self.state.total_price()))
    }

    /// Snapshot JSON for `localStorage`
    pub fn snapshot(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.state.items()).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

impl Default for WasmCart {
    fn default() -> Self {
        Self::new()
    }
}

impl WasmCart {
    fn add_product(&mut self, product: ProductSnapshot, quantity: i32) -> bool {
        self.state.apply(CartCommand::Add {
            product,
            quantity: quantity.into(),
        })
    }

    fn cart_view(&self) -> CartView<'_> {
        CartView {
            items: self.state.items(),
            item_count: self.state.item_count(),
            totals: self.calculator.compute_totals(self.state.total_price()),
        }
    }
}

/// Order summary for a subtotal with the default pricing
#[wasm_bindgen]
pub fn compute_totals(subtotal: f64) -> Result<JsValue, JsValue> {
    to_js(&cart_core::compute_totals(subtotal))
}

/// Normalize a stored cart snapshot into valid cart items
#[wasm_bindgen]
pub fn normalize_snapshot(raw: &str) -> Result<JsValue, JsValue> {
    to_js(&cart_core::normalize_snapshot(raw))
}

/// Format an amount with the currency symbol (e.g. `₦1500.00`)
#[wasm_bindgen]
pub fn format_amount(amount: f64, currency: &str) -> Result<String, JsValue> {
    let currency: Currency = currency.parse().map_err(|e: String| JsValue::from_str(&e))?;
    Ok(currency.format(amount))
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_merge() {
        let mut cart = WasmCart::new();
        assert!(cart.add_product(ProductSnapshot::new("p1", "Roma Tomatoes", 300.0), 2));
        assert!(cart.add_product(ProductSnapshot::new("p1", "Roma Tomatoes", 300.0), 3));

        assert_eq!(cart.item_count(), 5.0);
        assert_eq!(cart.total_price(), 1500.0);
        assert_eq!(cart.cart_view().items.len(), 1);
    }

    #[test]
    fn test_set_quantity_and_remove() {
        let mut cart = WasmCart::new();
        cart.add_product(ProductSnapshot::new("p1", "Okra", 150.0), 1);
        cart.add_product(ProductSnapshot::new("p2", "Yam", 800.0), 1);

        assert!(cart.set_quantity("p1", 4));
        assert_eq!(cart.total_price(), 1400.0);

        assert!(cart.set_quantity("p1", 0));
        assert!(!cart.remove("p1"));
        assert!(cart.remove("p2"));
        assert!(!cart.clear());
    }

    #[test]
    fn test_snapshot_restore() {
        let mut cart = WasmCart::new();
        cart.add_product(ProductSnapshot::new("p1", "Okra", 150.0), 3);

        let restored = WasmCart::from_snapshot(&cart.snapshot().unwrap());
        assert_eq!(restored.total_price(), 450.0);

        let corrupt = WasmCart::from_snapshot("not json");
        assert_eq!(corrupt.item_count(), 0.0);
    }

    #[test]
    fn test_view_totals() {
        let mut cart = WasmCart::new();
        cart.add_product(ProductSnapshot::new("p1", "Tomatoes", 400.0), 10);

        let view = cart.cart_view();
        assert_eq!(view.totals.subtotal, 4000.0);
        assert_eq!(view.totals.shipping, 500.0);
        assert_eq!(view.totals.total, 4900.0);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1500.0, "NGN").unwrap(), "₦1500.00");
        assert_eq!(format_amount(19.99, "usd").unwrap(), "$19.99");
    }
}
