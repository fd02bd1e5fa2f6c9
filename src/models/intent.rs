use super::metadata::SessionMetadata;

/// Title recorded in metadata for cart checkouts.
pub const CART_TITLE: &str = "Multiple Items";

/// One animation on its way to the checkout page.
///
/// Title and price are optional on purpose: the provider validates them and
/// its message is what the buyer sees.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentLine {
    pub animation_id: String,
    pub title: Option<String>,
    pub unit_price: Option<f64>,
}

impl IntentLine {
    /// Unit price in minor currency units (cents).
    pub fn unit_amount(&self) -> Option<i64> {
        self.unit_price.map(to_minor_units)
    }
}

/// What the buyer asked to pay for. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseIntent {
    Single(IntentLine),
    /// Non-empty, in the order the buyer added items.
    Cart(Vec<IntentLine>),
}

impl PurchaseIntent {
    /// Build an intent from the storefront's loose request shape.
    ///
    /// A non-empty cart takes precedence over single-item fields.
    pub fn select(single: Option<IntentLine>, cart: Vec<IntentLine>) -> Option<Self> {
        if !cart.is_empty() {
            Some(PurchaseIntent::Cart(cart))
        } else {
            single.map(PurchaseIntent::Single)
        }
    }

    pub fn lines(&self) -> &[IntentLine] {
        match self {
            PurchaseIntent::Single(line) => std::slice::from_ref(line),
            PurchaseIntent::Cart(lines) => lines,
        }
    }

    pub fn metadata(&self) -> SessionMetadata {
        match self {
            PurchaseIntent::Single(line) => SessionMetadata::Single {
                animation_id: line.animation_id.clone(),
                animation_title: line.title.clone(),
            },
            PurchaseIntent::Cart(lines) => SessionMetadata::Cart {
                animation_ids: lines.iter().map(|l| l.animation_id.clone()).collect(),
                animation_title: Some(CART_TITLE.to_string()),
            },
        }
    }
}

/// `round(price * 100)`, rounding half away from zero.
pub fn to_minor_units(price: f64) -> i64 {
    (price * 100.0).round() as i64
}
