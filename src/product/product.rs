//! Currency-pair metadata, exact rounding and quote conversions.

use rust_decimal::{Decimal, RoundingStrategy};

use super::currency::{Currency, Side};
use super::ProductError;

/// A spot trading pair with its exchange-imposed increments.
///
/// Immutable after construction. Prices are quoted in `quote_currency` per
/// unit of `base_currency`; every price the engine emits is a multiple of
/// `quote_increment` and every size a multiple of `base_min_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    product_id: String,
    quote_currency: Currency,
    base_currency: Currency,
    quote_increment: Decimal,
    base_min_size: Decimal,
}

impl Product {
    /// Build a product, validating its invariants.
    pub fn new(
        product_id: impl Into<String>,
        quote_currency: Currency,
        base_currency: Currency,
        quote_increment: Decimal,
        base_min_size: Decimal,
    ) -> Result<Self, ProductError> {
        if quote_currency == base_currency {
            return Err(ProductError::IdenticalCurrencies(quote_currency));
        }
        if quote_increment <= Decimal::ZERO {
            return Err(ProductError::NonPositiveIncrement(quote_increment));
        }
        if base_min_size <= Decimal::ZERO {
            return Err(ProductError::NonPositiveMinSize(base_min_size));
        }
        Ok(Self {
            product_id: product_id.into(),
            quote_currency,
            base_currency,
            quote_increment,
            base_min_size,
        })
    }

    /// The exchange product identifier, e.g. `BTC-USD`.
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Currency prices are quoted in.
    pub fn quote_currency(&self) -> Currency {
        self.quote_currency
    }

    /// Currency sizes are quoted in.
    pub fn base_currency(&self) -> Currency {
        self.base_currency
    }

    /// Smallest price step.
    pub fn quote_increment(&self) -> Decimal {
        self.quote_increment
    }

    /// Smallest tradable size.
    pub fn base_min_size(&self) -> Decimal {
        self.base_min_size
    }

    /// The unordered pair of currencies this product converts between.
    pub fn currency_set(&self) -> [Currency; 2] {
        [self.quote_currency, self.base_currency]
    }

    /// Whether `currency` is one of the pair.
    pub fn has_currency(&self, currency: Currency) -> bool {
        currency == self.quote_currency || currency == self.base_currency
    }

    /// Whether `{a, b}` equals this product's currency set.
    pub fn matches_pair(&self, a: Currency, b: Currency) -> bool {
        a != b && self.has_currency(a) && self.has_currency(b)
    }

    /// Currency spent when resting on `side`.
    pub fn source(&self, side: Side) -> Currency {
        match side {
            Side::Bid => self.quote_currency,
            Side::Ask => self.base_currency,
        }
    }

    /// Currency acquired when resting on `side`.
    pub fn destination(&self, side: Side) -> Currency {
        match side {
            Side::Bid => self.base_currency,
            Side::Ask => self.quote_currency,
        }
    }

    /// Side that converts `source` into `destination`, if this product does.
    pub fn side_from_direction(&self, source: Currency, destination: Currency) -> Option<Side> {
        if !self.matches_pair(source, destination) {
            return None;
        }
        Side::BOTH.into_iter().find(|side| self.source(*side) == source)
    }

    /// Round `price` to the nearest quote increment, banker's rounding.
    pub fn round_price(&self, price: Decimal) -> Decimal {
        quantize(price, self.quote_increment, RoundingStrategy::MidpointNearestEven)
    }

    /// One increment below the rounded `price`.
    pub fn lower_price(&self, price: Decimal) -> Decimal {
        self.round_price(price) - self.quote_increment
    }

    /// One increment above the rounded `price`.
    pub fn higher_price(&self, price: Decimal) -> Decimal {
        self.round_price(price) + self.quote_increment
    }

    /// Round `quantity` down to a multiple of the base min size. Always
    /// toward zero so a rounded order can never oversize.
    pub fn round_quantity(&self, quantity: Decimal) -> Decimal {
        quantize(quantity, self.base_min_size, RoundingStrategy::ToZero)
    }

    /// Express a product-quote price as a `currency`-denominated conversion
    /// rate: identity when `currency` is the quote, reciprocal otherwise.
    pub fn quote_to_currency_price(&self, currency: Currency, price: Decimal) -> Decimal {
        if currency == self.quote_currency {
            price
        } else {
            Decimal::ONE / price
        }
    }

    /// Convert a quantity of `currency` into product (base) quantity at
    /// `price`: identity when `currency` is the base, divide otherwise.
    pub fn quote_qty_from_currency_qty(
        &self,
        currency: Currency,
        quantity: Decimal,
        price: Decimal,
    ) -> Decimal {
        if currency == self.base_currency {
            quantity
        } else {
            quantity / price
        }
    }

    /// Convert a product (base) quantity into a quantity of `currency` at
    /// `price`: identity when `currency` is the base, multiply otherwise.
    pub fn currency_qty_from_quote_qty(
        &self,
        currency: Currency,
        quantity: Decimal,
        price: Decimal,
    ) -> Decimal {
        if currency == self.base_currency {
            quantity
        } else {
            quantity * price
        }
    }
}

/// Round `value` to a multiple of `increment` with the given strategy.
fn quantize(value: Decimal, increment: Decimal, strategy: RoundingStrategy) -> Decimal {
    (value / increment).round_dp_with_strategy(0, strategy) * increment
}
