//! Currency and side enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ProductError;

/// Currencies the engine trades.
///
/// The declaration order is a volatility rank and is load-bearing: cycle
/// canonicalization rotates the greatest currency to the front, so the
/// reference quote (the stablecoin) must sort last. New currencies slot in
/// below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Litecoin
    LTC,
    /// Ether
    ETH,
    /// Bitcoin
    BTC,
    /// US dollar, the reference quote
    USD,
}

impl Currency {
    /// All known currencies in volatility-rank order.
    pub const ALL: [Currency; 4] = [Currency::LTC, Currency::ETH, Currency::BTC, Currency::USD];
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Currency::LTC => "LTC",
            Currency::ETH => "ETH",
            Currency::BTC => "BTC",
            Currency::USD => "USD",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Currency {
    type Err = ProductError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LTC" => Ok(Currency::LTC),
            "ETH" => Ok(Currency::ETH),
            "BTC" => Ok(Currency::BTC),
            "USD" => Ok(Currency::USD),
            other => Err(ProductError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Order book side.
///
/// A bid spends the product's quote currency to acquire base; an ask spends
/// base to acquire quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy side
    Bid,
    /// Sell side
    Ask,
}

impl Side {
    /// Both sides, bid first.
    pub const BOTH: [Side; 2] = [Side::Bid, Side::Ask];

    /// The opposing side.
    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volatility_rank_orders_stablecoin_last() {
        assert!(Currency::LTC < Currency::ETH);
        assert!(Currency::ETH < Currency::BTC);
        assert!(Currency::BTC < Currency::USD);
        assert_eq!(Currency::ALL.iter().max(), Some(&Currency::USD));
    }

    #[test]
    fn currency_round_trips_through_str() {
        for currency in Currency::ALL {
            assert_eq!(currency.to_string().parse::<Currency>().unwrap(), currency);
        }
        assert!("GBP".parse::<Currency>().is_err());
    }

    #[test]
    fn side_opposite() {
        assert_eq!(Side::Bid.opposite(), Side::Ask);
        assert_eq!(Side::Ask.opposite(), Side::Bid);
    }
}
