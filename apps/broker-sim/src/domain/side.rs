//! Order side (FIX tag 54).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of an order, FIX 4.2 value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Buy.
    Buy,
    /// Sell.
    Sell,
    /// Buy minus.
    BuyMinus,
    /// Sell plus.
    SellPlus,
    /// Sell short.
    SellShort,
    /// Sell short exempt.
    SellShortExempt,
    /// Cross.
    Cross,
    /// Cross short.
    CrossShort,
    /// Cross short exempt.
    CrossShortExempt,
}

impl Side {
    /// Parse a FIX tag 54 character.
    #[must_use]
    pub const fn from_fix_char(value: char) -> Option<Self> {
        match value {
            '1' => Some(Self::Buy),
            '2' => Some(Self::Sell),
            '3' => Some(Self::BuyMinus),
            '4' => Some(Self::SellPlus),
            '5' => Some(Self::SellShort),
            '6' => Some(Self::SellShortExempt),
            '7' => Some(Self::Cross),
            '8' => Some(Self::CrossShort),
            '9' => Some(Self::CrossShortExempt),
            _ => None,
        }
    }

    /// Get the FIX tag 54 value.
    #[must_use]
    pub const fn fix_tag_value(&self) -> char {
        match self {
            Self::Buy => '1',
            Self::Sell => '2',
            Self::BuyMinus => '3',
            Self::SellPlus => '4',
            Self::SellShort => '5',
            Self::SellShortExempt => '6',
            Self::Cross => '7',
            Self::CrossShort => '8',
            Self::CrossShortExempt => '9',
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
            Self::BuyMinus => write!(f, "BUY_MINUS"),
            Self::SellPlus => write!(f, "SELL_PLUS"),
            Self::SellShort => write!(f, "SELL_SHORT"),
            Self::SellShortExempt => write!(f, "SELL_SHORT_EXEMPT"),
            Self::Cross => write!(f, "CROSS"),
            Self::CrossShort => write!(f, "CROSS_SHORT"),
            Self::CrossShortExempt => write!(f, "CROSS_SHORT_EXEMPT"),
        }
    }
}
