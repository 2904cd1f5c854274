//! Movement types and their effect on stock.
//!
//! Every consumer (preview, history rendering, CSV labels) reads from this one
//! table.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockflow_core::DomainError;

/// Why a stock quantity changed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    /// Inbound receipt.
    StockIn,
    /// Outbound sale or consumption.
    StockOut,
    /// Manual correction; the amount is the target level.
    Adjustment,
    /// Customer return.
    Return,
    /// Loss or damage.
    Loss,
    /// Initial seeding when a product is created. Backend-only.
    Initial,
}

/// How a movement type maps an amount onto the current quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MovementEffect {
    /// `current + amount`
    Increase,
    /// `max(0, current - amount)`
    Decrease,
    /// `amount` (absolute level)
    SetLevel,
}

impl MovementType {
    pub const ALL: [MovementType; 6] = [
        MovementType::StockIn,
        MovementType::StockOut,
        MovementType::Adjustment,
        MovementType::Return,
        MovementType::Loss,
        MovementType::Initial,
    ];

    /// Types a user may request through the movement form.
    pub const USER_INITIATED: [MovementType; 5] = [
        MovementType::StockIn,
        MovementType::StockOut,
        MovementType::Adjustment,
        MovementType::Return,
        MovementType::Loss,
    ];

    pub fn effect(self) -> MovementEffect {
        match self {
            MovementType::StockIn | MovementType::Return => MovementEffect::Increase,
            MovementType::StockOut | MovementType::Loss => MovementEffect::Decrease,
            MovementType::Adjustment | MovementType::Initial => MovementEffect::SetLevel,
        }
    }

    /// Human-readable label (history rows, CSV export).
    pub fn label(self) -> &'static str {
        match self {
            MovementType::StockIn => "Stock In",
            MovementType::StockOut => "Stock Out",
            MovementType::Adjustment => "Adjustment",
            MovementType::Return => "Return",
            MovementType::Loss => "Loss",
            MovementType::Initial => "Initial",
        }
    }

    /// Wire name, as the backend spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            MovementType::StockIn => "STOCK_IN",
            MovementType::StockOut => "STOCK_OUT",
            MovementType::Adjustment => "ADJUSTMENT",
            MovementType::Return => "RETURN",
            MovementType::Loss => "LOSS",
            MovementType::Initial => "INITIAL",
        }
    }

    pub fn is_user_initiated(self) -> bool {
        self != MovementType::Initial
    }

    /// Smallest accepted amount for a user-entered movement.
    pub fn minimum_amount(self) -> u64 {
        match self.effect() {
            MovementEffect::SetLevel => 0,
            MovementEffect::Increase | MovementEffect::Decrease => 1,
        }
    }

    /// Whether the requested amount is bounded by the stock on hand.
    pub fn removes_stock(self) -> bool {
        self.effect() == MovementEffect::Decrease
    }

    /// Signed display of `amount` for this movement type.
    pub fn delta(self, amount: u64) -> DeltaIndicator {
        match self.effect() {
            MovementEffect::Increase => DeltaIndicator::Increase(amount),
            MovementEffect::Decrease => DeltaIndicator::Decrease(amount),
            MovementEffect::SetLevel => DeltaIndicator::SetTo(amount),
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = DomainError;

    /// Accepts wire names and their kebab/lowercase spellings (`stock-in`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        MovementType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| {
                DomainError::unknown_value(
                    "movement type",
                    s,
                    "STOCK_IN, STOCK_OUT, ADJUSTMENT, RETURN, LOSS, INITIAL",
                )
            })
    }
}

/// Display form of a movement's quantity change.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeltaIndicator {
    Increase(u64),
    Decrease(u64),
    /// No implied direction; the amount is the resulting level.
    SetTo(u64),
}

impl DeltaIndicator {
    pub fn amount(self) -> u64 {
        match self {
            DeltaIndicator::Increase(n) | DeltaIndicator::Decrease(n) | DeltaIndicator::SetTo(n) => n,
        }
    }

    /// Target level, only known for absolute movements.
    pub fn target_level(self) -> Option<u64> {
        match self {
            DeltaIndicator::SetTo(n) => Some(n),
            _ => None,
        }
    }
}

impl core::fmt::Display for DeltaIndicator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DeltaIndicator::Increase(n) => write!(f, "+{n}"),
            DeltaIndicator::Decrease(n) => write!(f, "-{n}"),
            DeltaIndicator::SetTo(n) => write!(f, "±{n}"),
        }
    }
}
