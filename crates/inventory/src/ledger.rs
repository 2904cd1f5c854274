use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::{MovementId, ProductId};

use crate::calculator::{ValidatedMovement, resulting_quantity};
use crate::movement::{DeltaIndicator, MovementType};

/// A recorded stock movement (backend-owned ledger entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: String,
    pub movement_type: MovementType,
    pub quantity: u64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub previous_quantity: Option<u64>,
    #[serde(default)]
    pub new_quantity: Option<u64>,
    #[serde(default, alias = "username")]
    pub created_by: String,
    #[serde(alias = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn delta(&self) -> DeltaIndicator {
        self.movement_type.delta(self.quantity)
    }

    /// Whether `newQuantity` agrees with the movement rules applied to
    /// `previousQuantity`. Entries lacking either side are not judged.
    pub fn is_consistent(&self) -> bool {
        match (self.previous_quantity, self.new_quantity) {
            (Some(previous), Some(new)) => {
                resulting_quantity(previous, self.movement_type, self.quantity) == new
            }
            _ => true,
        }
    }
}

/// Body of `POST /stock/movement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStockMovement {
    pub product_id: ProductId,
    pub quantity: u64,
    pub movement_type: MovementType,
    pub reason: String,
}

impl NewStockMovement {
    pub fn from_validated(product_id: ProductId, movement: &ValidatedMovement) -> Self {
        Self {
            product_id,
            quantity: movement.amount,
            movement_type: movement.movement_type,
            reason: movement.reason.clone(),
        }
    }
}
