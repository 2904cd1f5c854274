//! Stock movement calculator.
//!
//! Turns `(current quantity, movement type, raw amount, reason)` into a
//! validation result plus a preview of the level the backend is expected to
//! produce. Stateless: identical inputs always yield identical outputs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::movement::{DeltaIndicator, MovementEffect, MovementType};

/// Client-side rejection of a requested movement.
///
/// Reported before any network call; nothing here is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MovementError {
    /// The movement type is recorded by the backend only (e.g. INITIAL).
    #[error("{0} movements cannot be requested manually")]
    UnsupportedMovementType(MovementType),

    /// The amount is not an integer, or is below the type's minimum.
    #[error("{}", invalid_quantity_message(.minimum))]
    InvalidQuantity { minimum: u64 },

    /// Removing more than is on hand.
    #[error("Cannot remove {requested} items. Current stock is {available}")]
    InsufficientStock { requested: u64, available: u64 },

    /// The reason is empty after trimming.
    #[error("Please provide a reason for this stock movement")]
    MissingReason,
}

fn invalid_quantity_message(minimum: &u64) -> &'static str {
    if *minimum == 0 {
        "Please enter a valid stock level of 0 or more"
    } else {
        "Please enter a valid quantity greater than 0"
    }
}

/// Raw user input for the amount field.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RawAmount<'a> {
    Text(&'a str),
    Number(i64),
}

impl<'a> RawAmount<'a> {
    fn parse(self) -> Option<i64> {
        match self {
            RawAmount::Text(s) => s.trim().parse::<i64>().ok(),
            RawAmount::Number(n) => Some(n),
        }
    }
}

impl<'a> From<&'a str> for RawAmount<'a> {
    fn from(value: &'a str) -> Self {
        RawAmount::Text(value)
    }
}

impl From<i64> for RawAmount<'_> {
    fn from(value: i64) -> Self {
        RawAmount::Number(value)
    }
}

/// Input of one calculator invocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MovementRequest<'a> {
    pub current_quantity: u64,
    pub movement_type: MovementType,
    pub amount: RawAmount<'a>,
    pub reason: &'a str,
}

impl<'a> MovementRequest<'a> {
    pub fn new(
        current_quantity: u64,
        movement_type: MovementType,
        amount: impl Into<RawAmount<'a>>,
        reason: &'a str,
    ) -> Self {
        Self {
            current_quantity,
            movement_type,
            amount: amount.into(),
            reason,
        }
    }
}

/// A movement that passed every client-side rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedMovement {
    pub movement_type: MovementType,
    pub amount: u64,
    /// Trimmed reason.
    pub reason: String,
    pub previous_quantity: u64,
    pub new_quantity: u64,
}

impl ValidatedMovement {
    pub fn delta(&self) -> DeltaIndicator {
        self.movement_type.delta(self.amount)
    }
}

/// Outcome of [`calculate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementCalculation {
    pub validation: Result<ValidatedMovement, MovementError>,
    /// Non-authoritative estimate of the post-movement level.
    pub preview_quantity: u64,
    /// Present whenever the amount itself is acceptable.
    pub delta: Option<DeltaIndicator>,
}

impl MovementCalculation {
    pub fn is_valid(&self) -> bool {
        self.validation.is_ok()
    }
}

/// Resulting stock level for an accepted amount. Never negative.
pub fn resulting_quantity(current_quantity: u64, movement_type: MovementType, amount: u64) -> u64 {
    match movement_type.effect() {
        MovementEffect::Increase => current_quantity.saturating_add(amount),
        MovementEffect::Decrease => current_quantity.saturating_sub(amount),
        MovementEffect::SetLevel => amount,
    }
}

/// Rules 1 and 2: a usable amount that the stock on hand can cover.
fn checked_amount(request: &MovementRequest<'_>) -> Result<u64, MovementError> {
    let movement_type = request.movement_type;
    if !movement_type.is_user_initiated() {
        return Err(MovementError::UnsupportedMovementType(movement_type));
    }

    let minimum = movement_type.minimum_amount();
    let amount = request
        .amount
        .parse()
        .and_then(|n| u64::try_from(n).ok())
        .filter(|n| *n >= minimum)
        .ok_or(MovementError::InvalidQuantity { minimum })?;

    if movement_type.removes_stock() && amount > request.current_quantity {
        return Err(MovementError::InsufficientStock {
            requested: amount,
            available: request.current_quantity,
        });
    }

    Ok(amount)
}

/// Validate a request; the first failing rule wins.
pub fn validate(request: &MovementRequest<'_>) -> Result<ValidatedMovement, MovementError> {
    let amount = checked_amount(request)?;

    let reason = request.reason.trim();
    if reason.is_empty() {
        return Err(MovementError::MissingReason);
    }

    Ok(ValidatedMovement {
        movement_type: request.movement_type,
        amount,
        reason: reason.to_string(),
        previous_quantity: request.current_quantity,
        new_quantity: resulting_quantity(request.current_quantity, request.movement_type, amount),
    })
}

/// Preview level; falls back to the current quantity while the amount is unusable.
pub fn preview_quantity(request: &MovementRequest<'_>) -> u64 {
    match checked_amount(request) {
        Ok(amount) => resulting_quantity(request.current_quantity, request.movement_type, amount),
        Err(_) => request.current_quantity,
    }
}

/// Validation result, preview level and delta indicator in one call.
pub fn calculate(request: &MovementRequest<'_>) -> MovementCalculation {
    let amount = checked_amount(request);
    let preview_quantity = match amount {
        Ok(a) => resulting_quantity(request.current_quantity, request.movement_type, a),
        Err(_) => request.current_quantity,
    };

    MovementCalculation {
        validation: validate(request),
        preview_quantity,
        delta: amount.ok().map(|a| request.movement_type.delta(a)),
    }
}
