//! User actions: local checks first, then a single backend call.
//!
//! Every action authorizes against the current viewer and validates its input
//! before touching the network; a client-side failure never sends a request.

use stockflow_auth::{Capability, authorize};
use stockflow_core::ProductId;
use stockflow_inventory::{MovementType, MovementRequest, NewStockMovement, RawAmount, StockMovement, validate};
use stockflow_products::{Product, ProductDraft};

use crate::api::ApiClient;
use crate::error::ClientError;

/// Record a stock movement against `product`.
///
/// The movement is checked against the product's current quantity; on
/// success the backend's movement (with its authoritative `newQuantity`) is
/// returned.
pub async fn submit_movement(
    api: &ApiClient,
    product: &Product,
    movement_type: MovementType,
    amount: RawAmount<'_>,
    reason: &str,
) -> Result<StockMovement, ClientError> {
    authorize(&api.viewer().await, Capability::MoveStock)?;

    let request = MovementRequest::new(product.current_quantity, movement_type, amount, reason);
    let validated = validate(&request).inspect_err(|e| {
        tracing::debug!(product_id = %product.id, "movement rejected locally: {}", e);
    })?;

    let body = NewStockMovement::from_validated(product.id, &validated);
    let recorded = api.record_movement(&body).await?;

    if recorded.new_quantity != Some(validated.new_quantity) {
        tracing::info!(
            product_id = %product.id,
            expected = validated.new_quantity,
            actual = ?recorded.new_quantity,
            "backend quantity differs from local preview"
        );
    }
    tracing::info!(
        product_id = %product.id,
        movement_type = %movement_type,
        quantity = validated.amount,
        "stock movement recorded"
    );
    Ok(recorded)
}

pub async fn create_product(api: &ApiClient, draft: &ProductDraft) -> Result<Product, ClientError> {
    authorize(&api.viewer().await, Capability::ManageProducts)?;
    draft.validate()?;
    let product = api.create_product(draft).await?;
    tracing::info!(product_id = %product.id, "product created");
    Ok(product)
}

pub async fn update_product(
    api: &ApiClient,
    id: ProductId,
    draft: &ProductDraft,
) -> Result<Product, ClientError> {
    authorize(&api.viewer().await, Capability::ManageProducts)?;
    draft.validate()?;
    let product = api.update_product(id, draft).await?;
    tracing::info!(product_id = %id, "product updated");
    Ok(product)
}

pub async fn delete_product(api: &ApiClient, id: ProductId) -> Result<(), ClientError> {
    authorize(&api.viewer().await, Capability::ManageProducts)?;
    api.delete_product(id).await?;
    tracing::info!(product_id = %id, "product deleted");
    Ok(())
}

/// Movement history for the history screen.
pub async fn load_history(
    api: &ApiClient,
    product: Option<ProductId>,
    limit: Option<u32>,
) -> Result<Vec<StockMovement>, ClientError> {
    authorize(&api.viewer().await, Capability::ViewHistory)?;
    let movements = match product {
        Some(id) => api.product_movements(id).await?,
        None => api.recent_movements(limit).await?,
    };
    Ok(movements)
}
