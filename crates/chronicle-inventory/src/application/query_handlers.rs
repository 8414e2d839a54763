//! Query handlers for the inventory context.
//!
//! This module contains query handlers that reconstitute aggregates through
//! the repository and return read-only view DTOs.

use chronicle_core::aggregate::AggregateRoot;
use chronicle_core::error::DomainError;
use chronicle_core::repository::Repository;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::Inventory;

/// Read-only view of an inventory aggregate.
#[derive(Debug, Serialize)]
pub struct InventoryView {
    /// The inventory identifier.
    pub inventory_id: Uuid,
    /// Who the inventory belongs to.
    pub owner: Option<String>,
    /// Items currently in the inventory (sorted for determinism).
    pub items: Vec<Uuid>,
    /// Items currently equipped (sorted for determinism).
    pub equipped: Vec<Uuid>,
    /// Version the view reflects.
    pub version: i64,
}

impl From<&Inventory> for InventoryView {
    fn from(inventory: &Inventory) -> Self {
        let state = inventory.state();
        Self {
            inventory_id: inventory.id(),
            owner: state.owner.clone(),
            items: state.items.iter().copied().collect(),
            equipped: state.equipped.iter().copied().collect(),
            version: inventory.version(),
        }
    }
}

/// Retrieves an inventory by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub async fn get_inventory_by_id(
    inventory_id: Uuid,
    repo: &Repository<Inventory>,
) -> Result<InventoryView, DomainError> {
    let inventory = repo.get_by_id(inventory_id).await?;
    Ok(InventoryView::from(&inventory))
}

/// Retrieves an inventory as it was at `version`.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist at or below
/// `version`.
pub async fn get_inventory_at_version(
    inventory_id: Uuid,
    version: i64,
    repo: &Repository<Inventory>,
) -> Result<InventoryView, DomainError> {
    let inventory = repo.get_by_id_at(inventory_id, version).await?;
    Ok(InventoryView::from(&inventory))
}
