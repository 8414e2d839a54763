//! Command handlers for the inventory context.
//!
//! Each handler loads the aggregate through the repository, runs the
//! business method and saves under the command's commit id. Concurrency
//! errors are returned as-is; the caller decides whether to retry.

use chronicle_core::clock::Clock;
use chronicle_core::command::Command;
use chronicle_core::error::DomainError;
use chronicle_core::repository::{CommitReceipt, Repository};
use chronicle_core::store::StoredEvent;
use uuid::Uuid;

use crate::domain::aggregates::Inventory;
use crate::domain::commands::{AddItem, EquipItem, OpenInventory, RemoveItem};

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct InventoryCommandResult {
    /// The aggregate ID affected by the command.
    pub aggregate_id: Uuid,
    /// The aggregate version after the command.
    pub version: i64,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

impl From<CommitReceipt> for InventoryCommandResult {
    fn from(receipt: CommitReceipt) -> Self {
        Self {
            aggregate_id: receipt.aggregate_id,
            version: receipt.committed_version,
            stored_events: receipt.events,
        }
    }
}

/// Handles the `OpenInventory` command: creates the aggregate through its
/// factory and persists the creation event.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a blank owner and
/// `DomainError::ConflictingCommand` if the inventory already exists.
#[tracing::instrument(
    skip_all,
    fields(command = command.command_type(), inventory_id = %command.metadata.aggregate_id)
)]
pub async fn handle_open_inventory(
    command: &OpenInventory,
    clock: &dyn Clock,
    repo: &Repository<Inventory>,
) -> Result<InventoryCommandResult, DomainError> {
    let mut inventory = Inventory::open(&command.owner, &command.metadata, clock)?;
    let receipt = repo.save(&mut inventory, command.metadata.commit_id).await?;
    Ok(receipt.into())
}

/// Handles the `AddItem` command: loads the aggregate, adds the item, and
/// persists the resulting events.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation or saving fails.
#[tracing::instrument(
    skip_all,
    fields(command = command.command_type(), inventory_id = %command.metadata.aggregate_id)
)]
pub async fn handle_add_item(
    command: &AddItem,
    clock: &dyn Clock,
    repo: &Repository<Inventory>,
) -> Result<InventoryCommandResult, DomainError> {
    let mut inventory = repo.get_by_id(command.metadata.aggregate_id).await?;
    inventory.add_item(command.item_id, &command.metadata, clock)?;
    let receipt = repo.save(&mut inventory, command.metadata.commit_id).await?;
    Ok(receipt.into())
}

/// Handles the `RemoveItem` command: loads the aggregate, removes the item,
/// and persists the resulting events.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation or saving fails.
#[tracing::instrument(
    skip_all,
    fields(command = command.command_type(), inventory_id = %command.metadata.aggregate_id)
)]
pub async fn handle_remove_item(
    command: &RemoveItem,
    clock: &dyn Clock,
    repo: &Repository<Inventory>,
) -> Result<InventoryCommandResult, DomainError> {
    let mut inventory = repo.get_by_id(command.metadata.aggregate_id).await?;
    inventory.remove_item(command.item_id, &command.metadata, clock)?;
    let receipt = repo.save(&mut inventory, command.metadata.commit_id).await?;
    Ok(receipt.into())
}

/// Handles the `EquipItem` command: loads the aggregate, equips the item,
/// and persists the resulting events.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation or saving fails.
#[tracing::instrument(
    skip_all,
    fields(command = command.command_type(), inventory_id = %command.metadata.aggregate_id)
)]
pub async fn handle_equip_item(
    command: &EquipItem,
    clock: &dyn Clock,
    repo: &Repository<Inventory>,
) -> Result<InventoryCommandResult, DomainError> {
    let mut inventory = repo.get_by_id(command.metadata.aggregate_id).await?;
    inventory.equip_item(command.item_id, &command.metadata, clock)?;
    let receipt = repo.save(&mut inventory, command.metadata.commit_id).await?;
    Ok(receipt.into())
}
