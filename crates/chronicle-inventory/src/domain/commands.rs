//! Commands for the inventory context.
//!
//! Every command carries [`CommandMetadata`]; its `aggregate_id` is the
//! inventory id and its `commit_id` is reused as the commit id of the save,
//! so a retried command is stored at most once.

use chronicle_core::command::{Command, CommandMetadata};
use uuid::Uuid;

/// Command to open a new inventory.
#[derive(Debug, Clone)]
pub struct OpenInventory {
    /// Identity and causal metadata.
    pub metadata: CommandMetadata,
    /// Who the inventory belongs to.
    pub owner: String,
}

/// Command to add an item to an inventory.
#[derive(Debug, Clone)]
pub struct AddItem {
    /// Identity and causal metadata.
    pub metadata: CommandMetadata,
    /// The item identifier.
    pub item_id: Uuid,
}

/// Command to remove an item from an inventory.
#[derive(Debug, Clone)]
pub struct RemoveItem {
    /// Identity and causal metadata.
    pub metadata: CommandMetadata,
    /// The item identifier.
    pub item_id: Uuid,
}

/// Command to equip an item.
#[derive(Debug, Clone)]
pub struct EquipItem {
    /// Identity and causal metadata.
    pub metadata: CommandMetadata,
    /// The item identifier.
    pub item_id: Uuid,
}

impl Command for OpenInventory {
    fn command_type(&self) -> &'static str {
        "inventory.open"
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }
}

impl Command for AddItem {
    fn command_type(&self) -> &'static str {
        "inventory.add_item"
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }
}

impl Command for RemoveItem {
    fn command_type(&self) -> &'static str {
        "inventory.remove_item"
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }
}

impl Command for EquipItem {
    fn command_type(&self) -> &'static str {
        "inventory.equip_item"
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }
}
