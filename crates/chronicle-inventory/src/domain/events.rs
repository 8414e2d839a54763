//! Domain events for the inventory context.

use chronicle_core::event::{Event, EventPayload, TypedEvent};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type tag for [`InventoryOpened`].
pub const INVENTORY_OPENED_EVENT_TYPE: &str = "inventory.opened";
/// Event type tag for [`ItemAdded`].
pub const ITEM_ADDED_EVENT_TYPE: &str = "inventory.item_added";
/// Event type tag for [`ItemRemoved`].
pub const ITEM_REMOVED_EVENT_TYPE: &str = "inventory.item_removed";
/// Event type tag for [`ItemEquipped`].
pub const ITEM_EQUIPPED_EVENT_TYPE: &str = "inventory.item_equipped";

/// Emitted when an inventory is opened for an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryOpened {
    /// The inventory identifier.
    pub inventory_id: Uuid,
    /// Who the inventory belongs to.
    pub owner: String,
}

/// Emitted when an item is added to an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    /// The inventory identifier.
    pub inventory_id: Uuid,
    /// The item identifier.
    pub item_id: Uuid,
}

/// Emitted when an item is removed from an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    /// The inventory identifier.
    pub inventory_id: Uuid,
    /// The item identifier.
    pub item_id: Uuid,
}

/// Emitted when an item is equipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEquipped {
    /// The inventory identifier.
    pub inventory_id: Uuid,
    /// The item identifier.
    pub item_id: Uuid,
}

/// Event payload variants for the inventory context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEventKind {
    /// The inventory has been opened.
    InventoryOpened(InventoryOpened),
    /// An item has been added to the inventory.
    ItemAdded(ItemAdded),
    /// An item has been removed from the inventory.
    ItemRemoved(ItemRemoved),
    /// An item has been equipped.
    ItemEquipped(ItemEquipped),
}

impl InventoryEventKind {
    /// Returns the item this event touches, if any.
    #[must_use]
    pub fn item_id(&self) -> Option<Uuid> {
        match self {
            Self::InventoryOpened(_) => None,
            Self::ItemAdded(e) => Some(e.item_id),
            Self::ItemRemoved(e) => Some(e.item_id),
            Self::ItemEquipped(e) => Some(e.item_id),
        }
    }
}

impl EventPayload for InventoryEventKind {
    fn event_type(&self) -> &'static str {
        match self {
            Self::InventoryOpened(_) => INVENTORY_OPENED_EVENT_TYPE,
            Self::ItemAdded(_) => ITEM_ADDED_EVENT_TYPE,
            Self::ItemRemoved(_) => ITEM_REMOVED_EVENT_TYPE,
            Self::ItemEquipped(_) => ITEM_EQUIPPED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the inventory context.
pub type InventoryEvent = Event<InventoryEventKind>;

impl TypedEvent<InventoryEventKind> for InventoryOpened {
    const EVENT_TYPE: &'static str = INVENTORY_OPENED_EVENT_TYPE;

    fn project(payload: &InventoryEventKind) -> Option<&Self> {
        match payload {
            InventoryEventKind::InventoryOpened(e) => Some(e),
            _ => None,
        }
    }
}

impl TypedEvent<InventoryEventKind> for ItemAdded {
    const EVENT_TYPE: &'static str = ITEM_ADDED_EVENT_TYPE;

    fn project(payload: &InventoryEventKind) -> Option<&Self> {
        match payload {
            InventoryEventKind::ItemAdded(e) => Some(e),
            _ => None,
        }
    }
}

impl TypedEvent<InventoryEventKind> for ItemRemoved {
    const EVENT_TYPE: &'static str = ITEM_REMOVED_EVENT_TYPE;

    fn project(payload: &InventoryEventKind) -> Option<&Self> {
        match payload {
            InventoryEventKind::ItemRemoved(e) => Some(e),
            _ => None,
        }
    }
}
