use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use pantry_core::{DomainError, DomainResult, Entity, ItemId};

use crate::expiry::{self, Urgency};

/// Categories offered by item-entry screens.
///
/// The repository accepts any non-blank category; restricting input to this
/// list is up to the calling layer.
pub const SUGGESTED_CATEGORIES: [&str; 9] = [
    "Dairy",
    "Meat",
    "Vegetables",
    "Fruits",
    "Beverages",
    "Snacks",
    "Condiments",
    "Grains",
    "Other",
];

/// Caller-supplied data proposed for insertion.
///
/// A draft has no identity; the repository assigns `id` and `date_added`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    pub category: String,
    pub expiry_date: NaiveDateTime,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl ItemDraft {
    /// Draft with quantity 1.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        expiry_date: NaiveDateTime,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            expiry_date,
            quantity: default_quantity(),
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.category.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }
        if self.quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        Ok(())
    }
}

/// A tracked perishable item.
///
/// Items are immutable once created: the only way to change one is to remove
/// it and add a replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    id: ItemId,
    name: String,
    category: String,
    expiry_date: NaiveDateTime,
    quantity: u32,
    date_added: DateTime<Utc>,
}

impl InventoryItem {
    /// Build an item from a draft that has already passed `validate`.
    pub(crate) fn from_draft(id: ItemId, draft: ItemDraft, date_added: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            category: draft.category,
            expiry_date: draft.expiry_date,
            quantity: draft.quantity,
            date_added,
        }
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn expiry_date(&self) -> NaiveDateTime {
        self.expiry_date
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn date_added(&self) -> DateTime<Utc> {
        self.date_added
    }

    pub fn days_until_expiry(&self, now: NaiveDateTime) -> i64 {
        expiry::days_until(self.expiry_date, now)
    }

    pub fn urgency(&self, now: NaiveDateTime) -> Urgency {
        expiry::urgency_of(self.days_until_expiry(now))
    }
}

impl Entity for InventoryItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
