//! Item store module
//!
//! Owns item identity and the create/read/update/delete contract. Two
//! backends implement the same trait: an in-process collection and a
//! SQLite-backed document collection. Callers never see which one they
//! are talking to.

pub mod document;
pub mod memory;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered inventory item. Serializes to the wire shape
/// `{"id", "name", "description", "photoUrl"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "photoUrl")]
    pub photo_url: Option<String>,
}

/// Fields accepted when registering a new item.
#[derive(Debug, Clone, Default)]
pub struct ItemDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub photo_url: Option<String>,
}

/// Partial update: only fields present here overwrite stored values.
/// `None` means "leave unchanged", which is distinct from an explicit
/// empty string.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub photo_url: Option<String>,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Store error taxonomy. `EmptyName` maps to 400, `NotFound` to 404,
/// `Backend` to 500 with the message surfaced verbatim.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Inventory name is required")]
    EmptyName,
    #[error("Item not found")]
    NotFound,
    #[error("{0}")]
    Backend(String),
}

/// Uniform interface over both persistence backends.
///
/// Every operation is synchronous from the caller's perspective; each
/// backend serializes mutations under a single lock so no lost update or
/// duplicate id can occur.
pub trait ItemStore: Send + Sync {
    /// Validate the draft, mint a unique id and append the record.
    fn create(&self, draft: ItemDraft) -> StoreResult<Item>;

    /// Snapshot of every stored item. Insertion order is preserved only
    /// by the in-memory backend and is not contractual.
    fn list(&self) -> StoreResult<Vec<Item>>;

    /// Exact match on `id`.
    fn get(&self, id: &str) -> StoreResult<Item>;

    /// Partial update; returns the full post-update record.
    fn update(&self, id: &str, patch: ItemPatch) -> StoreResult<Item>;

    /// Remove the record entirely. Deleting an absent id is `NotFound`,
    /// not success.
    fn delete(&self, id: &str) -> StoreResult<()>;
}

/// Validate a draft and turn it into a stored item with a fresh id.
///
/// Shared by both backends so the identity and validation rules cannot
/// drift between them.
fn materialize(draft: ItemDraft) -> StoreResult<Item> {
    let name = match draft.name {
        Some(n) if !n.is_empty() => n,
        _ => return Err(StoreError::EmptyName),
    };

    Ok(Item {
        id: Uuid::new_v4().to_string(),
        name,
        description: draft.description.unwrap_or_default(),
        photo_url: draft.photo_url,
    })
}

/// Apply a patch to an existing item, enforcing the non-empty-name
/// invariant on the write path.
fn apply_patch(item: &mut Item, patch: ItemPatch) -> StoreResult<()> {
    if let Some(name) = patch.name {
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        item.name = name;
    }
    if let Some(description) = patch.description {
        item.description = description;
    }
    if let Some(photo_url) = patch.photo_url {
        item.photo_url = Some(photo_url);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_wire_shape() {
        let item = Item {
            id: "abc".to_string(),
            name: "Drill".to_string(),
            description: String::new(),
            photo_url: None,
        };
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "id": "abc",
                "name": "Drill",
                "description": "",
                "photoUrl": null
            })
        );
    }

    #[test]
    fn test_materialize_requires_name() {
        assert!(matches!(
            materialize(ItemDraft::default()),
            Err(StoreError::EmptyName)
        ));
        assert!(matches!(
            materialize(ItemDraft {
                name: Some(String::new()),
                ..ItemDraft::default()
            }),
            Err(StoreError::EmptyName)
        ));
    }

    #[test]
    fn test_materialize_defaults_description() {
        let item = materialize(ItemDraft {
            name: Some("Drill".to_string()),
            ..ItemDraft::default()
        })
        .expect("valid draft");
        assert_eq!(item.description, "");
        assert_eq!(item.photo_url, None);
        assert!(!item.id.is_empty());
    }

    #[test]
    fn test_materialize_ids_unique() {
        let draft = || ItemDraft {
            name: Some("Drill".to_string()),
            ..ItemDraft::default()
        };
        let a = materialize(draft()).expect("valid draft");
        let b = materialize(draft()).expect("valid draft");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_patch_only_touches_present_fields() {
        let mut item = Item {
            id: "abc".to_string(),
            name: "Drill".to_string(),
            description: "Old".to_string(),
            photo_url: Some("/photos/a.png".to_string()),
        };
        apply_patch(
            &mut item,
            ItemPatch {
                description: Some("Cordless".to_string()),
                ..ItemPatch::default()
            },
        )
        .expect("patch applies");
        assert_eq!(item.name, "Drill");
        assert_eq!(item.description, "Cordless");
        assert_eq!(item.photo_url.as_deref(), Some("/photos/a.png"));
    }

    #[test]
    fn test_patch_rejects_empty_name() {
        let mut item = Item {
            id: "abc".to_string(),
            name: "Drill".to_string(),
            description: String::new(),
            photo_url: None,
        };
        assert!(matches!(
            apply_patch(
                &mut item,
                ItemPatch {
                    name: Some(String::new()),
                    ..ItemPatch::default()
                }
            ),
            Err(StoreError::EmptyName)
        ));
        assert_eq!(item.name, "Drill");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StoreError::EmptyName.to_string(),
            "Inventory name is required"
        );
        assert_eq!(StoreError::NotFound.to_string(), "Item not found");
        assert_eq!(
            StoreError::Backend("disk on fire".to_string()).to_string(),
            "disk on fire"
        );
    }
}
