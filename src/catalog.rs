//! Read-only reference data: slot types compiled in, place types loaded once.

use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::models::PlaceType;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotType {
    pub id: i32,
    pub name: &'static str,
}

pub const SLOT_TYPES: &[SlotType] = &[
    SlotType { id: 0, name: "Open" },
    SlotType { id: 1, name: "Reserved" },
    SlotType { id: 2, name: "Guided" },
    SlotType { id: 3, name: "Event" },
];

pub fn slot_type(id: i32) -> Option<&'static SlotType> {
    SLOT_TYPES.iter().find(|t| t.id == id)
}

pub fn slot_type_by_name(name: &str) -> Option<&'static SlotType> {
    let name = name.trim();
    SLOT_TYPES.iter().find(|t| t.name.eq_ignore_ascii_case(name))
}

pub fn slot_type_name(id: i32) -> &'static str {
    slot_type(id).map_or("Unknown", |t| t.name)
}

/// Place types as read at startup. Never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    place_types: BTreeMap<i32, String>,
}

impl Catalog {
    pub fn new(place_types: Vec<PlaceType>) -> Self {
        Self {
            place_types: place_types.into_iter().map(|t| (t.id, t.name)).collect(),
        }
    }

    pub async fn load(store: &dyn Store) -> Result<Self, StoreError> {
        let types = store.place_types().await?;
        info!("loaded {} place types", types.len());
        Ok(Self::new(types))
    }

    pub fn place_type_name(&self, id: i32) -> Option<&str> {
        self.place_types.get(&id).map(String::as_str)
    }

    pub fn has_place_type(&self, id: i32) -> bool {
        self.place_types.contains_key(&id)
    }

    pub fn place_types(&self) -> Vec<PlaceType> {
        self.place_types
            .iter()
            .map(|(id, name)| PlaceType {
                id: *id,
                name: name.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn slot_types_resolve_both_ways() {
        assert_eq!(slot_type_name(2), "Guided");
        assert_eq!(slot_type_by_name(" event ").map(|t| t.id), Some(3));
        assert!(slot_type_by_name("party").is_none());
        assert_eq!(slot_type_name(42), "Unknown");
    }

    #[tokio::test]
    async fn loads_place_types_from_the_store() {
        let store = MemoryStore::with_place_types(vec![
            PlaceType {
                id: 2,
                name: "Gym".to_string(),
            },
            PlaceType {
                id: 1,
                name: "Library".to_string(),
            },
        ]);

        let catalog = Catalog::load(&store).await.unwrap();

        assert_eq!(catalog.place_type_name(1), Some("Library"));
        assert!(!catalog.has_place_type(7));
        let ids: Vec<i32> = catalog.place_types().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
