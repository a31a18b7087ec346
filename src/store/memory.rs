//! In-process store, used when no database is configured and by tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Page, PlaceFilter, Store};
use crate::error::StoreError;
use crate::models::{Booking, Place, PlaceType, Slot, Visit, Visitor};

#[derive(Default)]
struct Tables {
    visitors: HashMap<String, Visitor>,
    place_types: Vec<PlaceType>,
    places: HashMap<String, Place>,
    slots: HashMap<String, Slot>,
    bookings: HashMap<String, Booking>,
}

/// Every operation takes the single lock, so conditional updates are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_place_types(vec![PlaceType {
            id: 0,
            name: "Other".to_string(),
        }])
    }

    pub fn with_place_types(place_types: Vec<PlaceType>) -> Self {
        Self {
            tables: Mutex::new(Tables {
                place_types,
                ..Tables::default()
            }),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_visitor(&self, visitor: &Visitor) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.visitors.contains_key(&visitor.id) {
            return Err(StoreError::Duplicate(format!("visitor {}", visitor.id)));
        }
        if let Some(telegram_id) = visitor.telegram_id {
            if tables
                .visitors
                .values()
                .any(|v| v.telegram_id == Some(telegram_id))
            {
                return Err(StoreError::Duplicate(format!("telegram id {telegram_id}")));
            }
        }
        tables.visitors.insert(visitor.id.clone(), visitor.clone());
        Ok(())
    }

    async fn find_visitor(&self, id: &str) -> Result<Option<Visitor>, StoreError> {
        Ok(self.tables.lock().await.visitors.get(id).cloned())
    }

    async fn find_visitor_by_telegram(
        &self,
        telegram_id: i64,
    ) -> Result<Option<Visitor>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .visitors
            .values()
            .find(|v| v.telegram_id == Some(telegram_id))
            .cloned())
    }

    async fn set_favourites(
        &self,
        visitor_id: &str,
        favourites: &[String],
    ) -> Result<(), StoreError> {
        if let Some(visitor) = self.tables.lock().await.visitors.get_mut(visitor_id) {
            visitor.favourites = favourites.to_vec();
        }
        Ok(())
    }

    async fn place_types(&self) -> Result<Vec<PlaceType>, StoreError> {
        Ok(self.tables.lock().await.place_types.clone())
    }

    async fn insert_place(&self, place: &Place) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.places.contains_key(&place.id) {
            return Err(StoreError::Duplicate(format!("place {}", place.id)));
        }
        tables.places.insert(place.id.clone(), place.clone());
        Ok(())
    }

    async fn find_place(&self, id: &str) -> Result<Option<Place>, StoreError> {
        Ok(self.tables.lock().await.places.get(id).cloned())
    }

    async fn find_places(
        &self,
        filter: &PlaceFilter,
        page: Page,
    ) -> Result<Vec<Place>, StoreError> {
        let tables = self.tables.lock().await;
        let mut places: Vec<&Place> = tables
            .places
            .values()
            .filter(|p| filter.matches(p))
            .collect();
        places.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(page.apply(places.into_iter().cloned()))
    }

    async fn update_place(&self, place: &Place) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(stored) = tables.places.get_mut(&place.id) {
            *stored = place.clone();
        }
        Ok(())
    }

    async fn set_place_approved(&self, id: &str, approved: bool) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.places.get_mut(id) {
            Some(place) => {
                place.approved = approved;
                true
            }
            None => false,
        })
    }

    async fn delete_place(&self, id: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.places.remove(id).is_none() {
            return Ok(false);
        }
        let slot_ids: Vec<String> = tables
            .slots
            .values()
            .filter(|s| s.place_id == id)
            .map(|s| s.id.clone())
            .collect();
        tables.slots.retain(|_, s| s.place_id != id);
        tables.bookings.retain(|_, b| !slot_ids.contains(&b.slot_id));
        Ok(true)
    }

    async fn insert_slot(&self, slot: &Slot) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.slots.contains_key(&slot.id) {
            return Err(StoreError::Duplicate(format!("slot {}", slot.id)));
        }
        tables.slots.insert(slot.id.clone(), slot.clone());
        Ok(())
    }

    async fn find_slot(&self, id: &str) -> Result<Option<Slot>, StoreError> {
        Ok(self.tables.lock().await.slots.get(id).cloned())
    }

    async fn place_slots(&self, place_id: &str, page: Page) -> Result<Vec<Slot>, StoreError> {
        let tables = self.tables.lock().await;
        let mut slots: Vec<&Slot> = tables
            .slots
            .values()
            .filter(|s| s.place_id == place_id)
            .collect();
        slots.sort_by(|a, b| a.starts.cmp(&b.starts).then_with(|| a.id.cmp(&b.id)));
        Ok(page.apply(slots.into_iter().cloned()))
    }

    async fn try_adjust_occupancy(
        &self,
        slot_id: &str,
        delta: i32,
    ) -> Result<Option<Slot>, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(slot) = tables.slots.get_mut(slot_id) else {
            return Ok(None);
        };
        let occupied = slot.occupied_slots + delta;
        if occupied < 0 || occupied > slot.max_visitors {
            return Ok(None);
        }
        slot.occupied_slots = occupied;
        Ok(Some(slot.clone()))
    }

    async fn release_occupancy(
        &self,
        slot_id: &str,
        amount: i32,
    ) -> Result<Option<Slot>, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.slots.get_mut(slot_id).map(|slot| {
            slot.occupied_slots = (slot.occupied_slots - amount).max(0);
            slot.clone()
        }))
    }

    async fn delete_slot(&self, id: &str) -> Result<Option<u64>, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.slots.remove(id).is_none() {
            return Ok(None);
        }
        let before = tables.bookings.len();
        tables.bookings.retain(|_, b| b.slot_id != id);
        Ok(Some((before - tables.bookings.len()) as u64))
    }

    async fn find_booking(
        &self,
        slot_id: &str,
        visitor_id: &str,
    ) -> Result<Option<Booking>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .bookings
            .values()
            .find(|b| b.slot_id == slot_id && b.visitor_id == visitor_id)
            .cloned())
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if tables
            .bookings
            .values()
            .any(|b| b.slot_id == booking.slot_id && b.visitor_id == booking.visitor_id)
        {
            return Err(StoreError::Duplicate(format!(
                "booking of {} on slot {}",
                booking.visitor_id, booking.slot_id
            )));
        }
        tables.bookings.insert(booking.id.clone(), booking.clone());
        Ok(())
    }

    async fn update_booking_headcount(
        &self,
        booking_id: &str,
        friends_number: i32,
    ) -> Result<(), StoreError> {
        match self.tables.lock().await.bookings.get_mut(booking_id) {
            Some(booking) => {
                booking.friends_number = friends_number;
                Ok(())
            }
            None => Err(StoreError::Query(format!("booking {booking_id} vanished"))),
        }
    }

    async fn delete_booking(
        &self,
        slot_id: &str,
        visitor_id: &str,
    ) -> Result<Option<Booking>, StoreError> {
        let mut tables = self.tables.lock().await;
        let id = tables
            .bookings
            .values()
            .find(|b| b.slot_id == slot_id && b.visitor_id == visitor_id)
            .map(|b| b.id.clone());
        Ok(id.and_then(|id| tables.bookings.remove(&id)))
    }

    async fn bookings_for_slots(&self, slot_ids: &[String]) -> Result<Vec<Booking>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .bookings
            .values()
            .filter(|b| slot_ids.contains(&b.slot_id))
            .cloned()
            .collect())
    }

    async fn visitor_visits(
        &self,
        visitor_id: &str,
        page: Option<Page>,
    ) -> Result<Vec<Visit>, StoreError> {
        let tables = self.tables.lock().await;
        let mut visits: Vec<Visit> = tables
            .bookings
            .values()
            .filter(|b| b.visitor_id == visitor_id)
            .filter_map(|b| {
                let slot = tables.slots.get(&b.slot_id)?;
                let place = tables.places.get(&slot.place_id)?;
                Some(Visit {
                    booking: b.clone(),
                    slot: slot.clone(),
                    place_name: place.name.clone(),
                })
            })
            .collect();
        visits.sort_by(|a, b| {
            a.slot
                .starts
                .cmp(&b.slot.starts)
                .then_with(|| a.booking.id.cmp(&b.booking.id))
        });
        Ok(match page {
            Some(page) => page.apply(visits.into_iter()),
            None => visits,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use time::PrimitiveDateTime;

    use super::MemoryStore;
    use crate::models::{new_id, Place, Slot, Visitor};
    use crate::store::Store;

    pub async fn seed_visitor(store: &MemoryStore) -> Visitor {
        let visitor = Visitor {
            id: new_id(),
            priority_id: 0,
            favourites: Vec::new(),
            telegram_id: None,
        };
        store.insert_visitor(&visitor).await.unwrap();
        visitor
    }

    pub async fn seed_place(store: &MemoryStore, creator_id: &str, name: &str) -> Place {
        let place = Place {
            id: new_id(),
            creator_id: creator_id.to_string(),
            name: name.to_string(),
            place_type_id: 0,
            description: format!("{name} description"),
            url: None,
            address: None,
            coordinates: None,
            image: None,
            approved: true,
        };
        store.insert_place(&place).await.unwrap();
        place
    }

    pub async fn seed_slot(
        store: &MemoryStore,
        place_id: &str,
        starts: PrimitiveDateTime,
        ends: PrimitiveDateTime,
        max_visitors: i32,
    ) -> Slot {
        let slot = Slot {
            id: new_id(),
            place_id: place_id.to_string(),
            type_id: 0,
            starts,
            ends,
            occupied_slots: 0,
            max_visitors,
        };
        store.insert_slot(&slot).await.unwrap();
        slot
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::fixtures::*;
    use super::*;

    #[tokio::test]
    async fn guarded_adjust_refuses_overbooking() {
        let store = MemoryStore::new();
        let visitor = seed_visitor(&store).await;
        let place = seed_place(&store, &visitor.id, "Gym").await;
        let slot = seed_slot(
            &store,
            &place.id,
            datetime!(2024-01-01 08:00),
            datetime!(2024-01-01 09:00),
            4,
        )
        .await;

        let taken = store.try_adjust_occupancy(&slot.id, 3).await.unwrap();
        assert_eq!(taken.map(|s| s.occupied_slots), Some(3));
        assert!(store.try_adjust_occupancy(&slot.id, 2).await.unwrap().is_none());
        assert!(store.try_adjust_occupancy(&slot.id, -4).await.unwrap().is_none());

        let slot = store.find_slot(&slot.id).await.unwrap().unwrap();
        assert_eq!(slot.occupied_slots, 3);
    }

    #[tokio::test]
    async fn release_clamps_at_zero() {
        let store = MemoryStore::new();
        let visitor = seed_visitor(&store).await;
        let place = seed_place(&store, &visitor.id, "Gym").await;
        let slot = seed_slot(
            &store,
            &place.id,
            datetime!(2024-01-01 08:00),
            datetime!(2024-01-01 09:00),
            4,
        )
        .await;
        store.try_adjust_occupancy(&slot.id, 1).await.unwrap();

        let released = store.release_occupancy(&slot.id, 5).await.unwrap().unwrap();
        assert_eq!(released.occupied_slots, 0);
    }

    #[tokio::test]
    async fn duplicate_booking_pair_is_rejected() {
        let store = MemoryStore::new();
        let booking = Booking {
            id: "a".to_string(),
            slot_id: "s".to_string(),
            visitor_id: "v".to_string(),
            friends_number: 1,
        };
        store.insert_booking(&booking).await.unwrap();

        let again = Booking {
            id: "b".to_string(),
            ..booking
        };
        let err = store.insert_booking(&again).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn deleting_a_place_cascades_to_slots_and_bookings() {
        let store = MemoryStore::new();
        let visitor = seed_visitor(&store).await;
        let place = seed_place(&store, &visitor.id, "Museum").await;
        let slot = seed_slot(
            &store,
            &place.id,
            datetime!(2024-01-01 08:00),
            datetime!(2024-01-01 09:00),
            4,
        )
        .await;
        store
            .insert_booking(&Booking {
                id: "b".to_string(),
                slot_id: slot.id.clone(),
                visitor_id: visitor.id.clone(),
                friends_number: 2,
            })
            .await
            .unwrap();

        assert!(store.delete_place(&place.id).await.unwrap());
        assert!(store.find_slot(&slot.id).await.unwrap().is_none());
        assert!(store.visitor_visits(&visitor.id, None).await.unwrap().is_empty());
    }
}
