//! Persistence port and its adapters.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Booking, Place, PlaceType, Slot, Visit, Visitor};

pub mod memory;
pub mod postgres;

/// Skip/limit window over a sorted result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    pub const fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }

    fn apply<T>(&self, items: impl Iterator<Item = T>) -> Vec<T> {
        items
            .skip(self.skip.max(0) as usize)
            .take(self.limit.max(0) as usize)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceFilter {
    pub type_id: Option<i32>,
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
    pub approved: Option<bool>,
    pub creator_id: Option<String>,
    /// Restrict to this id set.
    pub ids: Option<Vec<String>>,
}

impl PlaceFilter {
    pub fn matches(&self, place: &Place) -> bool {
        if self.type_id.is_some_and(|id| id != place.place_type_id) {
            return false;
        }
        if let Some(name) = &self.name {
            if !place.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        if self.approved.is_some_and(|approved| approved != place.approved) {
            return false;
        }
        if let Some(creator) = &self.creator_id {
            if creator != &place.creator_id {
                return false;
            }
        }
        if let Some(ids) = &self.ids {
            if !ids.contains(&place.id) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_visitor(&self, visitor: &Visitor) -> Result<(), StoreError>;
    async fn find_visitor(&self, id: &str) -> Result<Option<Visitor>, StoreError>;
    async fn find_visitor_by_telegram(
        &self,
        telegram_id: i64,
    ) -> Result<Option<Visitor>, StoreError>;
    async fn set_favourites(&self, visitor_id: &str, favourites: &[String])
        -> Result<(), StoreError>;

    async fn place_types(&self) -> Result<Vec<PlaceType>, StoreError>;

    async fn insert_place(&self, place: &Place) -> Result<(), StoreError>;
    async fn find_place(&self, id: &str) -> Result<Option<Place>, StoreError>;
    /// Places matching `filter`, sorted by name.
    async fn find_places(&self, filter: &PlaceFilter, page: Page)
        -> Result<Vec<Place>, StoreError>;
    async fn update_place(&self, place: &Place) -> Result<(), StoreError>;
    async fn set_place_approved(&self, id: &str, approved: bool) -> Result<bool, StoreError>;
    /// Removes the place together with its slots and their bookings.
    async fn delete_place(&self, id: &str) -> Result<bool, StoreError>;

    async fn insert_slot(&self, slot: &Slot) -> Result<(), StoreError>;
    async fn find_slot(&self, id: &str) -> Result<Option<Slot>, StoreError>;
    /// Slots of a place, sorted by start.
    async fn place_slots(&self, place_id: &str, page: Page) -> Result<Vec<Slot>, StoreError>;
    /// Adds `delta` to the occupancy only if the result stays within
    /// `0..=max_visitors`, as one atomic step. `None` when the guard fails or
    /// the slot is gone.
    async fn try_adjust_occupancy(
        &self,
        slot_id: &str,
        delta: i32,
    ) -> Result<Option<Slot>, StoreError>;
    /// Subtracts `amount` from the occupancy, clamped at zero.
    async fn release_occupancy(
        &self,
        slot_id: &str,
        amount: i32,
    ) -> Result<Option<Slot>, StoreError>;
    /// Removes the slot and every booking on it. Returns the number of
    /// bookings removed, or `None` when the slot did not exist.
    async fn delete_slot(&self, id: &str) -> Result<Option<u64>, StoreError>;

    async fn find_booking(
        &self,
        slot_id: &str,
        visitor_id: &str,
    ) -> Result<Option<Booking>, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the visitor already holds a
    /// booking on the slot.
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError>;
    async fn update_booking_headcount(
        &self,
        booking_id: &str,
        friends_number: i32,
    ) -> Result<(), StoreError>;
    async fn delete_booking(
        &self,
        slot_id: &str,
        visitor_id: &str,
    ) -> Result<Option<Booking>, StoreError>;
    async fn bookings_for_slots(&self, slot_ids: &[String]) -> Result<Vec<Booking>, StoreError>;
    /// Bookings of a visitor joined with slot and place, ordered by slot
    /// start. Unpaged when `page` is `None`.
    async fn visitor_visits(
        &self,
        visitor_id: &str,
        page: Option<Page>,
    ) -> Result<Vec<Visit>, StoreError>;
}
