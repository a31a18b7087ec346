//! Slot administration and the two date-bucketed read views.

use time::PrimitiveDateTime;

use crate::buckets::{slots_by_date, visits_by_date, DateBuckets, SlotRecord, VisitRecord};
use crate::catalog::slot_type_by_name;
use crate::error::{CatalogError, StoreError};
use crate::models::{new_id, Slot};
use crate::places::owned_place;
use crate::store::{Page, Store};

pub const BOOKINGS_PAGE: i64 = 10;
pub const SLOTS_PAGE: i64 = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct SlotDraft {
    pub type_name: String,
    pub starts: PrimitiveDateTime,
    pub ends: PrimitiveDateTime,
    pub max_visitors: i32,
}

pub async fn add_slot(
    store: &dyn Store,
    actor_id: &str,
    place_id: &str,
    draft: SlotDraft,
) -> Result<Slot, CatalogError> {
    let place = owned_place(store, actor_id, place_id).await?;

    let slot_type = slot_type_by_name(&draft.type_name).ok_or_else(|| {
        CatalogError::InvalidInput(format!("unknown slot type {}", draft.type_name))
    })?;
    if draft.ends <= draft.starts {
        return Err(CatalogError::InvalidInput(
            "slot must end after it starts".to_string(),
        ));
    }
    if draft.max_visitors <= 0 {
        return Err(CatalogError::InvalidInput(
            "slot needs room for at least one visitor".to_string(),
        ));
    }

    let slot = Slot {
        id: new_id(),
        place_id: place.id,
        type_id: slot_type.id,
        starts: draft.starts,
        ends: draft.ends,
        occupied_slots: 0,
        max_visitors: draft.max_visitors,
    };
    store.insert_slot(&slot).await?;
    info!("slot {} added to place {}", slot.id, slot.place_id);
    Ok(slot)
}

/// Deletes the slot and all bookings on it. Returns how many bookings went.
pub async fn delete_slot(
    store: &dyn Store,
    actor_id: &str,
    slot_id: &str,
) -> Result<u64, CatalogError> {
    let slot = store
        .find_slot(slot_id)
        .await?
        .ok_or(CatalogError::NotFound("slot"))?;
    owned_place(store, actor_id, &slot.place_id).await?;

    let removed = store
        .delete_slot(slot_id)
        .await?
        .ok_or(CatalogError::NotFound("slot"))?;
    info!("slot {} deleted with {} bookings", slot_id, removed);
    Ok(removed)
}

/// The visitor's bookings grouped by day.
pub async fn my_bookings(
    store: &dyn Store,
    visitor_id: &str,
    skip: i64,
) -> Result<DateBuckets<VisitRecord>, StoreError> {
    let visits = store
        .visitor_visits(visitor_id, Some(Page::new(skip, BOOKINGS_PAGE)))
        .await?;
    Ok(visits_by_date(visits))
}

/// Slots of a place grouped by day, marked with the visitor's own bookings.
pub async fn place_slots(
    store: &dyn Store,
    visitor_id: &str,
    place_id: &str,
    skip: i64,
) -> Result<DateBuckets<SlotRecord>, CatalogError> {
    if store.find_place(place_id).await?.is_none() {
        return Err(CatalogError::NotFound("place"));
    }

    let slots = store
        .place_slots(place_id, Page::new(skip, SLOTS_PAGE))
        .await?;
    let slot_ids: Vec<String> = slots.iter().map(|s| s.id.clone()).collect();
    let bookings = store.bookings_for_slots(&slot_ids).await?;

    Ok(slots_by_date(slots, &bookings, visitor_id))
}
