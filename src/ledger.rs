//! Occupancy bookkeeping of a slot.
//!
//! `0 <= occupied_slots <= max_visitors` holds after every call. The check
//! and the write happen in one conditional update inside the store, so two
//! concurrent reservations cannot both pass against a stale read.

use crate::error::{BookingError, StoreError};
use crate::models::Slot;
use crate::store::Store;

/// Whether `delta` can be applied to the slot as last read.
pub fn fits(slot: &Slot, delta: i32) -> bool {
    let occupied = slot.occupied_slots + delta;
    (0..=slot.max_visitors).contains(&occupied)
}

/// Applies `delta` to the slot's occupancy. Rejects with `CapacityExceeded`
/// when the result would leave `0..=max_visitors`, without writing anything.
pub async fn reserve(store: &dyn Store, slot: &Slot, delta: i32) -> Result<Slot, BookingError> {
    if !fits(slot, delta) {
        return Err(BookingError::CapacityExceeded {
            occupied: slot.occupied_slots,
            max: slot.max_visitors,
            requested: delta,
        });
    }

    if let Some(updated) = store.try_adjust_occupancy(&slot.id, delta).await? {
        debug!(
            "slot {} occupancy {} -> {}",
            slot.id, slot.occupied_slots, updated.occupied_slots
        );
        return Ok(updated);
    }

    // The guard failed against a fresher row than ours.
    match store.find_slot(&slot.id).await? {
        Some(current) => {
            info!(
                "slot {} filled up concurrently ({}/{})",
                current.id, current.occupied_slots, current.max_visitors
            );
            Err(BookingError::CapacityExceeded {
                occupied: current.occupied_slots,
                max: current.max_visitors,
                requested: delta,
            })
        }
        None => Err(BookingError::SlotNotFound(slot.id.clone())),
    }
}

/// Gives `amount` places back, never dropping below zero.
pub async fn release(
    store: &dyn Store,
    slot_id: &str,
    amount: i32,
) -> Result<Option<Slot>, StoreError> {
    let released = store.release_occupancy(slot_id, amount).await?;
    match &released {
        Some(slot) => debug!("slot {} released {}, now {}", slot_id, amount, slot.occupied_slots),
        None => warn!("slot {} vanished before releasing {}", slot_id, amount),
    }
    Ok(released)
}
