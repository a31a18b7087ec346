//! Reserve and cancel: the only writers of bookings, and through the ledger
//! the only source of occupancy deltas.
//!
//! A rejection never leaves a partial write behind. Growing a booking claims
//! capacity before the booking row is written and gives it back if that
//! write fails. Shrinking rewrites the row first and puts the old headcount
//! back if the release fails.

use crate::error::{BookingError, StoreError};
use crate::ledger;
use crate::models::{new_id, Booking, Slot, MAX_HEADCOUNT, MIN_HEADCOUNT};
use crate::overlap;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub booking: Booking,
    pub slot: Slot,
    pub outcome: Outcome,
}

pub async fn reserve(
    store: &dyn Store,
    visitor_id: &str,
    slot_id: &str,
    headcount: i32,
) -> Result<Reservation, BookingError> {
    if !(MIN_HEADCOUNT..=MAX_HEADCOUNT).contains(&headcount) {
        return Err(BookingError::InvalidHeadcount(headcount));
    }

    let slot = store
        .find_slot(slot_id)
        .await?
        .ok_or_else(|| BookingError::SlotNotFound(slot_id.to_string()))?;

    let existing = store.find_booking(slot_id, visitor_id).await?;
    let delta = headcount - existing.as_ref().map_or(0, |b| b.friends_number);

    match existing {
        None => create(store, visitor_id, slot, headcount).await,
        Some(booking) if delta == 0 => Ok(Reservation {
            booking,
            slot,
            outcome: Outcome::Unchanged,
        }),
        Some(booking) if delta > 0 => grow(store, booking, slot, headcount, delta).await,
        Some(booking) => shrink(store, booking, slot, headcount, delta).await,
    }
}

async fn create(
    store: &dyn Store,
    visitor_id: &str,
    slot: Slot,
    headcount: i32,
) -> Result<Reservation, BookingError> {
    if let Some(conflict) =
        overlap::find_conflict(store, visitor_id, &slot.window(), &slot.id).await?
    {
        info!("visitor {} rejected on slot {}: {}", visitor_id, slot.id, conflict);
        return Err(BookingError::OverlapConflict(conflict));
    }

    let slot = ledger::reserve(store, &slot, headcount).await?;

    let booking = Booking {
        id: new_id(),
        slot_id: slot.id.clone(),
        visitor_id: visitor_id.to_string(),
        friends_number: headcount,
    };
    if let Err(err) = store.insert_booking(&booking).await {
        give_back(store, &slot.id, headcount).await;
        return Err(err.into());
    }

    info!(
        "visitor {} booked {} on slot {} ({}/{})",
        visitor_id, headcount, slot.id, slot.occupied_slots, slot.max_visitors
    );
    Ok(Reservation {
        booking,
        slot,
        outcome: Outcome::Created,
    })
}

async fn grow(
    store: &dyn Store,
    mut booking: Booking,
    slot: Slot,
    headcount: i32,
    delta: i32,
) -> Result<Reservation, BookingError> {
    let slot = ledger::reserve(store, &slot, delta).await?;

    if let Err(err) = store.update_booking_headcount(&booking.id, headcount).await {
        give_back(store, &slot.id, delta).await;
        return Err(err.into());
    }

    booking.friends_number = headcount;
    info!(
        "visitor {} raised slot {} booking to {}",
        booking.visitor_id, slot.id, headcount
    );
    Ok(Reservation {
        booking,
        slot,
        outcome: Outcome::Updated,
    })
}

async fn shrink(
    store: &dyn Store,
    mut booking: Booking,
    slot: Slot,
    headcount: i32,
    delta: i32,
) -> Result<Reservation, BookingError> {
    let previous = booking.friends_number;
    store.update_booking_headcount(&booking.id, headcount).await?;

    let slot = match ledger::reserve(store, &slot, delta).await {
        Ok(slot) => slot,
        Err(err) => {
            let restored = store.update_booking_headcount(&booking.id, previous).await;
            if let Err(restore) = restored {
                error!(
                    "could not restore booking {} to {} after failed release: {}",
                    booking.id, previous, restore
                );
            }
            return Err(err);
        }
    };
    booking.friends_number = headcount;

    info!(
        "visitor {} lowered slot {} booking to {}",
        booking.visitor_id, slot.id, headcount
    );
    Ok(Reservation {
        booking,
        slot,
        outcome: Outcome::Updated,
    })
}

async fn give_back(store: &dyn Store, slot_id: &str, amount: i32) {
    if let Err(err) = ledger::release(store, slot_id, amount).await {
        error!("could not give back {} places on slot {}: {}", amount, slot_id, err);
    }
}

/// Removes the visitor's booking on the slot, if any, and frees its places.
/// Cancelling a booking that does not exist succeeds with `None`.
pub async fn cancel(
    store: &dyn Store,
    visitor_id: &str,
    slot_id: &str,
) -> Result<Option<Booking>, StoreError> {
    let Some(booking) = store.delete_booking(slot_id, visitor_id).await? else {
        debug!("visitor {} had no booking on slot {}", visitor_id, slot_id);
        return Ok(None);
    };

    ledger::release(store, slot_id, booking.friends_number).await?;
    info!(
        "visitor {} cancelled {} on slot {}",
        visitor_id, booking.friends_number, slot_id
    );
    Ok(Some(booking))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use time::macros::datetime;
    use time::PrimitiveDateTime;

    use super::*;
    use crate::models::{Place, PlaceType, Visit, Visitor};
    use crate::store::memory::fixtures::{seed_place, seed_slot, seed_visitor};
    use crate::store::memory::MemoryStore;
    use crate::store::{Page, PlaceFilter};

    struct World {
        store: MemoryStore,
        alice: String,
        bob: String,
        place_id: String,
    }

    async fn world() -> World {
        let store = MemoryStore::new();
        let alice = seed_visitor(&store).await.id;
        let bob = seed_visitor(&store).await.id;
        let place_id = seed_place(&store, &alice, "City pool").await.id;
        World {
            store,
            alice,
            bob,
            place_id,
        }
    }

    impl World {
        async fn slot(&self, starts: PrimitiveDateTime, ends: PrimitiveDateTime, max: i32) -> Slot {
            seed_slot(&self.store, &self.place_id, starts, ends, max).await
        }

        async fn occupied(&self, slot_id: &str) -> i32 {
            self.store.find_slot(slot_id).await.unwrap().unwrap().occupied_slots
        }

        async fn headcount(&self, visitor_id: &str, slot_id: &str) -> Option<i32> {
            self.store
                .find_booking(slot_id, visitor_id)
                .await
                .unwrap()
                .map(|b| b.friends_number)
        }
    }

    #[tokio::test]
    async fn create_update_and_overflow_scenario() {
        let w = world().await;
        let slot = w
            .slot(datetime!(2024-01-01 10:00), datetime!(2024-01-01 11:00), 4)
            .await;

        let created = reserve(&w.store, &w.alice, &slot.id, 3).await.unwrap();
        assert_eq!(created.outcome, Outcome::Created);
        assert_eq!(w.occupied(&slot.id).await, 3);

        let updated = reserve(&w.store, &w.alice, &slot.id, 2).await.unwrap();
        assert_eq!(updated.outcome, Outcome::Updated);
        assert_eq!(updated.slot.occupied_slots, 2);
        assert_eq!(w.occupied(&slot.id).await, 2);

        let err = reserve(&w.store, &w.bob, &slot.id, 3).await.unwrap_err();
        assert!(matches!(err, BookingError::CapacityExceeded { .. }));
        assert_eq!(w.occupied(&slot.id).await, 2);
        assert_eq!(w.headcount(&w.bob, &slot.id).await, None);
    }

    #[tokio::test]
    async fn growing_past_capacity_leaves_booking_unchanged() {
        let w = world().await;
        let slot = w
            .slot(datetime!(2024-01-01 10:00), datetime!(2024-01-01 11:00), 4)
            .await;
        reserve(&w.store, &w.alice, &slot.id, 2).await.unwrap();
        reserve(&w.store, &w.bob, &slot.id, 1).await.unwrap();

        let err = reserve(&w.store, &w.alice, &slot.id, 4).await.unwrap_err();

        assert!(matches!(
            err,
            BookingError::CapacityExceeded {
                occupied: 3,
                max: 4,
                requested: 2
            }
        ));
        assert_eq!(w.occupied(&slot.id).await, 3);
        assert_eq!(w.headcount(&w.alice, &slot.id).await, Some(2));
    }

    #[tokio::test]
    async fn same_headcount_is_a_no_op() {
        let w = world().await;
        let slot = w
            .slot(datetime!(2024-01-01 10:00), datetime!(2024-01-01 11:00), 4)
            .await;
        reserve(&w.store, &w.alice, &slot.id, 2).await.unwrap();

        let again = reserve(&w.store, &w.alice, &slot.id, 2).await.unwrap();

        assert_eq!(again.outcome, Outcome::Unchanged);
        assert_eq!(w.occupied(&slot.id).await, 2);
    }

    #[tokio::test]
    async fn headcount_outside_one_to_seven_is_invalid() {
        let w = world().await;
        let slot = w
            .slot(datetime!(2024-01-01 10:00), datetime!(2024-01-01 11:00), 10)
            .await;

        for headcount in [0, 8, -1] {
            let err = reserve(&w.store, &w.alice, &slot.id, headcount)
                .await
                .unwrap_err();
            assert!(matches!(err, BookingError::InvalidHeadcount(h) if h == headcount));
        }
        assert_eq!(w.occupied(&slot.id).await, 0);
    }

    #[tokio::test]
    async fn unknown_slot_is_not_found() {
        let w = world().await;

        let err = reserve(&w.store, &w.alice, "missing", 1).await.unwrap_err();

        assert!(matches!(err, BookingError::SlotNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn overlapping_booking_elsewhere_is_rejected_without_writes() {
        let w = world().await;
        let gym = seed_place(&w.store, &w.bob, "Gym").await;
        let pool_slot = w
            .slot(datetime!(2024-01-01 10:00), datetime!(2024-01-01 11:00), 4)
            .await;
        let gym_slot = seed_slot(
            &w.store,
            &gym.id,
            datetime!(2024-01-01 10:30),
            datetime!(2024-01-01 12:00),
            4,
        )
        .await;
        reserve(&w.store, &w.alice, &pool_slot.id, 1).await.unwrap();

        let err = reserve(&w.store, &w.alice, &gym_slot.id, 1).await.unwrap_err();

        match err {
            BookingError::OverlapConflict(conflict) => {
                assert_eq!(conflict.place_name, "City pool");
                assert_eq!(conflict.slot_id, pool_slot.id);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(w.occupied(&pool_slot.id).await, 1);
        assert_eq!(w.occupied(&gym_slot.id).await, 0);
        assert_eq!(w.headcount(&w.alice, &gym_slot.id).await, None);
    }

    #[tokio::test]
    async fn back_to_back_slots_do_not_overlap() {
        let w = world().await;
        let first = w
            .slot(datetime!(2024-01-01 10:00), datetime!(2024-01-01 11:00), 4)
            .await;
        let second = w
            .slot(datetime!(2024-01-01 11:00), datetime!(2024-01-01 12:00), 4)
            .await;

        reserve(&w.store, &w.alice, &first.id, 1).await.unwrap();
        reserve(&w.store, &w.alice, &second.id, 1).await.unwrap();

        assert_eq!(w.occupied(&second.id).await, 1);
    }

    #[tokio::test]
    async fn updating_own_booking_skips_overlap_with_itself() {
        let w = world().await;
        let slot = w
            .slot(datetime!(2024-01-01 10:00), datetime!(2024-01-01 11:00), 7)
            .await;
        reserve(&w.store, &w.alice, &slot.id, 1).await.unwrap();

        let grown = reserve(&w.store, &w.alice, &slot.id, 5).await.unwrap();

        assert_eq!(grown.booking.friends_number, 5);
        assert_eq!(w.occupied(&slot.id).await, 5);
    }

    #[tokio::test]
    async fn cancel_frees_the_places() {
        let w = world().await;
        let slot = w
            .slot(datetime!(2024-01-01 10:00), datetime!(2024-01-01 11:00), 4)
            .await;
        reserve(&w.store, &w.alice, &slot.id, 3).await.unwrap();

        let removed = cancel(&w.store, &w.alice, &slot.id).await.unwrap();

        assert_eq!(removed.map(|b| b.friends_number), Some(3));
        assert_eq!(w.occupied(&slot.id).await, 0);
        assert_eq!(w.headcount(&w.alice, &slot.id).await, None);
    }

    #[tokio::test]
    async fn cancelling_nothing_succeeds() {
        let w = world().await;
        let slot = w
            .slot(datetime!(2024-01-01 10:00), datetime!(2024-01-01 11:00), 4)
            .await;
        reserve(&w.store, &w.bob, &slot.id, 2).await.unwrap();

        let removed = cancel(&w.store, &w.alice, &slot.id).await.unwrap();

        assert!(removed.is_none());
        assert_eq!(w.occupied(&slot.id).await, 2);
    }

    #[tokio::test]
    async fn occupancy_stays_in_bounds_over_a_sequence() {
        let w = world().await;
        let slot = w
            .slot(datetime!(2024-01-01 10:00), datetime!(2024-01-01 11:00), 5)
            .await;
        let steps = [
            (w.alice.as_str(), Some(4)),
            (w.bob.as_str(), Some(2)),
            (w.bob.as_str(), Some(1)),
            (w.alice.as_str(), Some(5)),
            (w.alice.as_str(), None),
            (w.bob.as_str(), Some(5)),
            (w.bob.as_str(), Some(7)),
            (w.bob.as_str(), None),
        ];

        for (visitor, headcount) in steps {
            match headcount {
                Some(h) => {
                    let _ = reserve(&w.store, visitor, &slot.id, h).await;
                }
                None => {
                    cancel(&w.store, visitor, &slot.id).await.unwrap();
                }
            }
            let occupied = w.occupied(&slot.id).await;
            assert!((0..=5).contains(&occupied), "occupied {occupied}");

            let mut booked = 0;
            for v in [&w.alice, &w.bob] {
                booked += w.headcount(v, &slot.id).await.unwrap_or(0);
            }
            assert_eq!(occupied, booked);
        }
    }

    /// Store whose booking writes or occupancy updates fail on demand.
    struct Flaky {
        inner: MemoryStore,
        bookings: bool,
        occupancy: bool,
    }

    fn reset() -> StoreError {
        StoreError::Connection("connection reset".to_string())
    }

    #[async_trait]
    impl Store for Flaky {
        async fn insert_visitor(&self, visitor: &Visitor) -> Result<(), StoreError> {
            self.inner.insert_visitor(visitor).await
        }
        async fn find_visitor(&self, id: &str) -> Result<Option<Visitor>, StoreError> {
            self.inner.find_visitor(id).await
        }
        async fn find_visitor_by_telegram(&self, t: i64) -> Result<Option<Visitor>, StoreError> {
            self.inner.find_visitor_by_telegram(t).await
        }
        async fn set_favourites(&self, id: &str, f: &[String]) -> Result<(), StoreError> {
            self.inner.set_favourites(id, f).await
        }
        async fn place_types(&self) -> Result<Vec<PlaceType>, StoreError> {
            self.inner.place_types().await
        }
        async fn insert_place(&self, place: &Place) -> Result<(), StoreError> {
            self.inner.insert_place(place).await
        }
        async fn find_place(&self, id: &str) -> Result<Option<Place>, StoreError> {
            self.inner.find_place(id).await
        }
        async fn find_places(&self, f: &PlaceFilter, p: Page) -> Result<Vec<Place>, StoreError> {
            self.inner.find_places(f, p).await
        }
        async fn update_place(&self, place: &Place) -> Result<(), StoreError> {
            self.inner.update_place(place).await
        }
        async fn set_place_approved(&self, id: &str, a: bool) -> Result<bool, StoreError> {
            self.inner.set_place_approved(id, a).await
        }
        async fn delete_place(&self, id: &str) -> Result<bool, StoreError> {
            self.inner.delete_place(id).await
        }
        async fn insert_slot(&self, slot: &Slot) -> Result<(), StoreError> {
            self.inner.insert_slot(slot).await
        }
        async fn find_slot(&self, id: &str) -> Result<Option<Slot>, StoreError> {
            self.inner.find_slot(id).await
        }
        async fn place_slots(&self, id: &str, p: Page) -> Result<Vec<Slot>, StoreError> {
            self.inner.place_slots(id, p).await
        }
        async fn try_adjust_occupancy(&self, id: &str, d: i32) -> Result<Option<Slot>, StoreError> {
            if self.occupancy {
                return Err(reset());
            }
            self.inner.try_adjust_occupancy(id, d).await
        }
        async fn release_occupancy(&self, id: &str, a: i32) -> Result<Option<Slot>, StoreError> {
            self.inner.release_occupancy(id, a).await
        }
        async fn delete_slot(&self, id: &str) -> Result<Option<u64>, StoreError> {
            self.inner.delete_slot(id).await
        }
        async fn find_booking(&self, s: &str, v: &str) -> Result<Option<Booking>, StoreError> {
            self.inner.find_booking(s, v).await
        }
        async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
            if self.bookings {
                return Err(reset());
            }
            self.inner.insert_booking(booking).await
        }
        async fn update_booking_headcount(&self, id: &str, f: i32) -> Result<(), StoreError> {
            if self.bookings {
                return Err(reset());
            }
            self.inner.update_booking_headcount(id, f).await
        }
        async fn delete_booking(&self, s: &str, v: &str) -> Result<Option<Booking>, StoreError> {
            self.inner.delete_booking(s, v).await
        }
        async fn bookings_for_slots(&self, ids: &[String]) -> Result<Vec<Booking>, StoreError> {
            self.inner.bookings_for_slots(ids).await
        }
        async fn visitor_visits(&self, v: &str, p: Option<Page>) -> Result<Vec<Visit>, StoreError> {
            self.inner.visitor_visits(v, p).await
        }
    }

    #[tokio::test]
    async fn failed_booking_insert_gives_capacity_back() {
        let w = world().await;
        let slot = w
            .slot(datetime!(2024-01-01 10:00), datetime!(2024-01-01 11:00), 4)
            .await;
        let failing = Flaky {
            inner: w.store,
            bookings: true,
            occupancy: false,
        };

        let err = reserve(&failing, &w.alice, &slot.id, 3).await.unwrap_err();

        assert!(matches!(err, BookingError::Store(StoreError::Connection(_))));
        let slot = failing.find_slot(&slot.id).await.unwrap().unwrap();
        assert_eq!(slot.occupied_slots, 0);
    }

    #[tokio::test]
    async fn failed_release_restores_the_shrunk_booking() {
        let w = world().await;
        let slot = w
            .slot(datetime!(2024-01-01 10:00), datetime!(2024-01-01 11:00), 4)
            .await;
        reserve(&w.store, &w.alice, &slot.id, 3).await.unwrap();
        let flaky = Flaky {
            inner: w.store,
            bookings: false,
            occupancy: true,
        };

        let err = reserve(&flaky, &w.alice, &slot.id, 1).await.unwrap_err();

        assert!(matches!(err, BookingError::Store(StoreError::Connection(_))));
        let slot = flaky.find_slot(&slot.id).await.unwrap().unwrap();
        assert_eq!(slot.occupied_slots, 3);
        let booking = flaky.find_booking(&slot.id, &w.alice).await.unwrap().unwrap();
        assert_eq!(booking.friends_number, 3);
    }
}
