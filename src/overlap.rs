//! Detects double bookings of one visitor across places.
//!
//! Windows are half-open, so a booking ending at 10:00 and one starting at
//! 10:00 do not conflict.

use std::fmt;

use time::PrimitiveDateTime;

use crate::buckets::clock;
use crate::error::StoreError;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub starts: PrimitiveDateTime,
    pub ends: PrimitiveDateTime,
}

impl TimeWindow {
    pub const fn new(starts: PrimitiveDateTime, ends: PrimitiveDateTime) -> Self {
        Self { starts, ends }
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.starts < other.ends && other.starts < self.ends
    }
}

/// An existing booking that intersects the candidate window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub place_name: String,
    pub slot_id: String,
    pub window: TimeWindow,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "You already have a booking at {} ({} - {}) that overlaps with this booking!",
            self.place_name,
            clock(self.window.starts),
            clock(self.window.ends)
        )
    }
}

/// Returns the first booking of `visitor_id` whose slot overlaps `candidate`,
/// ignoring the booking on `exclude_slot_id`.
pub async fn find_conflict(
    store: &dyn Store,
    visitor_id: &str,
    candidate: &TimeWindow,
    exclude_slot_id: &str,
) -> Result<Option<Conflict>, StoreError> {
    let visits = store.visitor_visits(visitor_id, None).await?;

    let conflict = visits
        .into_iter()
        .filter(|visit| visit.slot.id != exclude_slot_id)
        .find(|visit| visit.slot.window().overlaps(candidate))
        .map(|visit| Conflict {
            window: visit.slot.window(),
            slot_id: visit.slot.id,
            place_name: visit.place_name,
        });

    if let Some(conflict) = &conflict {
        debug!(
            "visitor {} overlaps slot {} at {}",
            visitor_id, conflict.slot_id, conflict.place_name
        );
    }

    Ok(conflict)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use time::macros::datetime;

    use super::*;
    use crate::models::Booking;
    use crate::store::memory::fixtures::{seed_place, seed_slot, seed_visitor};
    use crate::store::memory::MemoryStore;

    fn window(starts: PrimitiveDateTime, ends: PrimitiveDateTime) -> TimeWindow {
        TimeWindow::new(starts, ends)
    }

    #[rstest]
    #[case(datetime!(2024-01-01 09:00), datetime!(2024-01-01 11:00), true)]
    #[case(datetime!(2024-01-01 10:30), datetime!(2024-01-01 10:45), true)]
    #[case(datetime!(2024-01-01 08:00), datetime!(2024-01-01 12:00), true)]
    #[case(datetime!(2024-01-01 10:59), datetime!(2024-01-01 12:00), true)]
    #[case(datetime!(2024-01-01 11:00), datetime!(2024-01-01 12:00), false)]
    #[case(datetime!(2024-01-01 09:00), datetime!(2024-01-01 10:00), false)]
    #[case(datetime!(2024-01-02 10:00), datetime!(2024-01-02 11:00), false)]
    fn half_open_intersection(
        #[case] starts: PrimitiveDateTime,
        #[case] ends: PrimitiveDateTime,
        #[case] expected: bool,
    ) {
        let booked = window(datetime!(2024-01-01 10:00), datetime!(2024-01-01 11:00));
        let candidate = window(starts, ends);
        assert_eq!(booked.overlaps(&candidate), expected);
        assert_eq!(candidate.overlaps(&booked), expected);
    }

    #[tokio::test]
    async fn reports_place_and_times_of_overlapping_booking() {
        let store = MemoryStore::new();
        let visitor = seed_visitor(&store).await;
        let pool = seed_place(&store, &visitor.id, "City pool").await;
        let booked = seed_slot(
            &store,
            &pool.id,
            datetime!(2024-01-01 10:00),
            datetime!(2024-01-01 11:00),
            4,
        )
        .await;
        store
            .insert_booking(&Booking {
                id: "b1".to_string(),
                slot_id: booked.id.clone(),
                visitor_id: visitor.id.clone(),
                friends_number: 1,
            })
            .await
            .unwrap();

        let candidate = window(datetime!(2024-01-01 10:30), datetime!(2024-01-01 11:30));
        let conflict = find_conflict(&store, &visitor.id, &candidate, "other")
            .await
            .unwrap()
            .expect("conflict");

        assert_eq!(conflict.slot_id, booked.id);
        assert_eq!(
            conflict.to_string(),
            "You already have a booking at City pool (10:00 - 11:00) that overlaps with this booking!"
        );
    }

    #[tokio::test]
    async fn ignores_the_slot_being_modified() {
        let store = MemoryStore::new();
        let visitor = seed_visitor(&store).await;
        let place = seed_place(&store, &visitor.id, "Library").await;
        let slot = seed_slot(
            &store,
            &place.id,
            datetime!(2024-01-01 10:00),
            datetime!(2024-01-01 11:00),
            4,
        )
        .await;
        store
            .insert_booking(&Booking {
                id: "b1".to_string(),
                slot_id: slot.id.clone(),
                visitor_id: visitor.id.clone(),
                friends_number: 2,
            })
            .await
            .unwrap();

        let conflict = find_conflict(&store, &visitor.id, &slot.window(), &slot.id)
            .await
            .unwrap();
        assert!(conflict.is_none());
    }

    #[tokio::test]
    async fn other_visitors_bookings_do_not_count() {
        let store = MemoryStore::new();
        let owner = seed_visitor(&store).await;
        let other = seed_visitor(&store).await;
        let place = seed_place(&store, &owner.id, "Gym").await;
        let slot = seed_slot(
            &store,
            &place.id,
            datetime!(2024-01-01 10:00),
            datetime!(2024-01-01 11:00),
            4,
        )
        .await;
        store
            .insert_booking(&Booking {
                id: "b1".to_string(),
                slot_id: slot.id.clone(),
                visitor_id: other.id.clone(),
                friends_number: 1,
            })
            .await
            .unwrap();

        let conflict = find_conflict(&store, &owner.id, &slot.window(), "elsewhere")
            .await
            .unwrap();
        assert!(conflict.is_none());
    }
}
