//! Groups bookings and slots by the calendar day they start on.

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

use crate::catalog::slot_type_name;
use crate::models::{Booking, Slot, Visit};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[day].[month].[year]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");

/// `DD.MM.YYYY` key of a day.
pub fn date_key(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

/// `HH:mm` of a timestamp.
pub fn clock(at: PrimitiveDateTime) -> String {
    at.time()
        .format(TIME_FORMAT)
        .unwrap_or_else(|_| at.time().to_string())
}

/// Records grouped per day, ordered by day. Serializes as an object keyed by
/// `DD.MM.YYYY`.
#[derive(Debug, Clone, PartialEq)]
pub struct DateBuckets<T> {
    days: BTreeMap<Date, Vec<T>>,
}

impl<T> Default for DateBuckets<T> {
    fn default() -> Self {
        Self {
            days: BTreeMap::new(),
        }
    }
}

impl<T> DateBuckets<T> {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (String, &[T])> + '_ {
        self.days
            .iter()
            .map(|(date, records)| (date_key(*date), records.as_slice()))
    }
}

#[cfg(test)]
impl<T> DateBuckets<T> {
    /// Looks a bucket up by its `DD.MM.YYYY` key.
    pub fn get(&self, key: &str) -> Option<&[T]> {
        let date = Date::parse(key, DATE_FORMAT).ok()?;
        self.days.get(&date).map(Vec::as_slice)
    }

    pub fn keys(&self) -> Vec<String> {
        self.days.keys().copied().map(date_key).collect()
    }
}

impl<T: Serialize> Serialize for DateBuckets<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.days.len()))?;
        for (key, records) in self.iter() {
            map.serialize_entry(&key, records)?;
        }
        map.end()
    }
}

/// Stable-sorts `items` by start and groups them by start day. Records keep
/// chronological order inside their day.
pub fn bucket_by_date<I, T>(
    mut items: Vec<I>,
    starts: impl Fn(&I) -> PrimitiveDateTime,
    present: impl Fn(I) -> T,
) -> DateBuckets<T> {
    items.sort_by_key(|item| starts(item));

    let mut buckets = DateBuckets::default();
    for item in items {
        let day = starts(&item).date();
        buckets.days.entry(day).or_insert_with(Vec::new).push(present(item));
    }
    buckets
}

/// One line of the "my bookings" view.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub start_time: String,
    pub end_time: String,
    pub visitors: i32,
    pub occupied_slots: i32,
    pub max_slots: i32,
    pub slot_id: String,
    pub place_id: String,
}

/// One line of the "slots of a place" view, seen by a given visitor.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub from: String,
    pub to: String,
    pub occupied_slots: i32,
    pub max_slots: i32,
    pub is_planned: bool,
    pub friends: i32,
}

pub fn visits_by_date(visits: Vec<Visit>) -> DateBuckets<VisitRecord> {
    bucket_by_date(
        visits,
        |visit| visit.slot.starts,
        |visit| VisitRecord {
            name: visit.place_name,
            kind: slot_type_name(visit.slot.type_id),
            start_time: clock(visit.slot.starts),
            end_time: clock(visit.slot.ends),
            visitors: visit.booking.friends_number,
            occupied_slots: visit.slot.occupied_slots,
            max_slots: visit.slot.max_visitors,
            slot_id: visit.slot.id,
            place_id: visit.slot.place_id,
        },
    )
}

/// `bookings` may hold other visitors' bookings; only `visitor_id`'s count.
pub fn slots_by_date(
    slots: Vec<Slot>,
    bookings: &[Booking],
    visitor_id: &str,
) -> DateBuckets<SlotRecord> {
    bucket_by_date(
        slots,
        |slot| slot.starts,
        |slot| {
            let own = bookings
                .iter()
                .find(|b| b.slot_id == slot.id && b.visitor_id == visitor_id);
            SlotRecord {
                kind: slot_type_name(slot.type_id),
                from: clock(slot.starts),
                to: clock(slot.ends),
                occupied_slots: slot.occupied_slots,
                max_slots: slot.max_visitors,
                is_planned: own.is_some(),
                friends: own.map_or(0, |b| b.friends_number),
                id: slot.id,
            }
        },
    )
}
