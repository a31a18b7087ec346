//! Parsing of command arguments and rendering of replies.

use time::macros::format_description;
use time::PrimitiveDateTime;

use crate::buckets::{DateBuckets, SlotRecord, VisitRecord};
use crate::error::{BookingError, CatalogError};
use crate::models::Coordinates;
use crate::places::PlaceSummary;
use crate::reconciler::{Outcome, Reservation};

pub const GENERIC_FAILURE: &str = "Something went wrong, please try again later.";

/// Splits `a | b | c` into trimmed fields.
pub fn fields(raw: &str) -> Vec<&str> {
    raw.split('|').map(str::trim).collect()
}

/// `DD.MM.YYYY HH:mm`
pub fn parse_datetime(raw: &str) -> Option<PrimitiveDateTime> {
    let format = format_description!("[day].[month].[year] [hour]:[minute]");
    PrimitiveDateTime::parse(raw.trim(), format).ok()
}

/// `lat,lng`
pub fn parse_coordinates(raw: &str) -> Option<Coordinates> {
    let (lat, lng) = raw.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lng: f64 = lng.trim().parse().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng))
        .then_some(Coordinates { lat, lng })
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

pub fn coordinates(c: Coordinates) -> String {
    format!("{},{}", c.lat, c.lng)
}

pub fn places(list: &[PlaceSummary]) -> String {
    if list.is_empty() {
        return "No places found.".to_string();
    }
    let mut message = String::from("📍 Places:\n\n");
    for place in list {
        message.push_str(&format!(
            "{}{} ({})\n",
            if place.is_favourite { "★ " } else { "" },
            place.name,
            place.kind.as_deref().unwrap_or("Unknown")
        ));
        message.push_str(&format!("{}\n", place.description));
        if let Some(address) = &place.address {
            message.push_str(&format!("Address: {address}\n"));
        }
        if let Some(www) = &place.www {
            message.push_str(&format!("WWW: {www}\n"));
        }
        if let Some(location) = place.location {
            message.push_str(&format!("Location: {}\n", coordinates(location)));
        }
        if !place.approved {
            message.push_str("Awaiting approval\n");
        }
        message.push_str(&format!("id: {}\n\n", place.id));
    }
    message
}

pub fn visits(buckets: &DateBuckets<VisitRecord>) -> String {
    if buckets.is_empty() {
        return "You have no bookings yet.".to_string();
    }
    let mut message = String::from("📋 Your bookings:\n");
    for (day, records) in buckets.iter() {
        message.push_str(&format!("\n📅 {day}\n"));
        for r in records {
            message.push_str(&format!(
                "{} - {} {} ({}), {} people, {}/{} taken\n",
                r.start_time, r.end_time, r.name, r.kind, r.visitors, r.occupied_slots, r.max_slots
            ));
        }
    }
    message
}

pub fn slots(place_name: &str, buckets: &DateBuckets<SlotRecord>) -> String {
    if buckets.is_empty() {
        return format!("{place_name} has no slots yet.");
    }
    let mut message = format!("🗓 Slots at {place_name}:\n");
    for (day, records) in buckets.iter() {
        message.push_str(&format!("\n📅 {day}\n"));
        for r in records {
            message.push_str(&format!(
                "{} - {} {}, {}/{} taken",
                r.from, r.to, r.kind, r.occupied_slots, r.max_slots
            ));
            if r.is_planned {
                message.push_str(&format!(" ✅ you: {}", r.friends));
            }
            message.push('\n');
        }
    }
    message
}

pub fn reservation(reservation: &Reservation) -> String {
    let slot = &reservation.slot;
    match reservation.outcome {
        Outcome::Created => format!(
            "✅ Booked for {} people. {}/{} places taken.",
            reservation.booking.friends_number, slot.occupied_slots, slot.max_visitors
        ),
        Outcome::Updated => format!(
            "✅ Booking changed to {} people. {}/{} places taken.",
            reservation.booking.friends_number, slot.occupied_slots, slot.max_visitors
        ),
        Outcome::Unchanged => "Your booking already has that many people.".to_string(),
    }
}

/// Reply for a rejected reservation. `None` for failures the user cannot act on.
pub fn booking_rejection(err: &BookingError) -> Option<String> {
    match err {
        BookingError::InvalidHeadcount(_) => Some(format!("❌ {}", capitalize(&err.to_string()))),
        BookingError::SlotNotFound(_) => Some("❌ Slot not found".to_string()),
        BookingError::CapacityExceeded { occupied, max, .. } => Some(format!(
            "❌ Not enough place on this slot! {occupied}/{max} already taken."
        )),
        BookingError::OverlapConflict(conflict) => Some(format!("❌ {conflict}")),
        BookingError::Store(_) => None,
    }
}

pub fn catalog_rejection(err: &CatalogError) -> Option<String> {
    match err {
        CatalogError::NotFound(what) => Some(format!("❌ {} not found", capitalize(what))),
        CatalogError::InvalidInput(reason) => Some(format!("❌ Invalid input: {reason}")),
        CatalogError::Unauthorized => {
            Some("❌ Only the creator of this place can do that".to_string())
        }
        CatalogError::Store(_) => None,
    }
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
