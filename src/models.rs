use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::overlap::TimeWindow;

/// Smallest and largest headcount a single booking may hold, the visitor included.
pub const MIN_HEADCOUNT: i32 = 1;
pub const MAX_HEADCOUNT: i32 = 7;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Visitor {
    pub id: String,
    pub priority_id: i32,
    pub favourites: Vec<String>,
    pub telegram_id: Option<i64>,
}

impl Visitor {
    pub fn is_favourite(&self, place_id: &str) -> bool {
        self.favourites.iter().any(|id| id == place_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PlaceType {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub id: String,
    pub creator_id: String,
    pub name: String,
    pub place_type_id: i32,
    pub description: String,
    pub url: Option<String>,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub image: Option<Vec<u8>>,
    pub approved: bool,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Slot {
    pub id: String,
    pub place_id: String,
    pub type_id: i32,
    pub starts: PrimitiveDateTime,
    pub ends: PrimitiveDateTime,
    pub occupied_slots: i32,
    pub max_visitors: i32,
}

impl Slot {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.starts, self.ends)
    }

    pub fn free(&self) -> i32 {
        self.max_visitors - self.occupied_slots
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Booking {
    pub id: String,
    pub slot_id: String,
    pub visitor_id: String,
    /// Total headcount, inclusive of the visitor.
    pub friends_number: i32,
}

/// A booking joined with its slot and the name of the slot's place.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    pub booking: Booking,
    pub slot: Slot,
    pub place_name: String,
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
