//! PostgreSQL adapter for the store port.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use super::{Page, PlaceFilter, Store};
use crate::error::StoreError;
use crate::models::{Booking, Coordinates, Place, PlaceType, Slot, Visit, Visitor};

const PLACE_COLUMNS: &str =
    "id, creator_id, name, place_type_id, description, url, address, lat, lng, image_data, approved";

#[derive(FromRow)]
struct PlaceRow {
    id: String,
    creator_id: String,
    name: String,
    place_type_id: i32,
    description: String,
    url: Option<String>,
    address: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    image_data: Option<Vec<u8>>,
    approved: bool,
}

impl From<PlaceRow> for Place {
    fn from(row: PlaceRow) -> Self {
        let coordinates = match (row.lat, row.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        };
        Place {
            id: row.id,
            creator_id: row.creator_id,
            name: row.name,
            place_type_id: row.place_type_id,
            description: row.description,
            url: row.url,
            address: row.address,
            coordinates,
            image: row.image_data,
            approved: row.approved,
        }
    }
}

#[derive(FromRow)]
struct VisitRow {
    booking_id: String,
    friends_number: i32,
    visitor_id: String,
    slot_id: String,
    place_id: String,
    type_id: i32,
    starts: PrimitiveDateTime,
    ends: PrimitiveDateTime,
    occupied_slots: i32,
    max_visitors: i32,
    place_name: String,
}

impl From<VisitRow> for Visit {
    fn from(row: VisitRow) -> Self {
        Visit {
            booking: Booking {
                id: row.booking_id,
                slot_id: row.slot_id.clone(),
                visitor_id: row.visitor_id,
                friends_number: row.friends_number,
            },
            slot: Slot {
                id: row.slot_id,
                place_id: row.place_id,
                type_id: row.type_id,
                starts: row.starts,
                ends: row.ends,
                occupied_slots: row.occupied_slots,
                max_visitors: row.max_visitors,
            },
            place_name: row.place_name,
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_place_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &PlaceFilter) {
    query.push(" WHERE TRUE");
    if let Some(type_id) = filter.type_id {
        query.push(" AND place_type_id = ").push_bind(type_id);
    }
    if let Some(name) = &filter.name {
        query
            .push(" AND name ILIKE ")
            .push_bind(format!("%{}%", escape_like(name)));
    }
    if let Some(approved) = filter.approved {
        query.push(" AND approved = ").push_bind(approved);
    }
    if let Some(creator_id) = &filter.creator_id {
        query.push(" AND creator_id = ").push_bind(creator_id.clone());
    }
    if let Some(ids) = &filter.ids {
        query.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
    }
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl Store for PgStore {
    async fn insert_visitor(&self, visitor: &Visitor) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO visitors (id, priority_id, favourites, telegram_id) VALUES ($1, $2, $3, $4)",
        )
        .bind(&visitor.id)
        .bind(visitor.priority_id)
        .bind(&visitor.favourites)
        .bind(visitor.telegram_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_visitor(&self, id: &str) -> Result<Option<Visitor>, StoreError> {
        Ok(sqlx::query_as::<_, Visitor>("SELECT * FROM visitors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_visitor_by_telegram(
        &self,
        telegram_id: i64,
    ) -> Result<Option<Visitor>, StoreError> {
        Ok(
            sqlx::query_as::<_, Visitor>("SELECT * FROM visitors WHERE telegram_id = $1")
                .bind(telegram_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn set_favourites(
        &self,
        visitor_id: &str,
        favourites: &[String],
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE visitors SET favourites = $1 WHERE id = $2")
            .bind(favourites)
            .bind(visitor_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn place_types(&self) -> Result<Vec<PlaceType>, StoreError> {
        Ok(
            sqlx::query_as::<_, PlaceType>("SELECT id, name FROM place_types ORDER BY id")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn insert_place(&self, place: &Place) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO places (id, creator_id, name, place_type_id, description, url, address, lat, lng, image_data, approved)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&place.id)
        .bind(&place.creator_id)
        .bind(&place.name)
        .bind(place.place_type_id)
        .bind(&place.description)
        .bind(&place.url)
        .bind(&place.address)
        .bind(place.coordinates.map(|c| c.lat))
        .bind(place.coordinates.map(|c| c.lng))
        .bind(&place.image)
        .bind(place.approved)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_place(&self, id: &str) -> Result<Option<Place>, StoreError> {
        let row = sqlx::query_as::<_, PlaceRow>(&format!(
            "SELECT {PLACE_COLUMNS} FROM places WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Place::from))
    }

    async fn find_places(
        &self,
        filter: &PlaceFilter,
        page: Page,
    ) -> Result<Vec<Place>, StoreError> {
        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {PLACE_COLUMNS} FROM places"));
        push_place_filter(&mut query, filter);
        query
            .push(" ORDER BY name ASC, id ASC OFFSET ")
            .push_bind(page.skip)
            .push(" LIMIT ")
            .push_bind(page.limit);

        let rows = query
            .build_query_as::<PlaceRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Place::from).collect())
    }

    async fn update_place(&self, place: &Place) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE places SET name = $2, place_type_id = $3, description = $4, url = $5,
             address = $6, lat = $7, lng = $8, image_data = $9
             WHERE id = $1",
        )
        .bind(&place.id)
        .bind(&place.name)
        .bind(place.place_type_id)
        .bind(&place.description)
        .bind(&place.url)
        .bind(&place.address)
        .bind(place.coordinates.map(|c| c.lat))
        .bind(place.coordinates.map(|c| c.lng))
        .bind(&place.image)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_place_approved(&self, id: &str, approved: bool) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE places SET approved = $2 WHERE id = $1")
            .bind(id)
            .bind(approved)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_place(&self, id: &str) -> Result<bool, StoreError> {
        // slots and bookings go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM places WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_slot(&self, slot: &Slot) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO slots (id, place_id, type_id, starts, ends, occupied_slots, max_visitors)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&slot.id)
        .bind(&slot.place_id)
        .bind(slot.type_id)
        .bind(slot.starts)
        .bind(slot.ends)
        .bind(slot.occupied_slots)
        .bind(slot.max_visitors)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_slot(&self, id: &str) -> Result<Option<Slot>, StoreError> {
        Ok(sqlx::query_as::<_, Slot>("SELECT * FROM slots WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn place_slots(&self, place_id: &str, page: Page) -> Result<Vec<Slot>, StoreError> {
        Ok(sqlx::query_as::<_, Slot>(
            "SELECT * FROM slots WHERE place_id = $1 ORDER BY starts ASC, id ASC OFFSET $2 LIMIT $3",
        )
        .bind(place_id)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn try_adjust_occupancy(
        &self,
        slot_id: &str,
        delta: i32,
    ) -> Result<Option<Slot>, StoreError> {
        Ok(sqlx::query_as::<_, Slot>(
            "UPDATE slots SET occupied_slots = occupied_slots + $2
             WHERE id = $1
               AND occupied_slots + $2 >= 0
               AND occupied_slots + $2 <= max_visitors
             RETURNING *",
        )
        .bind(slot_id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn release_occupancy(
        &self,
        slot_id: &str,
        amount: i32,
    ) -> Result<Option<Slot>, StoreError> {
        Ok(sqlx::query_as::<_, Slot>(
            "UPDATE slots SET occupied_slots = GREATEST(occupied_slots - $2, 0)
             WHERE id = $1
             RETURNING *",
        )
        .bind(slot_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_slot(&self, id: &str) -> Result<Option<u64>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let bookings = sqlx::query("DELETE FROM bookings WHERE slot_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let slots = sqlx::query("DELETE FROM slots WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if slots == 0 {
            tx.rollback().await?;
            return Ok(None);
        }
        tx.commit().await?;
        Ok(Some(bookings))
    }

    async fn find_booking(
        &self,
        slot_id: &str,
        visitor_id: &str,
    ) -> Result<Option<Booking>, StoreError> {
        Ok(sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE slot_id = $1 AND visitor_id = $2",
        )
        .bind(slot_id)
        .bind(visitor_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO bookings (id, slot_id, visitor_id, friends_number) VALUES ($1, $2, $3, $4)",
        )
        .bind(&booking.id)
        .bind(&booking.slot_id)
        .bind(&booking.visitor_id)
        .bind(booking.friends_number)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_booking_headcount(
        &self,
        booking_id: &str,
        friends_number: i32,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE bookings SET friends_number = $2 WHERE id = $1")
            .bind(booking_id)
            .bind(friends_number)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Query(format!("booking {booking_id} vanished")));
        }
        Ok(())
    }

    async fn delete_booking(
        &self,
        slot_id: &str,
        visitor_id: &str,
    ) -> Result<Option<Booking>, StoreError> {
        Ok(sqlx::query_as::<_, Booking>(
            "DELETE FROM bookings WHERE slot_id = $1 AND visitor_id = $2 RETURNING *",
        )
        .bind(slot_id)
        .bind(visitor_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn bookings_for_slots(&self, slot_ids: &[String]) -> Result<Vec<Booking>, StoreError> {
        Ok(
            sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE slot_id = ANY($1)")
                .bind(slot_ids)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn visitor_visits(
        &self,
        visitor_id: &str,
        page: Option<Page>,
    ) -> Result<Vec<Visit>, StoreError> {
        let page = page.unwrap_or(Page::new(0, i64::MAX));
        let rows = sqlx::query_as::<_, VisitRow>(
            r#"
            SELECT
                b.id AS booking_id,
                b.friends_number,
                b.visitor_id,
                s.id AS slot_id,
                s.place_id,
                s.type_id,
                s.starts,
                s.ends,
                s.occupied_slots,
                s.max_visitors,
                p.name AS place_name
            FROM bookings b
            JOIN slots s ON b.slot_id = s.id
            JOIN places p ON s.place_id = p.id
            WHERE b.visitor_id = $1
            ORDER BY s.starts, b.id
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(visitor_id)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Visit::from).collect())
    }
}
