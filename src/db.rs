use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;
use crate::models::PlaceType;
use crate::store::memory::MemoryStore;
use crate::store::postgres::PgStore;
use crate::store::Store;

pub async fn get_db_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    sqlx::migrate!().run(&pool).await?;
    Ok(pool)
}

/// PostgreSQL when `DATABASE_URL` is set, otherwise an in-process store that
/// forgets everything on restart.
pub async fn open_store(config: &Config) -> Result<Arc<dyn Store>, sqlx::Error> {
    match &config.database_url {
        Some(url) => {
            let pool = get_db_pool(url, config.max_connections).await?;
            info!("connected to postgres, migrations applied");
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            warn!("DATABASE_URL not set, bookings are kept in memory only");
            Ok(Arc::new(MemoryStore::with_place_types(default_place_types())))
        }
    }
}

/// Same rows the initial migration seeds.
fn default_place_types() -> Vec<PlaceType> {
    [
        (0, "Other"),
        (1, "Library"),
        (2, "Gym"),
        (3, "Swimming pool"),
        (4, "Coworking"),
        (5, "Museum"),
    ]
    .into_iter()
    .map(|(id, name)| PlaceType {
        id,
        name: name.to_string(),
    })
    .collect()
}
