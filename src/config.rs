use std::env;

use thiserror::Error;
use url::Url;

const DEFAULT_GEOCODER_URL: &str = "http://www.mapquestapi.com/geocoding/v1/address";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not valid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// No database means the in-process store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub geocoder_url: Url,
    /// Geocoding is off without a key.
    pub geocoder_api_key: Option<String>,
    pub admin_chat_ids: Vec<i64>,
}

impl Config {
    /// Reads `.env` if present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "DATABASE_MAX_CONNECTIONS",
                reason: format!("{raw:?} is not a number"),
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let geocoder_url = get("GEOCODER_URL").unwrap_or_else(|| DEFAULT_GEOCODER_URL.to_string());
        let geocoder_url = Url::parse(&geocoder_url).map_err(|err| ConfigError::Invalid {
            name: "GEOCODER_URL",
            reason: err.to_string(),
        })?;

        let admin_chat_ids = match get("ADMIN_CHAT_IDS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| {
                    id.parse::<i64>().map_err(|_| ConfigError::Invalid {
                        name: "ADMIN_CHAT_IDS",
                        reason: format!("{id:?} is not a chat id"),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(Config {
            database_url: get("DATABASE_URL"),
            max_connections,
            geocoder_url,
            geocoder_api_key: get("GEOCODER_API_KEY"),
            admin_chat_ids,
        })
    }

    pub fn is_admin(&self, chat_id: i64) -> bool {
        self.admin_chat_ids.contains(&chat_id)
    }
}
