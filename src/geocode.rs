//! Address lookup against a MapQuest-compatible geocoding endpoint.

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::models::Coordinates;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("address is empty")]
    EmptyAddress,
    #[error("location not found")]
    LocationNotFound,
    #[error("geocoder unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    results: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
struct Location {
    #[serde(rename = "latLng")]
    lat_lng: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl Response {
    fn first_location(&self) -> Option<Coordinates> {
        let location = self.results.first()?.locations.first()?;
        Some(Coordinates {
            lat: location.lat_lng.lat,
            lng: location.lat_lng.lng,
        })
    }
}

#[derive(Clone)]
pub struct Geocoder {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl Geocoder {
    pub fn new(endpoint: Url, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }

    fn request_url(&self, address: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("thumbMaps", "false")
            .append_pair("maxResults", "1")
            .append_pair("location", address);
        url
    }

    pub async fn locate(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(GeocodeError::EmptyAddress);
        }

        let response: Response = self
            .client
            .get(self.request_url(address))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let found = response.first_location();
        debug!("geocoded {:?} -> {:?}", address, found);
        found.ok_or(GeocodeError::LocationNotFound)
    }
}
