//! Visitors, places and favourites.

use crate::catalog::Catalog;
use crate::error::{CatalogError, StoreError};
use crate::models::{new_id, Coordinates, Place, Visitor};
use crate::store::{Page, PlaceFilter, Store};

pub const PLACES_PAGE: i64 = 5;

/// Returns the visitor bound to `telegram_id`, issuing a fresh id on first contact.
pub async fn issue_visitor(
    store: &dyn Store,
    telegram_id: Option<i64>,
) -> Result<Visitor, StoreError> {
    if let Some(telegram_id) = telegram_id {
        if let Some(visitor) = store.find_visitor_by_telegram(telegram_id).await? {
            return Ok(visitor);
        }
    }

    let visitor = Visitor {
        id: new_id(),
        priority_id: 0,
        favourites: Vec::new(),
        telegram_id,
    };
    store.insert_visitor(&visitor).await?;
    info!("issued visitor id {}", visitor.id);
    Ok(visitor)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceQuery {
    pub type_id: Option<i32>,
    pub name: Option<String>,
    pub approved: Option<bool>,
    /// Only places created by the asking visitor.
    pub own: bool,
    pub only_favourites: bool,
    pub skip: i64,
    pub load: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceSummary {
    pub id: String,
    pub name: String,
    pub kind: Option<String>,
    pub description: String,
    pub www: Option<String>,
    pub address: Option<String>,
    pub location: Option<Coordinates>,
    pub is_favourite: bool,
    pub approved: bool,
}

pub async fn list_places(
    store: &dyn Store,
    catalog: &Catalog,
    visitor_id: Option<&str>,
    query: &PlaceQuery,
) -> Result<Vec<PlaceSummary>, CatalogError> {
    let visitor = match visitor_id {
        Some(id) => store.find_visitor(id).await?,
        None => None,
    };

    let filter = PlaceFilter {
        type_id: query.type_id,
        name: query.name.clone().filter(|n| !n.trim().is_empty()),
        approved: query.approved,
        creator_id: visitor_id.filter(|_| query.own).map(str::to_string),
        ids: query
            .only_favourites
            .then(|| visitor.as_ref().map(|v| v.favourites.clone()).unwrap_or_default()),
    };
    let page = Page::new(query.skip, query.load.unwrap_or(PLACES_PAGE));

    let places = store.find_places(&filter, page).await?;
    Ok(places
        .into_iter()
        .map(|place| PlaceSummary {
            is_favourite: visitor.as_ref().is_some_and(|v| v.is_favourite(&place.id)),
            kind: catalog.place_type_name(place.place_type_id).map(str::to_string),
            id: place.id,
            name: place.name,
            description: place.description,
            www: place.url,
            address: place.address,
            location: place.coordinates,
            approved: place.approved,
        })
        .collect())
}

/// Adds the place to the visitor's favourites, or removes it if present.
/// Returns whether it is a favourite afterwards.
pub async fn toggle_favourite(
    store: &dyn Store,
    visitor_id: &str,
    place_id: &str,
) -> Result<bool, CatalogError> {
    let mut visitor = store
        .find_visitor(visitor_id)
        .await?
        .ok_or(CatalogError::NotFound("visitor"))?;

    let now_favourite = match visitor.favourites.iter().position(|id| id == place_id) {
        Some(index) => {
            visitor.favourites.remove(index);
            false
        }
        None => {
            visitor.favourites.push(place_id.to_string());
            true
        }
    };
    store.set_favourites(visitor_id, &visitor.favourites).await?;
    Ok(now_favourite)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceDraft {
    pub name: String,
    pub description: String,
    pub place_type_id: Option<i32>,
    pub url: Option<String>,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub image: Option<Vec<u8>>,
}

fn check_place_type(catalog: &Catalog, id: i32) -> Result<(), CatalogError> {
    if catalog.has_place_type(id) {
        Ok(())
    } else {
        Err(CatalogError::InvalidInput(format!("unknown place type {id}")))
    }
}

pub async fn add_place(
    store: &dyn Store,
    catalog: &Catalog,
    creator_id: &str,
    draft: PlaceDraft,
) -> Result<Place, CatalogError> {
    if draft.name.trim().is_empty() || draft.description.trim().is_empty() {
        return Err(CatalogError::InvalidInput(
            "name and description are required".to_string(),
        ));
    }
    let place_type_id = draft.place_type_id.unwrap_or(0);
    check_place_type(catalog, place_type_id)?;

    let place = Place {
        id: new_id(),
        creator_id: creator_id.to_string(),
        name: draft.name.trim().to_string(),
        place_type_id,
        description: draft.description.trim().to_string(),
        url: draft.url,
        address: draft.address,
        coordinates: draft.coordinates,
        image: draft.image,
        approved: false,
    };
    store.insert_place(&place).await?;
    info!("visitor {} added place {} ({})", creator_id, place.id, place.name);
    Ok(place)
}

/// Fields left `None` keep their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub place_type_id: Option<i32>,
    pub url: Option<String>,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub image: Option<Vec<u8>>,
}

/// Loads a place the actor created.
pub async fn owned_place(
    store: &dyn Store,
    actor_id: &str,
    place_id: &str,
) -> Result<Place, CatalogError> {
    let place = store
        .find_place(place_id)
        .await?
        .ok_or(CatalogError::NotFound("place"))?;
    if place.creator_id != actor_id {
        warn!("visitor {} tried to modify place {}", actor_id, place_id);
        return Err(CatalogError::Unauthorized);
    }
    Ok(place)
}

pub async fn edit_place(
    store: &dyn Store,
    catalog: &Catalog,
    actor_id: &str,
    place_id: &str,
    patch: PlacePatch,
) -> Result<Place, CatalogError> {
    let mut place = owned_place(store, actor_id, place_id).await?;

    if let Some(type_id) = patch.place_type_id {
        check_place_type(catalog, type_id)?;
        place.place_type_id = type_id;
    }
    if let Some(name) = patch.name.filter(|n| !n.trim().is_empty()) {
        place.name = name.trim().to_string();
    }
    if let Some(description) = patch.description.filter(|d| !d.trim().is_empty()) {
        place.description = description.trim().to_string();
    }
    if patch.url.is_some() {
        place.url = patch.url;
    }
    if patch.address.is_some() {
        place.address = patch.address;
    }
    if patch.coordinates.is_some() {
        place.coordinates = patch.coordinates;
    }
    if patch.image.is_some() {
        place.image = patch.image;
    }

    store.update_place(&place).await?;
    Ok(place)
}

pub async fn place_image(store: &dyn Store, place_id: &str) -> Result<Vec<u8>, CatalogError> {
    store
        .find_place(place_id)
        .await?
        .ok_or(CatalogError::NotFound("place"))?
        .image
        .ok_or(CatalogError::NotFound("image"))
}

/// Replaces the place image. Creator only.
pub async fn set_place_image(
    store: &dyn Store,
    catalog: &Catalog,
    actor_id: &str,
    place_id: &str,
    image: Vec<u8>,
) -> Result<Place, CatalogError> {
    let patch = PlacePatch {
        image: Some(image),
        ..PlacePatch::default()
    };
    edit_place(store, catalog, actor_id, place_id, patch).await
}

pub async fn set_approved(
    store: &dyn Store,
    place_id: &str,
    approved: bool,
) -> Result<(), CatalogError> {
    if !store.set_place_approved(place_id, approved).await? {
        return Err(CatalogError::NotFound("place"));
    }
    info!("place {} approved={}", place_id, approved);
    Ok(())
}

pub async fn delete_place(store: &dyn Store, place_id: &str) -> Result<(), CatalogError> {
    if !store.delete_place(place_id).await? {
        return Err(CatalogError::NotFound("place"));
    }
    info!("place {} deleted", place_id);
    Ok(())
}
