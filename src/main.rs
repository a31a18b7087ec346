use std::sync::Arc;

use catalog::Catalog;
use config::Config;
use db::open_store;
use geocode::Geocoder;
use handlers::{
    handle_callback_query, handle_command, handle_message, handle_photo, AppState, Command,
};
use teloxide::{dispatching::UpdateFilterExt, prelude::*};

mod buckets;
mod catalog;
mod config;
mod db;
mod error;
mod geocode;
mod handlers;
mod ledger;
mod models;
mod overlap;
mod places;
mod reconciler;
mod slots;
mod store;
mod text;

extern crate pretty_env_logger;
#[macro_use] extern crate log;

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("bad configuration: {}", err);
            return;
        }
    };
    let store = match open_store(&config).await {
        Ok(store) => store,
        Err(err) => {
            error!("could not open the database: {}", err);
            return;
        }
    };
    let catalog = match Catalog::load(store.as_ref()).await {
        Ok(catalog) => catalog,
        Err(err) => {
            error!("could not load place types: {}", err);
            return;
        }
    };
    let geocoder = config
        .geocoder_api_key
        .clone()
        .map(|key| Geocoder::new(config.geocoder_url.clone(), key));
    if geocoder.is_none() {
        info!("GEOCODER_API_KEY not set, addresses will not be geocoded");
    }

    let state = Arc::new(AppState {
        store,
        catalog,
        geocoder,
        config,
    });
    let bot = Bot::from_env();

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .branch(dptree::filter(|msg: Message| msg.photo().is_some()).endpoint(handle_photo))
                .branch(dptree::entry().filter_command::<Command>().endpoint(handle_command))
                .branch(dptree::endpoint(handle_message)),
        )
        .branch(Update::filter_callback_query().endpoint(handle_callback_query));

    info!("bot started");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
