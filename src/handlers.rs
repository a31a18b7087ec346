use std::error::Error;
use std::sync::Arc;

use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton,
    KeyboardMarkup, Me, Message, MessageId,
};
use teloxide::utils::command::BotCommands;

use crate::buckets::clock;
use crate::catalog::{Catalog, SLOT_TYPES};
use crate::config::Config;
use crate::error::{BookingError, CatalogError};
use crate::geocode::{GeocodeError, Geocoder};
use crate::models::{Visitor, MAX_HEADCOUNT, MIN_HEADCOUNT};
use crate::places::{self, PlaceDraft, PlacePatch, PlaceQuery, PLACES_PAGE};
use crate::reconciler;
use crate::slots::{self, SlotDraft, BOOKINGS_PAGE, SLOTS_PAGE};
use crate::store::Store;
use crate::text;

pub type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub catalog: Catalog,
    pub geocoder: Option<Geocoder>,
    pub config: Config,
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "register and show the menu")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "browse places, optionally filtered by name")]
    Places(String),
    #[command(description = "your favourite places")]
    Favourites,
    #[command(description = "places you created")]
    Mine,
    #[command(description = "your bookings by day")]
    Bookings,
    #[command(description = "place and slot types")]
    Types,
    #[command(description = "name | description | type id | address | url")]
    AddPlace(String),
    #[command(description = "place id | name, description, type, address, url or location | value")]
    EditPlace(String),
    #[command(
        description = "place id | slot type | DD.MM.YYYY HH:mm | DD.MM.YYYY HH:mm | max visitors"
    )]
    AddSlot(String),
    #[command(description = "slot id")]
    DeleteSlot(String),
    #[command(description = "address, shows its coordinates")]
    Locate(String),
    #[command(description = "place id, shows the image; as a photo caption, sets it")]
    Image(String),
    #[command(description = "place id | true or false (admins)")]
    Approve(String),
    #[command(description = "place id (admins)")]
    DeletePlace(String),
}

const MENU_PLACES: &str = "📍 Places";
const MENU_FAVOURITES: &str = "★ Favourites";
const MENU_BOOKINGS: &str = "📋 My bookings";
const MENU_MINE: &str = "🏠 My places";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Listing {
    All,
    Favourites,
    Own,
}

impl Listing {
    fn tag(self) -> &'static str {
        match self {
            Listing::All => "all",
            Listing::Favourites => "fav",
            Listing::Own => "own",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "all" => Some(Listing::All),
            "fav" => Some(Listing::Favourites),
            "own" => Some(Listing::Own),
            _ => None,
        }
    }
}

async fn visitor_for(
    state: &AppState,
    chat_id: ChatId,
) -> Result<Visitor, Box<dyn Error + Send + Sync>> {
    Ok(places::issue_visitor(state.store.as_ref(), Some(chat_id.0)).await?)
}

fn main_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(MENU_PLACES), KeyboardButton::new(MENU_FAVOURITES)],
        vec![KeyboardButton::new(MENU_BOOKINGS), KeyboardButton::new(MENU_MINE)],
    ])
    .resize_keyboard()
}

fn invalid(reason: impl Into<String>) -> CatalogError {
    CatalogError::InvalidInput(reason.into())
}

async fn reply_catalog_error(bot: &Bot, chat_id: ChatId, err: CatalogError) -> HandlerResult {
    match text::catalog_rejection(&err) {
        Some(reply) => {
            info!("chat {} rejected: {}", chat_id, err);
            bot.send_message(chat_id, reply).await?;
        }
        None => {
            error!("chat {} failed: {}", chat_id, err);
            bot.send_message(chat_id, text::GENERIC_FAILURE).await?;
        }
    }
    Ok(())
}

async fn reply_booking_error(bot: &Bot, chat_id: ChatId, err: BookingError) -> HandlerResult {
    match text::booking_rejection(&err) {
        Some(reply) => {
            info!("chat {} booking rejected: {}", chat_id, err);
            bot.send_message(chat_id, reply).await?;
        }
        None => {
            error!("chat {} booking failed: {}", chat_id, err);
            bot.send_message(chat_id, text::GENERIC_FAILURE).await?;
        }
    }
    Ok(())
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<AppState>,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let visitor = visitor_for(&state, chat_id).await?;

    match cmd {
        Command::Start => {
            bot.send_message(
                chat_id,
                format!(
                    "Hi! Book a visit to a place, alone or with up to {} friends.\n\n{}",
                    MAX_HEADCOUNT - 1,
                    Command::descriptions()
                ),
            )
            .reply_markup(main_menu())
            .await?;
        }
        Command::Help => {
            bot.send_message(chat_id, Command::descriptions().to_string()).await?;
        }
        Command::Places(name) => {
            let query = PlaceQuery {
                name: Some(name),
                ..PlaceQuery::default()
            };
            send_places(&bot, chat_id, None, &state, &visitor, Listing::All, query).await?;
        }
        Command::Favourites => {
            send_listing(&bot, chat_id, None, &state, &visitor, Listing::Favourites, 0).await?;
        }
        Command::Mine => {
            send_listing(&bot, chat_id, None, &state, &visitor, Listing::Own, 0).await?;
        }
        Command::Bookings => {
            send_bookings(&bot, chat_id, None, &state, &visitor, 0).await?;
        }
        Command::Types => {
            let mut message = String::from("Place types:\n");
            for place_type in state.catalog.place_types() {
                message.push_str(&format!("{} - {}\n", place_type.id, place_type.name));
            }
            message.push_str("\nSlot types:\n");
            for slot_type in SLOT_TYPES {
                message.push_str(&format!("{}\n", slot_type.name));
            }
            bot.send_message(chat_id, message).await?;
        }
        Command::AddPlace(args) => add_place(&bot, chat_id, &state, &visitor, &args).await?,
        Command::EditPlace(args) => edit_place(&bot, chat_id, &state, &visitor, &args).await?,
        Command::AddSlot(args) => add_slot(&bot, chat_id, &state, &visitor, &args).await?,
        Command::DeleteSlot(slot_id) => {
            match slots::delete_slot(state.store.as_ref(), &visitor.id, slot_id.trim()).await {
                Ok(removed) => {
                    let reply = format!("🗑 Slot deleted, {removed} bookings removed.");
                    bot.send_message(chat_id, reply).await?;
                }
                Err(err) => reply_catalog_error(&bot, chat_id, err).await?,
            }
        }
        Command::Locate(address) => locate(&bot, chat_id, &state, &address).await?,
        Command::Image(place_id) => {
            match places::place_image(state.store.as_ref(), place_id.trim()).await {
                Ok(image) => {
                    bot.send_photo(chat_id, InputFile::memory(image)).await?;
                }
                Err(err) => reply_catalog_error(&bot, chat_id, err).await?,
            }
        }
        Command::Approve(args) => {
            if !state.config.is_admin(chat_id.0) {
                return reply_catalog_error(&bot, chat_id, CatalogError::Unauthorized).await;
            }
            let parts = text::fields(&args);
            let (Some(place_id), Some(approved)) = (
                parts.first().filter(|id| !id.is_empty()),
                parts.get(1).and_then(|raw| text::parse_bool(raw)),
            ) else {
                bot.send_message(chat_id, "Usage: /approve place id | true or false").await?;
                return Ok(());
            };
            match places::set_approved(state.store.as_ref(), place_id, approved).await {
                Ok(()) => {
                    bot.send_message(chat_id, format!("Place {place_id} approved: {approved}"))
                        .await?;
                }
                Err(err) => reply_catalog_error(&bot, chat_id, err).await?,
            }
        }
        Command::DeletePlace(place_id) => {
            if !state.config.is_admin(chat_id.0) {
                return reply_catalog_error(&bot, chat_id, CatalogError::Unauthorized).await;
            }
            match places::delete_place(state.store.as_ref(), place_id.trim()).await {
                Ok(()) => {
                    bot.send_message(chat_id, "🗑 Place deleted").await?;
                }
                Err(err) => reply_catalog_error(&bot, chat_id, err).await?,
            }
        }
    }
    Ok(())
}

/// Photos captioned `/image <place id>` replace the place's image.
pub async fn handle_photo(bot: Bot, msg: Message, me: Me, state: Arc<AppState>) -> HandlerResult {
    let chat_id = msg.chat.id;
    let caption = msg.caption().unwrap_or_default();
    let Ok(Command::Image(place_id)) = Command::parse(caption, me.username()) else {
        bot.send_message(chat_id, "To set a place image, caption the photo with /image <place id>")
            .await?;
        return Ok(());
    };
    // the last size is the largest
    let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) else {
        return Ok(());
    };

    let visitor = visitor_for(&state, chat_id).await?;
    let file = bot.get_file(photo.file.id.clone()).await?;
    let mut image = Vec::new();
    bot.download_file(&file.path, &mut image).await?;

    let updated = places::set_place_image(
        state.store.as_ref(),
        &state.catalog,
        &visitor.id,
        place_id.trim(),
        image,
    )
    .await;
    match updated {
        Ok(place) => {
            bot.send_message(chat_id, format!("🖼 Image of {} updated", place.name)).await?;
        }
        Err(err) => reply_catalog_error(&bot, chat_id, err).await?,
    }
    Ok(())
}

/// Plain text: menu buttons, anything else gets the help.
pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> HandlerResult {
    let chat_id = msg.chat.id;
    let visitor = visitor_for(&state, chat_id).await?;

    match msg.text().unwrap_or_default() {
        MENU_PLACES => send_listing(&bot, chat_id, None, &state, &visitor, Listing::All, 0).await?,
        MENU_FAVOURITES => {
            send_listing(&bot, chat_id, None, &state, &visitor, Listing::Favourites, 0).await?
        }
        MENU_BOOKINGS => send_bookings(&bot, chat_id, None, &state, &visitor, 0).await?,
        MENU_MINE => send_listing(&bot, chat_id, None, &state, &visitor, Listing::Own, 0).await?,
        _ => {
            bot.send_message(chat_id, Command::descriptions().to_string())
                .reply_markup(main_menu())
                .await?;
        }
    }
    Ok(())
}

pub async fn handle_callback_query(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(msg) = q.message.as_ref().and_then(|m| m.regular_message()) else {
        return Ok(());
    };
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    debug!("callback query {:?} from chat {}", data, msg.chat.id);

    let chat_id = msg.chat.id;
    let visitor = visitor_for(&state, chat_id).await?;
    let parts: Vec<&str> = data.split(':').collect();

    match parts.as_slice() {
        ["places", tag, skip] => {
            if let (Some(listing), Ok(skip)) = (Listing::from_tag(tag), skip.parse::<i64>()) {
                send_listing(&bot, chat_id, Some(msg.id), &state, &visitor, listing, skip).await?;
            }
        }
        ["fav", place_id] => {
            match places::toggle_favourite(state.store.as_ref(), &visitor.id, place_id).await {
                Ok(true) => {
                    bot.send_message(chat_id, "★ Added to favourites").await?;
                }
                Ok(false) => {
                    bot.send_message(chat_id, "☆ Removed from favourites").await?;
                }
                Err(err) => reply_catalog_error(&bot, chat_id, err).await?,
            }
        }
        ["slots", place_id, skip] => {
            let skip = skip.parse::<i64>().unwrap_or(0);
            send_slots(&bot, chat_id, Some(msg.id), &state, &visitor, place_id, skip).await?;
        }
        ["slot", slot_id] => send_headcount_picker(&bot, chat_id, &state, slot_id).await?,
        ["book", slot_id, headcount] => {
            let Ok(headcount) = headcount.parse::<i32>() else {
                return Ok(());
            };
            match reconciler::reserve(state.store.as_ref(), &visitor.id, slot_id, headcount).await {
                Ok(reservation) => {
                    bot.send_message(chat_id, text::reservation(&reservation)).await?;
                }
                Err(err) => reply_booking_error(&bot, chat_id, err).await?,
            }
        }
        ["cancel", slot_id] => {
            let cancelled = reconciler::cancel(state.store.as_ref(), &visitor.id, slot_id).await;
            match cancelled {
                Ok(Some(_)) => {
                    bot.send_message(chat_id, "🗑 Booking cancelled").await?;
                }
                Ok(None) => {
                    bot.send_message(chat_id, "You had no booking on this slot").await?;
                }
                Err(err) => reply_booking_error(&bot, chat_id, err.into()).await?,
            }
        }
        ["bookings", skip] => {
            let skip = skip.parse::<i64>().unwrap_or(0);
            send_bookings(&bot, chat_id, Some(msg.id), &state, &visitor, skip).await?;
        }
        _ => warn!("unknown callback data {:?}", data),
    }
    Ok(())
}

/// Sends a fresh message, or edits `edit` in place when paging.
async fn show(
    bot: &Bot,
    chat_id: ChatId,
    edit: Option<MessageId>,
    message: String,
    keyboard: InlineKeyboardMarkup,
) -> HandlerResult {
    match edit {
        Some(message_id) => {
            bot.edit_message_text(chat_id, message_id, message)
                .reply_markup(keyboard)
                .await?;
        }
        None => {
            bot.send_message(chat_id, message).reply_markup(keyboard).await?;
        }
    }
    Ok(())
}

fn nav_row(skip: i64, page: i64, shown: usize, prefix: &str) -> Vec<InlineKeyboardButton> {
    let mut nav = Vec::new();
    if skip > 0 {
        nav.push(InlineKeyboardButton::callback(
            "⬅️ Back",
            format!("{prefix}:{}", (skip - page).max(0)),
        ));
    }
    if shown as i64 >= page {
        nav.push(InlineKeyboardButton::callback(
            "Next ➡️",
            format!("{prefix}:{}", skip + page),
        ));
    }
    nav
}

async fn send_listing(
    bot: &Bot,
    chat_id: ChatId,
    edit: Option<MessageId>,
    state: &AppState,
    visitor: &Visitor,
    listing: Listing,
    skip: i64,
) -> HandlerResult {
    let query = PlaceQuery {
        skip,
        ..PlaceQuery::default()
    };
    send_places(bot, chat_id, edit, state, visitor, listing, query).await
}

async fn send_places(
    bot: &Bot,
    chat_id: ChatId,
    edit: Option<MessageId>,
    state: &AppState,
    visitor: &Visitor,
    listing: Listing,
    mut query: PlaceQuery,
) -> HandlerResult {
    query.only_favourites = listing == Listing::Favourites;
    query.own = listing == Listing::Own;
    // strangers only see approved places
    if listing == Listing::All && !state.config.is_admin(chat_id.0) {
        query.approved = Some(true);
    }
    let searching = query.name.as_deref().is_some_and(|n| !n.trim().is_empty());

    let store = state.store.as_ref();
    let found = match places::list_places(store, &state.catalog, Some(&visitor.id), &query).await {
        Ok(found) => found,
        Err(err) => return reply_catalog_error(bot, chat_id, err).await,
    };

    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = found
        .iter()
        .map(|place| {
            vec![
                InlineKeyboardButton::callback(
                    format!("🗓 {}", place.name),
                    format!("slots:{}:0", place.id),
                ),
                InlineKeyboardButton::callback(
                    if place.is_favourite { "★" } else { "☆" },
                    format!("fav:{}", place.id),
                ),
            ]
        })
        .collect();
    if !searching {
        let nav = nav_row(
            query.skip,
            PLACES_PAGE,
            found.len(),
            &format!("places:{}", listing.tag()),
        );
        if !nav.is_empty() {
            keyboard.push(nav);
        }
    }

    show(bot, chat_id, edit, text::places(&found), InlineKeyboardMarkup::new(keyboard)).await
}

async fn send_bookings(
    bot: &Bot,
    chat_id: ChatId,
    edit: Option<MessageId>,
    state: &AppState,
    visitor: &Visitor,
    skip: i64,
) -> HandlerResult {
    let buckets = slots::my_bookings(state.store.as_ref(), &visitor.id, skip).await?;

    let mut keyboard = Vec::new();
    let mut shown = 0;
    for (day, records) in buckets.iter() {
        for record in records {
            shown += 1;
            keyboard.push(vec![InlineKeyboardButton::callback(
                format!("❌ {} {} {}", record.name, day, record.start_time),
                format!("cancel:{}", record.slot_id),
            )]);
        }
    }
    let nav = nav_row(skip, BOOKINGS_PAGE, shown, "bookings");
    if !nav.is_empty() {
        keyboard.push(nav);
    }

    show(bot, chat_id, edit, text::visits(&buckets), InlineKeyboardMarkup::new(keyboard)).await
}

async fn send_slots(
    bot: &Bot,
    chat_id: ChatId,
    edit: Option<MessageId>,
    state: &AppState,
    visitor: &Visitor,
    place_id: &str,
    skip: i64,
) -> HandlerResult {
    let store = state.store.as_ref();
    let buckets = match slots::place_slots(store, &visitor.id, place_id, skip).await {
        Ok(buckets) => buckets,
        Err(err) => return reply_catalog_error(bot, chat_id, err).await,
    };
    let place_name = store
        .find_place(place_id)
        .await?
        .map(|p| p.name)
        .unwrap_or_default();

    let mut keyboard = Vec::new();
    let mut shown = 0;
    for (day, records) in buckets.iter() {
        for record in records {
            shown += 1;
            let mark = if record.is_planned { "✅ " } else { "" };
            keyboard.push(vec![InlineKeyboardButton::callback(
                format!(
                    "{mark}{} {}-{} ({}/{})",
                    day, record.from, record.to, record.occupied_slots, record.max_slots
                ),
                format!("slot:{}", record.id),
            )]);
        }
    }
    let nav = nav_row(skip, SLOTS_PAGE, shown, &format!("slots:{place_id}"));
    if !nav.is_empty() {
        keyboard.push(nav);
    }

    show(
        bot,
        chat_id,
        edit,
        text::slots(&place_name, &buckets),
        InlineKeyboardMarkup::new(keyboard),
    )
    .await
}

async fn send_headcount_picker(
    bot: &Bot,
    chat_id: ChatId,
    state: &AppState,
    slot_id: &str,
) -> HandlerResult {
    let Some(slot) = state.store.find_slot(slot_id).await? else {
        let err = BookingError::SlotNotFound(slot_id.to_string());
        return reply_booking_error(bot, chat_id, err).await;
    };

    let counts: Vec<InlineKeyboardButton> = (MIN_HEADCOUNT..=MAX_HEADCOUNT)
        .map(|n| InlineKeyboardButton::callback(n.to_string(), format!("book:{}:{}", slot.id, n)))
        .collect();
    let keyboard = InlineKeyboardMarkup::new(vec![
        counts,
        vec![
            InlineKeyboardButton::callback("❌ Cancel booking", format!("cancel:{}", slot.id)),
            InlineKeyboardButton::callback("⟵ Back", format!("slots:{}:0", slot.place_id)),
        ],
    ]);

    bot.send_message(
        chat_id,
        format!(
            "{} - {}, {} of {} places free.\nHow many people, you included?",
            clock(slot.starts),
            clock(slot.ends),
            slot.free(),
            slot.max_visitors
        ),
    )
    .reply_markup(keyboard)
    .await?;
    Ok(())
}

async fn add_place(
    bot: &Bot,
    chat_id: ChatId,
    state: &AppState,
    visitor: &Visitor,
    args: &str,
) -> HandlerResult {
    let parts = text::fields(args);
    let field = |i: usize| {
        parts
            .get(i)
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
    };

    let place_type_id = match field(2).map(|raw| raw.parse::<i32>()) {
        Some(Ok(id)) => Some(id),
        Some(Err(_)) => {
            return reply_catalog_error(bot, chat_id, invalid("type id must be a number")).await;
        }
        None => None,
    };
    let address = field(3);
    let coordinates = match (&state.geocoder, &address) {
        (Some(geocoder), Some(address)) => match geocoder.locate(address).await {
            Ok(found) => Some(found),
            Err(err) => {
                warn!("could not geocode {:?}: {}", address, err);
                None
            }
        },
        _ => None,
    };

    let draft = PlaceDraft {
        name: field(0).unwrap_or_default(),
        description: field(1).unwrap_or_default(),
        place_type_id,
        url: field(4),
        address,
        coordinates,
        image: None,
    };
    match places::add_place(state.store.as_ref(), &state.catalog, &visitor.id, draft).await {
        Ok(place) => {
            bot.send_message(
                chat_id,
                format!(
                    "✅ Place {} created, it will be listed once approved.\nid: {}\nAdd slots with /addslot {} | type | from | to | max",
                    place.name, place.id, place.id
                ),
            )
            .await?;
        }
        Err(err) => reply_catalog_error(bot, chat_id, err).await?,
    }
    Ok(())
}

async fn edit_place(
    bot: &Bot,
    chat_id: ChatId,
    state: &AppState,
    visitor: &Visitor,
    args: &str,
) -> HandlerResult {
    let parts = text::fields(args);
    let [place_id, field, value] = parts.as_slice() else {
        bot.send_message(chat_id, "Usage: /editplace place id | field | value").await?;
        return Ok(());
    };

    let mut patch = PlacePatch::default();
    match field.to_lowercase().as_str() {
        "name" => patch.name = Some(value.to_string()),
        "description" => patch.description = Some(value.to_string()),
        "address" => patch.address = Some(value.to_string()),
        "url" | "www" => patch.url = Some(value.to_string()),
        "type" => match value.parse::<i32>() {
            Ok(id) => patch.place_type_id = Some(id),
            Err(_) => {
                return reply_catalog_error(bot, chat_id, invalid("type id must be a number")).await;
            }
        },
        "location" => match text::parse_coordinates(value) {
            Some(coordinates) => patch.coordinates = Some(coordinates),
            None => {
                return reply_catalog_error(bot, chat_id, invalid("location must be lat,lng")).await;
            }
        },
        other => {
            let err = invalid(format!("unknown field {other}"));
            return reply_catalog_error(bot, chat_id, err).await;
        }
    }

    let store = state.store.as_ref();
    match places::edit_place(store, &state.catalog, &visitor.id, place_id, patch).await {
        Ok(place) => {
            bot.send_message(chat_id, format!("✅ {} updated", place.name)).await?;
        }
        Err(err) => reply_catalog_error(bot, chat_id, err).await?,
    }
    Ok(())
}

async fn add_slot(
    bot: &Bot,
    chat_id: ChatId,
    state: &AppState,
    visitor: &Visitor,
    args: &str,
) -> HandlerResult {
    let parts = text::fields(args);
    let [place_id, type_name, from, to, max] = parts.as_slice() else {
        bot.send_message(
            chat_id,
            "Usage: /addslot place id | slot type | DD.MM.YYYY HH:mm | DD.MM.YYYY HH:mm | max visitors",
        )
        .await?;
        return Ok(());
    };

    let (Some(starts), Some(ends)) = (text::parse_datetime(from), text::parse_datetime(to)) else {
        let err = invalid("dates must look like 31.12.2024 18:00");
        return reply_catalog_error(bot, chat_id, err).await;
    };
    let Ok(max_visitors) = max.parse::<i32>() else {
        return reply_catalog_error(bot, chat_id, invalid("max visitors must be a number")).await;
    };

    let draft = SlotDraft {
        type_name: type_name.to_string(),
        starts,
        ends,
        max_visitors,
    };
    match slots::add_slot(state.store.as_ref(), &visitor.id, place_id, draft).await {
        Ok(slot) => {
            bot.send_message(
                chat_id,
                format!(
                    "✅ Slot {} - {} added for {} visitors.\nid: {}",
                    clock(slot.starts),
                    clock(slot.ends),
                    slot.max_visitors,
                    slot.id
                ),
            )
            .await?;
        }
        Err(err) => reply_catalog_error(bot, chat_id, err).await?,
    }
    Ok(())
}

async fn locate(bot: &Bot, chat_id: ChatId, state: &AppState, address: &str) -> HandlerResult {
    let Some(geocoder) = &state.geocoder else {
        bot.send_message(chat_id, "Address lookup is not configured").await?;
        return Ok(());
    };

    let reply = match geocoder.locate(address).await {
        Ok(found) => format!("📍 {}", text::coordinates(found)),
        Err(GeocodeError::EmptyAddress) => "Usage: /locate address".to_string(),
        Err(GeocodeError::LocationNotFound) => "❌ Location not found!".to_string(),
        Err(err @ GeocodeError::Unavailable(_)) => {
            error!("geocoding {:?} failed: {}", address, err);
            "❌ Can't connect to the address service".to_string()
        }
    };
    bot.send_message(chat_id, reply).await?;
    Ok(())
}
