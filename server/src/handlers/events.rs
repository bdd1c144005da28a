use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::Organizer;
use crate::models::{Event, User};
use crate::services::validation::{
    build_tiers, parse_event_date, parse_id, present, revise_tiers, TicketTierInput,
};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub ticket_types: Option<Vec<TicketTierInput>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    #[serde(default)]
    pub unique_code: Option<String>,
}

fn event_not_found() -> AppError {
    AppError::NotFound("Event not found".to_string())
}

async fn load_event(state: &AppState, raw_id: &str) -> Result<Event, AppError> {
    let id = parse_id(raw_id).ok_or_else(event_not_found)?;
    state
        .store
        .find_event(id)
        .await?
        .ok_or_else(event_not_found)
}

/// Existence first, then ownership; payload checks come after both.
async fn load_owned_event(
    state: &AppState,
    raw_id: &str,
    caller: &User,
    action: &str,
) -> Result<Event, AppError> {
    let event = load_event(state, raw_id).await?;
    if !event.is_owned_by(caller.id) {
        return Err(AppError::Forbidden(format!(
            "User not authorized to {} this event",
            action
        )));
    }
    Ok(event)
}

pub async fn create_event(
    State(state): State<AppState>,
    Organizer(organizer): Organizer,
    payload: Result<Json<EventRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;

    let (
        Some(title),
        Some(description),
        Some(date),
        Some(location),
        Some(image),
        Some(ticket_types),
    ) = (
        present(payload.title),
        present(payload.description),
        present(payload.date),
        present(payload.location),
        present(payload.image),
        payload.ticket_types,
    )
    else {
        return Err(AppError::ValidationError(
            "Please include all event fields".to_string(),
        ));
    };

    let now = Utc::now();
    let event = Event {
        id: Uuid::new_v4(),
        organizer: organizer.id,
        title,
        description,
        date: parse_event_date(&date)?,
        location,
        image,
        ticket_types: build_tiers(ticket_types)?,
        created_at: now,
        updated_at: now,
    };

    state.store.insert_event(&event).await?;

    info!(
        event_id = %event.id,
        organizer_id = %organizer.id,
        tiers = event.ticket_types.len(),
        "Event created"
    );

    Ok(created(event, "Event created successfully"))
}

pub async fn list_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.store.list_events().await?;
    Ok(success(events, "Events retrieved successfully"))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let event = load_event(&state, &id).await?;
    Ok(success(event, "Event retrieved successfully"))
}

pub async fn my_events(
    State(state): State<AppState>,
    Organizer(organizer): Organizer,
) -> Result<Response, AppError> {
    let events = state.store.list_events_by_organizer(organizer.id).await?;
    Ok(success(events, "Organizer events retrieved successfully"))
}

pub async fn update_event(
    State(state): State<AppState>,
    Organizer(organizer): Organizer,
    Path(id): Path<String>,
    payload: Result<Json<EventRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let mut event = load_owned_event(&state, &id, &organizer, "update").await?;
    let Json(payload) = payload?;

    let ticket_types = payload.ticket_types.ok_or_else(|| {
        AppError::ValidationError("ticketTypes must be a non-empty array".to_string())
    })?;
    event.ticket_types = revise_tiers(ticket_types)?;

    if let Some(title) = present(payload.title) {
        event.title = title;
    }
    if let Some(description) = present(payload.description) {
        event.description = description;
    }
    if let Some(date) = present(payload.date) {
        event.date = parse_event_date(&date)?;
    }
    if let Some(location) = present(payload.location) {
        event.location = location;
    }
    if let Some(image) = present(payload.image) {
        event.image = image;
    }
    event.updated_at = Utc::now();

    if !state.store.update_event(&event).await? {
        return Err(event_not_found());
    }

    info!(event_id = %event.id, organizer_id = %organizer.id, "Event updated");

    Ok(success(event, "Event updated successfully"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Organizer(organizer): Organizer,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let event = load_owned_event(&state, &id, &organizer, "delete").await?;

    if !state.store.delete_event(event.id).await? {
        return Err(event_not_found());
    }

    info!(event_id = %event.id, organizer_id = %organizer.id, "Event removed");

    Ok(empty_success("Event removed"))
}

/// Redeem a ticket at the gate of an event the caller owns.
pub async fn check_in(
    State(state): State<AppState>,
    Organizer(organizer): Organizer,
    Path(id): Path<String>,
    payload: Result<Json<CheckInRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let event = load_owned_event(&state, &id, &organizer, "check in tickets for").await?;
    let Json(payload) = payload?;

    let code = present(payload.unique_code)
        .ok_or_else(|| AppError::ValidationError("uniqueCode is required".to_string()))?;

    let mut ticket = state
        .store
        .find_ticket_by_code(&code)
        .await?
        .filter(|ticket| ticket.event_id == event.id)
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    if ticket.is_checked_in || !state.store.check_in_ticket(ticket.id).await? {
        return Err(AppError::Conflict("Ticket already checked in".to_string()));
    }
    ticket.is_checked_in = true;

    info!(event_id = %event.id, ticket_id = %ticket.id, "Ticket checked in");

    Ok(success(ticket, "Ticket checked in"))
}
