use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::Attendee;
use crate::models::Ticket;
use crate::services::issuance::{fake_client_secret, issue, PurchaseItem};
use crate::services::validation::{parse_id, present};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLine {
    pub ticket_type_id: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub tickets: Option<Vec<PurchaseLine>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub client_secret: String,
    pub message: &'static str,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub order_id: Uuid,
    pub tickets: Vec<Ticket>,
}

fn tier_not_found(raw: &str) -> AppError {
    AppError::NotFound(format!("Ticket type with id {} not found.", raw))
}

/// Simulated checkout: price the request, mint tickets, skip the payment.
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Attendee(attendee): Attendee,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;

    let (Some(event_id), Some(lines)) = (
        present(payload.event_id),
        payload.tickets.filter(|lines| !lines.is_empty()),
    ) else {
        return Err(AppError::ValidationError(
            "Missing eventId or ticket information.".to_string(),
        ));
    };

    let not_found = || AppError::NotFound("Event not found.".to_string());
    let event_id = parse_id(&event_id).ok_or_else(not_found)?;
    let event = state
        .store
        .find_event(event_id)
        .await?
        .ok_or_else(not_found)?;

    let items = lines
        .iter()
        .map(|line| {
            parse_id(&line.ticket_type_id)
                .map(|ticket_type_id| PurchaseItem {
                    ticket_type_id,
                    quantity: line.quantity,
                })
                .ok_or_else(|| tier_not_found(&line.ticket_type_id))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let now = Utc::now();
    let issuance = issue(&event, attendee.id, &items, now)?;
    state
        .store
        .record_purchase(&issuance.order, &issuance.tickets)
        .await?;

    info!(
        event_id = %event.id,
        user_id = %attendee.id,
        order_id = %issuance.order.id,
        tickets = issuance.tickets.len(),
        total = %issuance.total_amount(),
        "Payment simulated, tickets issued"
    );

    let receipt = PurchaseReceipt {
        client_secret: fake_client_secret(now),
        message: "Payment simulated successfully",
        total_amount: issuance.total_amount(),
        order_id: issuance.order.id,
        tickets: issuance.tickets,
    };

    Ok(created(receipt, "Payment simulated successfully"))
}

pub async fn my_tickets(
    State(state): State<AppState>,
    Attendee(attendee): Attendee,
) -> Result<Response, AppError> {
    let tickets = state.store.list_tickets_for_user(attendee.id).await?;
    Ok(success(tickets, "Tickets retrieved successfully"))
}
