//! Ticket issuance: price a purchase against an event's current tiers and
//! mint one ticket per unit.
//!
//! Tier quantities are neither checked nor decremented, and nothing
//! serialises concurrent purchases against the same tier. Two buyers can
//! jointly oversell a tier; that is the behaviour as built.

use chrono::{DateTime, Utc};
use rand::RngCore;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Event, Order, PurchasedTicket, Ticket};
use crate::utils::error::AppError;

const CODE_BYTES: usize = 12;

/// Most tickets one purchase may mint, across all of its lines.
pub const MAX_UNITS_PER_PURCHASE: u32 = 100;

/// One requested line: a tier of the event and how many units of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseItem {
    pub ticket_type_id: Uuid,
    pub quantity: u32,
}

/// Result of a purchase before it is persisted.
#[derive(Debug, Clone)]
pub struct Issuance {
    pub order: Order,
    pub tickets: Vec<Ticket>,
}

impl Issuance {
    pub fn total_amount(&self) -> Decimal {
        self.order.total_amount
    }
}

/// Random redemption code, rendered client-side as a scannable code.
pub fn mint_redemption_code() -> String {
    let mut bytes = [0u8; CODE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode_upper(bytes)
}

/// Resolve every item against `event`, total up `price × quantity` and build
/// the order snapshot plus its tickets.
///
/// An unknown tier id fails the whole purchase before anything is built.
/// Zero-quantity lines are ignored; a purchase with no units at all, more
/// than [`MAX_UNITS_PER_PURCHASE`] units, or a total that overflows is
/// rejected.
pub fn issue(
    event: &Event,
    buyer: Uuid,
    items: &[PurchaseItem],
    now: DateTime<Utc>,
) -> Result<Issuance, AppError> {
    let mut lines = Vec::with_capacity(items.len());
    let mut total = Decimal::ZERO;
    let mut units: u32 = 0;

    for item in items {
        let tier = event.tier(item.ticket_type_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "Ticket type with id {} not found.",
                item.ticket_type_id
            ))
        })?;
        if item.quantity == 0 {
            continue;
        }
        units = units
            .checked_add(item.quantity)
            .filter(|units| *units <= MAX_UNITS_PER_PURCHASE)
            .ok_or_else(|| {
                AppError::ValidationError(format!(
                    "A purchase is limited to {} tickets.",
                    MAX_UNITS_PER_PURCHASE
                ))
            })?;
        total = tier
            .price
            .checked_mul(Decimal::from(item.quantity))
            .and_then(|line_total| total.checked_add(line_total))
            .ok_or_else(|| {
                AppError::ValidationError("Purchase total is too large.".to_string())
            })?;
        lines.push(PurchasedTicket {
            ticket_type: tier.name.clone(),
            price: tier.price,
            quantity: item.quantity,
        });
    }

    if lines.is_empty() {
        return Err(AppError::ValidationError(
            "Please select at least one ticket.".to_string(),
        ));
    }

    let order_id = Uuid::new_v4();
    let tickets = lines
        .iter()
        .flat_map(|line| (0..line.quantity).map(move |_| line.ticket_type.clone()))
        .map(|ticket_type| Ticket {
            id: Uuid::new_v4(),
            event_id: event.id,
            user_id: buyer,
            order_id: Some(order_id),
            ticket_type,
            unique_code: mint_redemption_code(),
            is_checked_in: false,
            created_at: now,
        })
        .collect();

    Ok(Issuance {
        order: Order {
            id: order_id,
            event_id: event.id,
            user_id: buyer,
            total_amount: total,
            tickets: lines,
            created_at: now,
        },
        tickets,
    })
}

/// Stand-in for a payment provider's client secret.
pub fn fake_client_secret(now: DateTime<Utc>) -> String {
    format!("fake_client_secret_{}", now.timestamp_millis())
}
