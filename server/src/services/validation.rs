//! Presence and shape checks for request payloads.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::TicketTier;
use crate::utils::error::AppError;

/// A tier as submitted by an organizer. Every field is optional so missing
/// values surface as validation errors rather than JSON rejections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketTierInput {
    #[serde(default, alias = "_id")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Trimmed value, or `None` when absent or blank.
pub fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `local@domain.tld` with no whitespace and a two-letter-or-longer TLD.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty()
        && !host.starts_with('.')
        && !host.ends_with('.')
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Identifiers arrive as strings; anything that is not a UUID cannot name a
/// stored record.
pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

/// Accepts RFC 3339 timestamps, zone-less `YYYY-MM-DDTHH:MM[:SS]` values
/// (read as UTC) and bare dates (midnight UTC).
pub fn parse_event_date(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Ok(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::ValidationError(format!("Invalid event date '{}'", raw)))
}

/// Highest price a single tier may carry.
pub const MAX_TIER_PRICE: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 2);

/// Validate the tiers of a new event. Every tier gets a fresh id; ids sent
/// by the client are ignored.
pub fn build_tiers(inputs: Vec<TicketTierInput>) -> Result<Vec<TicketTier>, AppError> {
    non_empty(&inputs)?;
    inputs
        .into_iter()
        .map(|input| build_tier(input, None))
        .collect()
}

/// Validate the replacement tiers of an existing event. Tiers that carry an
/// id keep it, the rest get a fresh one. The same id may appear only once.
pub fn revise_tiers(inputs: Vec<TicketTierInput>) -> Result<Vec<TicketTier>, AppError> {
    non_empty(&inputs)?;

    let mut seen = HashSet::new();
    inputs
        .into_iter()
        .map(|input| {
            let id = input.id.unwrap_or_else(Uuid::new_v4);
            if !seen.insert(id) {
                return Err(AppError::ValidationError(format!(
                    "Duplicate ticket type id {}",
                    id
                )));
            }
            build_tier(input, Some(id))
        })
        .collect()
}

fn non_empty(inputs: &[TicketTierInput]) -> Result<(), AppError> {
    if inputs.is_empty() {
        return Err(AppError::ValidationError(
            "ticketTypes must be a non-empty array".to_string(),
        ));
    }
    Ok(())
}

fn build_tier(input: TicketTierInput, id: Option<Uuid>) -> Result<TicketTier, AppError> {
    let name = present(input.name)
        .ok_or_else(|| AppError::ValidationError("Ticket type must have a name".to_string()))?;
    let price = input
        .price
        .ok_or_else(|| AppError::ValidationError("Ticket type must have a price".to_string()))?
        .normalize();
    if price < Decimal::ZERO {
        return Err(AppError::ValidationError(
            "Price cannot be negative".to_string(),
        ));
    }
    if price > MAX_TIER_PRICE {
        return Err(AppError::ValidationError(format!(
            "Price cannot exceed {}",
            MAX_TIER_PRICE
        )));
    }
    // Amounts are kept in whole cents end to end.
    if price.scale() > 2 {
        return Err(AppError::ValidationError(
            "Price cannot have more than two decimal places".to_string(),
        ));
    }
    let quantity = input.quantity.ok_or_else(|| {
        AppError::ValidationError("Ticket type must have a quantity".to_string())
    })?;
    if quantity < 0 {
        return Err(AppError::ValidationError(
            "Quantity cannot be negative".to_string(),
        ));
    }
    let quantity = u32::try_from(quantity)
        .map_err(|_| AppError::ValidationError("Quantity is too large".to_string()))?;

    Ok(TicketTier {
        id: id.unwrap_or_else(Uuid::new_v4),
        name,
        price,
        quantity,
    })
}
