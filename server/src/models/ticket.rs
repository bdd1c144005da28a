use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::event::EventSummary;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub order_id: Option<Uuid>,
    /// Tier name at issue time; tickets do not point back at the tier id.
    pub ticket_type: String,
    pub unique_code: String,
    pub is_checked_in: bool,
    pub created_at: DateTime<Utc>,
}

/// A ticket joined with the event it admits to. `event` is `None` once the
/// event has been deleted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketWithEvent {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub event: Option<EventSummary>,
}
