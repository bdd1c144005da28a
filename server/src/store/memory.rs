use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{Event, Order, Session, Ticket, TicketWithEvent, User};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    sessions: HashMap<String, Session>,
    events: Vec<Event>,
    orders: Vec<Order>,
    tickets: Vec<Ticket>,
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    pub async fn ticket_count(&self) -> usize {
        self.inner.read().await.tickets.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(
                "User with this email already exists".to_string(),
            ));
        }
        inner.users.push(user.clone());
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_session(&self, session: &Session) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        let inner = self.inner.read().await;
        Ok(inner.sessions.get(token_hash).cloned())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, session| !session.is_expired(now));
        Ok((before - inner.sessions.len()) as u64)
    }

    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        self.inner.write().await.events.push(event.clone());
        Ok(())
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let mut events = self.inner.read().await.events.clone();
        events.sort_by_key(|e| e.date);
        Ok(events)
    }

    async fn list_events_by_organizer(&self, organizer: Uuid) -> StoreResult<Vec<Event>> {
        let inner = self.inner.read().await;
        Ok(inner
            .events
            .iter()
            .filter(|e| e.organizer == organizer)
            .cloned()
            .collect())
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let inner = self.inner.read().await;
        Ok(inner.events.iter().find(|e| e.id == id).cloned())
    }

    async fn update_event(&self, event: &Event) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.events.iter_mut().find(|e| e.id == event.id) {
            Some(stored) => {
                *stored = event.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.events.len();
        inner.events.retain(|e| e.id != id);
        Ok(inner.events.len() != before)
    }

    async fn record_purchase(&self, order: &Order, tickets: &[Ticket]) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let mut codes: HashSet<&str> =
            inner.tickets.iter().map(|t| t.unique_code.as_str()).collect();
        for ticket in tickets {
            if !codes.insert(ticket.unique_code.as_str()) {
                return Err(StoreError::Duplicate(format!(
                    "Redemption code {} already issued",
                    ticket.unique_code
                )));
            }
        }
        inner.orders.push(order.clone());
        inner.tickets.extend_from_slice(tickets);
        Ok(())
    }

    async fn list_tickets_for_user(&self, user_id: Uuid) -> StoreResult<Vec<TicketWithEvent>> {
        let inner = self.inner.read().await;
        let mut owned: Vec<&Ticket> = inner
            .tickets
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(owned
            .into_iter()
            .map(|ticket| TicketWithEvent {
                ticket: ticket.clone(),
                event: inner
                    .events
                    .iter()
                    .find(|e| e.id == ticket.event_id)
                    .map(Event::summary),
            })
            .collect())
    }

    async fn find_ticket_by_code(&self, unique_code: &str) -> StoreResult<Option<Ticket>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tickets
            .iter()
            .find(|t| t.unique_code == unique_code)
            .cloned())
    }

    async fn check_in_ticket(&self, ticket_id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner
            .tickets
            .iter_mut()
            .find(|t| t.id == ticket_id && !t.is_checked_in)
        {
            Some(ticket) => {
                ticket.is_checked_in = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
