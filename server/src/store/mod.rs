//! Persistence port for users, sessions, events, orders and tickets.
//!
//! Handlers only see [`Store`]; the PostgreSQL adapter backs production and
//! the in-memory adapter backs tests and database-less local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Event, Order, Session, Ticket, TicketWithEvent, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Duplicate(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new user. Fails with [`StoreError::Duplicate`] when the email
    /// is already registered.
    async fn create_user(&self, user: &User) -> StoreResult<()>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn create_session(&self, session: &Session) -> StoreResult<()>;

    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>>;

    /// Drop every session that has expired by `now`; returns how many went.
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64>;

    async fn insert_event(&self, event: &Event) -> StoreResult<()>;

    /// All events, soonest first.
    async fn list_events(&self) -> StoreResult<Vec<Event>>;

    async fn list_events_by_organizer(&self, organizer: Uuid) -> StoreResult<Vec<Event>>;

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>>;

    /// Overwrite the stored event. Returns `false` when it no longer exists.
    async fn update_event(&self, event: &Event) -> StoreResult<bool>;

    /// Returns `false` when nothing was deleted.
    async fn delete_event(&self, id: Uuid) -> StoreResult<bool>;

    /// Persist an order together with the tickets issued for it.
    async fn record_purchase(&self, order: &Order, tickets: &[Ticket]) -> StoreResult<()>;

    /// The user's tickets, newest first, joined with their event.
    async fn list_tickets_for_user(&self, user_id: Uuid) -> StoreResult<Vec<TicketWithEvent>>;

    async fn find_ticket_by_code(&self, unique_code: &str) -> StoreResult<Option<Ticket>>;

    /// Flip the checked-in flag if it is still unset. Returns whether this
    /// call performed the transition.
    async fn check_in_ticket(&self, ticket_id: Uuid) -> StoreResult<bool>;
}
