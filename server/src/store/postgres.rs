use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Event, EventSummary, Order, Role, Session, Ticket, TicketTier, TicketWithEvent, User,
};

const EVENT_COLUMNS: &str = "id, organizer_id, title, description, date, location, image, \
     ticket_types, created_at, updated_at";

const TICKET_COLUMNS: &str =
    "id, event_id, user_id, order_id, ticket_type, unique_code, is_checked_in, created_at";

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?;
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct SessionRow {
    token_hash: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            token_hash: row.token_hash,
            user_id: row.user_id,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct EventRow {
    id: Uuid,
    organizer_id: Uuid,
    title: String,
    description: String,
    date: DateTime<Utc>,
    location: String,
    image: String,
    ticket_types: Json<Vec<TicketTier>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            organizer: row.organizer_id,
            title: row.title,
            description: row.description,
            date: row.date,
            location: row.location,
            image: row.image,
            ticket_types: row.ticket_types.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct TicketRow {
    id: Uuid,
    event_id: Uuid,
    user_id: Uuid,
    order_id: Option<Uuid>,
    ticket_type: String,
    unique_code: String,
    is_checked_in: bool,
    created_at: DateTime<Utc>,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Ticket {
            id: row.id,
            event_id: row.event_id,
            user_id: row.user_id,
            order_id: row.order_id,
            ticket_type: row.ticket_type,
            unique_code: row.unique_code,
            is_checked_in: row.is_checked_in,
            created_at: row.created_at,
        }
    }
}

/// Ticket columns plus the nullable side of a `LEFT JOIN events`.
#[derive(FromRow)]
struct TicketEventRow {
    #[sqlx(flatten)]
    ticket: TicketRow,
    ev_id: Option<Uuid>,
    ev_title: Option<String>,
    ev_date: Option<DateTime<Utc>>,
    ev_location: Option<String>,
    ev_image: Option<String>,
}

impl From<TicketEventRow> for TicketWithEvent {
    fn from(row: TicketEventRow) -> Self {
        let event = match (row.ev_id, row.ev_title, row.ev_date, row.ev_location, row.ev_image) {
            (Some(id), Some(title), Some(date), Some(location), Some(image)) => {
                Some(EventSummary {
                    id,
                    title,
                    date,
                    location,
                    image,
                })
            }
            _ => None,
        };
        TicketWithEvent {
            ticket: row.ticket.into(),
            event,
        }
    }
}

fn map_unique_violation(err: sqlx::Error, message: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(message.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool and bring the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        tracing::info!("Successfully connected to database");

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;

        tracing::info!("Migrations run successfully");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "User with this email already exists"))?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, role, created_at, updated_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, role, created_at, updated_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn create_session(&self, session: &Session) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, expires_at, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.token_hash)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT token_hash, user_id, expires_at, created_at \
             FROM sessions WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Session::from))
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO events ({EVENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(event.id)
        .bind(event.organizer)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.location)
        .bind(&event.image)
        .bind(Json(&event.ticket_types))
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY date ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn list_events_by_organizer(&self, organizer: Uuid) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE organizer_id = $1 ORDER BY created_at ASC"
        ))
        .bind(organizer)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Event::from))
    }

    async fn update_event(&self, event: &Event) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE events SET title = $2, description = $3, date = $4, location = $5, \
             image = $6, ticket_types = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.location)
        .bind(&event.image)
        .bind(Json(&event.ticket_types))
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_purchase(&self, order: &Order, tickets: &[Ticket]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, event_id, user_id, total_amount, tickets, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(order.id)
        .bind(order.event_id)
        .bind(order.user_id)
        .bind(order.total_amount)
        .bind(Json(&order.tickets))
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for ticket in tickets {
            sqlx::query(&format!(
                "INSERT INTO tickets ({TICKET_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
            ))
            .bind(ticket.id)
            .bind(ticket.event_id)
            .bind(ticket.user_id)
            .bind(ticket.order_id)
            .bind(&ticket.ticket_type)
            .bind(&ticket.unique_code)
            .bind(ticket.is_checked_in)
            .bind(ticket.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                map_unique_violation(
                    e,
                    &format!("Redemption code {} already issued", ticket.unique_code),
                )
            })?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_tickets_for_user(&self, user_id: Uuid) -> StoreResult<Vec<TicketWithEvent>> {
        let rows = sqlx::query_as::<_, TicketEventRow>(
            "SELECT t.id, t.event_id, t.user_id, t.order_id, t.ticket_type, t.unique_code, \
                    t.is_checked_in, t.created_at, \
                    e.id AS ev_id, e.title AS ev_title, e.date AS ev_date, \
                    e.location AS ev_location, e.image AS ev_image \
             FROM tickets t \
             LEFT JOIN events e ON e.id = t.event_id \
             WHERE t.user_id = $1 \
             ORDER BY t.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TicketWithEvent::from).collect())
    }

    async fn find_ticket_by_code(&self, unique_code: &str) -> StoreResult<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE unique_code = $1"
        ))
        .bind(unique_code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Ticket::from))
    }

    async fn check_in_ticket(&self, ticket_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE tickets SET is_checked_in = TRUE WHERE id = $1 AND is_checked_in = FALSE",
        )
        .bind(ticket_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
