pub mod event;
pub mod order;
pub mod ticket;
pub mod user;

pub use event::{Event, EventSummary, TicketTier};
pub use order::{Order, PurchasedTicket};
pub use ticket::{Ticket, TicketWithEvent};
pub use user::{Role, Session, User};
