//! # Ticketing Core
//!
//! Transaction engine for selling tickets against finite event inventory.
//!
//! ## Concepts
//!
//! - **Inventory ledger**: each event's `available` counter, only mutated
//!   inside a transaction scope ([`ledger`])
//! - **Transaction coordinator**: runs a unit of work atomically and retries
//!   transient storage failures ([`coordinator`])
//! - **Services**: purchase, cancellation, event lifecycle, ticket lookup and
//!   notifications ([`services`])
//! - **Backend traits**: storage is injected through [`store`]; PostgreSQL
//!   and in-memory implementations live in sibling crates
//!
//! ## Invariant
//!
//! For every event, `available` plus the quantity of all active or used
//! tickets equals the event's total capacity, after every operation,
//! including failed ones.
//!
//! ## Example
//!
//! ```ignore
//! use ticketing_core::{EngineConfig, TicketingEngine, environment::SystemClock};
//!
//! let engine = TicketingEngine::new(backend, Arc::new(SystemClock), EngineConfig::default());
//! let ticket = engine.purchases().purchase(customer, event_id, 2).await?;
//! engine.cancellations().cancel(customer, ticket.id).await?;
//! ```

pub mod coordinator;
pub mod engine;
pub mod environment;
pub mod error;
pub mod ledger;
pub mod notification;
pub mod retry;
pub mod services;
pub mod store;
pub mod types;

pub use coordinator::{CoordinatorConfig, ScopeFuture, TransactionCoordinator};
pub use engine::{EngineConfig, TicketingEngine};
pub use error::{ErrorKind, StoreError, TicketingError};
pub use services::{CancellationPolicy, ServiceConfig};
pub use types::{
    Actor, Event, EventId, EventStatus, Money, NewEvent, Notification, NotificationId,
    NotificationKind, Role, Ticket, TicketCode, TicketId, TicketStatus, UserId,
};
