//! Domain types for the ticketing engine.
//!
//! Identifiers, the requesting actor, and the three persisted entities:
//! [`Event`] (which owns the inventory ledger counter), [`Ticket`] and
//! [`Notification`].

use crate::error::{StoreError, TicketingError};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an event
    EventId
);
uuid_id!(
    /// Unique identifier for a ticket
    TicketId
);
uuid_id!(
    /// Unique identifier for a user (customer or organizer)
    UserId
);
uuid_id!(
    /// Unique identifier for a notification
    NotificationId
);

// ============================================================================
// Actor (identity supplied by the auth service)
// ============================================================================

/// Role carried by an authenticated user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Buys tickets
    #[serde(alias = "user")]
    Customer,
    /// Creates and runs events
    Organizer,
}

impl Role {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Organizer => "organizer",
        }
    }
}

impl FromStr for Role {
    type Err = TicketingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" | "user" => Ok(Self::Customer),
            "organizer" => Ok(Self::Organizer),
            other => Err(TicketingError::Validation(format!("unknown role: {other}"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The already-verified caller of an operation (`currentUser`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Authenticated user
    pub user_id: UserId,
    /// Role granted by the auth service
    pub role: Role,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Shorthand for a customer actor.
    #[must_use]
    pub const fn customer(user_id: UserId) -> Self {
        Self::new(user_id, Role::Customer)
    }

    /// Shorthand for an organizer actor.
    #[must_use]
    pub const fn organizer(user_id: UserId) -> Self {
        Self::new(user_id, Role::Organizer)
    }

    /// Fails with `Forbidden` unless the actor holds `role`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::Forbidden`] on a role mismatch.
    pub fn require(&self, role: Role, action: &str) -> Result<(), TicketingError> {
        if self.role == role {
            Ok(())
        } else {
            Err(TicketingError::Forbidden(format!(
                "only a {role} may {action}"
            )))
        }
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Event
// ============================================================================

/// Lifecycle status of an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Created, not yet on sale
    Draft,
    /// On sale
    Published,
    /// Called off; no further sales
    Cancelled,
}

impl EventStatus {
    /// Convert status to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse status from database string.
    ///
    /// # Errors
    ///
    /// Returns error if the string doesn't match a known status.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(StoreError::Database(format!("Invalid event status: {s}"))),
        }
    }
}

/// Longest accepted event title.
pub const MAX_TITLE_LEN: usize = 200;

/// How far ahead an event may be scheduled.
pub const MAX_SCHEDULE_AHEAD_DAYS: i64 = 365;

/// Largest capacity a stored inventory counter can hold.
pub const MAX_CAPACITY: u32 = i32::MAX.unsigned_abs();

/// Largest ticket price, in cents, a stored price can hold.
pub const MAX_PRICE_CENTS: u64 = i64::MAX.unsigned_abs();

/// An event with finite ticket inventory.
///
/// `available` is the inventory ledger counter. It is only ever written
/// through [`crate::ledger::InventoryLedger`] inside a transaction scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event ID
    pub id: EventId,
    /// Owning organizer
    pub organizer_id: UserId,
    /// Display title
    pub title: String,
    /// Scheduled start
    pub date: DateTime<Utc>,
    /// Total capacity (immutable)
    pub total_capacity: u32,
    /// Tickets still available
    pub available: u32,
    /// Unit price
    pub price: Money,
    /// Lifecycle status
    pub status: EventStatus,
    /// When the event was created
    pub created_at: DateTime<Utc>,
}

/// Organizer input for a new event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Display title
    pub title: String,
    /// Scheduled start
    pub date: DateTime<Utc>,
    /// Total capacity
    pub capacity: u32,
    /// Unit price in cents
    pub price_cents: u64,
}

impl NewEvent {
    /// Checks the request against the creation rules at time `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::Validation`] for an empty or overlong title,
    /// zero or oversized capacity, an oversized price, or a date that is not strictly in the future (or more
    /// than a year ahead).
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), TicketingError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(TicketingError::Validation("title is required".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(TicketingError::Validation(format!(
                "title cannot exceed {MAX_TITLE_LEN} characters"
            )));
        }
        if self.capacity == 0 {
            return Err(TicketingError::Validation(
                "capacity must be greater than zero".to_string(),
            ));
        }
        if self.capacity > MAX_CAPACITY {
            return Err(TicketingError::Validation(format!(
                "capacity cannot exceed {MAX_CAPACITY}"
            )));
        }
        if self.price_cents > MAX_PRICE_CENTS {
            return Err(TicketingError::Validation(format!(
                "price cannot exceed {MAX_PRICE_CENTS} cents"
            )));
        }
        if self.date <= now {
            return Err(TicketingError::Validation(
                "event date must be in the future".to_string(),
            ));
        }
        if self.date > now + Duration::days(MAX_SCHEDULE_AHEAD_DAYS) {
            return Err(TicketingError::Validation(format!(
                "event date cannot be more than {MAX_SCHEDULE_AHEAD_DAYS} days ahead"
            )));
        }
        Ok(())
    }

    /// Builds the draft event; `available` starts equal to capacity.
    #[must_use]
    pub fn into_event(self, organizer_id: UserId, now: DateTime<Utc>) -> Event {
        Event {
            id: EventId::new(),
            organizer_id,
            title: self.title.trim().to_string(),
            date: self.date,
            total_capacity: self.capacity,
            available: self.capacity,
            price: Money::from_cents(self.price_cents),
            status: EventStatus::Draft,
            created_at: now,
        }
    }
}

// ============================================================================
// Ticket
// ============================================================================

/// Status of an issued ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Valid, counts against inventory
    Active,
    /// Checked in at the door; still counts against inventory
    Used,
    /// Returned; inventory was re-credited
    Cancelled,
}

impl TicketStatus {
    /// Convert status to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Used => "used",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse status from database string.
    ///
    /// # Errors
    ///
    /// Returns error if the string doesn't match a known status.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "active" => Ok(Self::Active),
            "used" => Ok(Self::Used),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(StoreError::Database(format!("Invalid ticket status: {s}"))),
        }
    }

    /// Whether the ticket still holds inventory.
    #[must_use]
    pub const fn holds_inventory(&self) -> bool {
        matches!(self, Self::Active | Self::Used)
    }
}

/// Unambiguous alphabet for ticket codes (no 0/O, 1/I/L).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_GROUP_LEN: usize = 4;
const CODE_PREFIX: &str = "TKT";

/// Human-presentable ticket code, e.g. `TKT-7KQ2-MX9P`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketCode(String);

impl TicketCode {
    /// Generates a random code.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut group = || -> String {
            (0..CODE_GROUP_LEN)
                .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
                .collect()
        };
        let first = group();
        let second = group();
        Self(format!("{CODE_PREFIX}-{first}-{second}"))
    }

    /// Parses user input, normalising case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::Validation`] if the input is not a ticket code.
    pub fn parse(input: &str) -> Result<Self, TicketingError> {
        let normalized = input.trim().to_ascii_uppercase();
        let mut parts = normalized.split('-');
        let well_formed = parts.next() == Some(CODE_PREFIX)
            && parts.by_ref().take(2).all(|group| {
                group.len() == CODE_GROUP_LEN && group.bytes().all(|b| CODE_ALPHABET.contains(&b))
            })
            && parts.next().is_none()
            && normalized.len() == CODE_PREFIX.len() + 2 * (CODE_GROUP_LEN + 1);

        if well_formed {
            Ok(Self(normalized))
        } else {
            Err(TicketingError::Validation(format!(
                "invalid ticket code: {input}"
            )))
        }
    }

    /// The code as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rehydrates a stored code without validation.
    #[must_use]
    pub const fn from_stored(code: String) -> Self {
        Self(code)
    }
}

impl fmt::Display for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An issued ticket. Quantity is fixed at issue time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket ID
    pub id: TicketId,
    /// Event the ticket admits to
    pub event_id: EventId,
    /// Purchasing customer
    pub owner_id: UserId,
    /// Number of admissions
    pub quantity: u32,
    /// Presentable code
    pub code: TicketCode,
    /// Current status
    pub status: TicketStatus,
    /// When the ticket was purchased
    pub purchased_at: DateTime<Utc>,
}

impl Ticket {
    /// Issues a fresh active ticket with a newly generated code.
    #[must_use]
    pub fn issue(event_id: EventId, owner_id: UserId, quantity: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: TicketId::new(),
            event_id,
            owner_id,
            quantity,
            code: TicketCode::generate(),
            status: TicketStatus::Active,
            purchased_at: now,
        }
    }
}

// ============================================================================
// Notification
// ============================================================================

/// Severity of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Informational
    Info,
    /// Something the user should notice
    Warning,
    /// Action taken on the user's behalf
    Alert,
}

impl NotificationKind {
    /// Convert kind to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Alert => "alert",
        }
    }

    /// Parse kind from database string.
    ///
    /// # Errors
    ///
    /// Returns error if the string doesn't match a known kind.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "alert" => Ok(Self::Alert),
            _ => Err(StoreError::Database(format!("Invalid notification kind: {s}"))),
        }
    }
}

/// Longest stored notification message, in characters.
pub const MAX_MESSAGE_LEN: usize = 500;

/// A message for a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification ID
    pub id: NotificationId,
    /// Recipient
    pub recipient_id: UserId,
    /// Message text
    pub message: String,
    /// Severity
    pub kind: NotificationKind,
    /// Whether the recipient has read it
    pub read: bool,
    /// Related event, if any
    pub event_id: Option<EventId>,
    /// When it was created
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Creates an unread notification. Messages longer than
    /// [`MAX_MESSAGE_LEN`] characters are truncated.
    #[must_use]
    pub fn new(
        recipient_id: UserId,
        message: impl Into<String>,
        kind: NotificationKind,
        event_id: Option<EventId>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut message = message.into();
        if let Some((cut, _)) = message.char_indices().nth(MAX_MESSAGE_LEN) {
            message.truncate(cut);
        }
        Self {
            id: NotificationId::new(),
            recipient_id,
            message,
            kind,
            read: false,
            event_id,
            created_at: now,
        }
    }
}
