//! Domain types for the NFTicket marketplace.
//!
//! Identifiers are sequential integers assigned by the engine, money is an
//! integer count of base units, and time is `DateTime<Utc>`. Nothing here uses
//! floating point, so every value round-trips exactly through the ledger and
//! through any wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Identifiers
// ============================================================================

/// Sequential identifier of an event. The first event is `EventId(1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw id.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The id assigned after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential identifier of a minted ticket token. The first token is `TokenId(1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(u64);

impl TokenId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw id.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The id assigned after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential identifier of a resale listing.
///
/// A token may be listed many times over its life; each listing gets a fresh id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(u64);

impl ListingId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw id.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The id assigned after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An account on the ledger (wallet address).
///
/// Identities are opaque: the engine only compares them for equality.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wrap an address without validation (trusted input).
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when parsing an empty identity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Identity cannot be empty")]
pub struct ParseIdentityError;

impl FromStr for Identity {
    type Err = ParseIdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseIdentityError);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ============================================================================
// Money Value Object (base units to avoid floating point errors)
// ============================================================================

/// Number of decimal places between a whole token and one base unit.
pub const DECIMALS: u32 = 18;

const UNITS_PER_TOKEN: u128 = 10u128.pow(DECIMALS);

/// Errors parsing a decimal amount such as `"1.05"`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    /// The input was empty or contained something other than digits and one dot.
    #[error("Invalid amount: {0:?}")]
    Malformed(String),
    /// More fractional digits than [`DECIMALS`].
    #[error("Amount {0:?} has more than {DECIMALS} decimal places")]
    TooPrecise(String),
    /// The value does not fit in 128 bits of base units.
    #[error("Amount {0:?} is too large")]
    Overflow(String),
}

/// An amount of the ledger's native currency, in base units (10^-18 of a token).
///
/// Serialized as a decimal string of base units so that values never pass
/// through a floating point or 64-bit number on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from base units
    #[must_use]
    pub const fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    /// Creates an amount from whole tokens
    #[must_use]
    pub const fn from_tokens(tokens: u64) -> Self {
        // u64::MAX * 10^18 < u128::MAX
        Self(tokens as u128 * UNITS_PER_TOKEN)
    }

    /// Returns the amount in base units
    #[must_use]
    pub const fn base_units(self) -> u128 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Subtracts two amounts (returns None if result would be negative)
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// `self * percent / 100`, rounded down, with overflow checking
    #[must_use]
    pub const fn checked_percent(self, percent: u32) -> Option<Self> {
        match self.0.checked_mul(percent as u128) {
            Some(product) => Some(Self(product / 100)),
            None => None,
        }
    }

    /// Parses a decimal token amount such as `"1.05"` or `"110"`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseAmountError`] if the input is not a non-negative decimal
    /// with at most [`DECIMALS`] fractional digits that fits in 128 bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use nfticket_marketplace::types::Amount;
    ///
    /// let price = Amount::parse_decimal("1.05").unwrap();
    /// assert_eq!(price.base_units(), 1_050_000_000_000_000_000);
    /// assert_eq!(price.to_string(), "1.05");
    /// ```
    pub fn parse_decimal(input: &str) -> Result<Self, ParseAmountError> {
        let malformed = || ParseAmountError::Malformed(input.to_string());
        let (whole, fraction) = match input.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (input, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(malformed());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }
        if fraction.len() > DECIMALS as usize {
            return Err(ParseAmountError::TooPrecise(input.to_string()));
        }

        let overflow = || ParseAmountError::Overflow(input.to_string());
        let whole_units = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u128>()
                .map_err(|_| overflow())?
                .checked_mul(UNITS_PER_TOKEN)
                .ok_or_else(overflow)?
        };

        let fraction_units = if fraction.is_empty() {
            0
        } else {
            // Right-pad to DECIMALS digits: "05" -> 050000000000000000
            let scale = 10u128.pow(DECIMALS - u32::try_from(fraction.len()).map_err(|_| malformed())?);
            fraction.parse::<u128>().map_err(|_| malformed())? * scale
        };

        whole_units
            .checked_add(fraction_units)
            .map(Self)
            .ok_or_else(overflow)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNITS_PER_TOKEN;
        let fraction = self.0 % UNITS_PER_TOKEN;
        if fraction == 0 {
            return write!(f, "{whole}.0");
        }
        let digits = format!("{fraction:018}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_decimal(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>()
            .map(Self)
            .map_err(|e| serde::de::Error::custom(format!("invalid base-unit amount {raw:?}: {e}")))
    }
}

// ============================================================================
// Domain Entities
// ============================================================================

/// Input for creating an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Event title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Venue or address
    pub location: String,
    /// When the event takes place; must be in the future at creation
    pub date: DateTime<Utc>,
    /// Primary-sale price per ticket; must be positive
    pub ticket_price: Amount,
    /// Capacity; must be positive
    pub max_tickets: u32,
    /// Off-chain metadata (image, category) reference
    pub metadata_uri: String,
}

/// An organizer-created occasion with a fixed capacity of sellable tickets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Sequential identifier
    pub event_id: EventId,
    /// Event title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Venue or address
    pub location: String,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Primary-sale price per ticket
    pub ticket_price: Amount,
    /// Capacity
    pub max_tickets: u32,
    /// Tickets minted so far (never exceeds `max_tickets`)
    pub sold_tickets: u32,
    /// Identity that created the event and holds check-in authority
    pub organizer: Identity,
    /// False once the organizer deactivates the event (terminal)
    pub is_active: bool,
    /// Off-chain metadata reference
    pub metadata_uri: String,
    /// When the event was created
    pub created_at: DateTime<Utc>,
}

/// Display status of an event at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventStatus {
    /// On sale
    Active,
    /// Every ticket has been minted
    SoldOut,
    /// The event date has passed
    Ended,
    /// Deactivated by the organizer
    Cancelled,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Active => "active",
            Self::SoldOut => "sold-out",
            Self::Ended => "ended",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

impl Event {
    /// Tickets still available for primary sale.
    #[must_use]
    pub const fn remaining_tickets(&self) -> u32 {
        self.max_tickets.saturating_sub(self.sold_tickets)
    }

    /// Whether every ticket has been minted.
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.sold_tickets >= self.max_tickets
    }

    /// Status as shown to buyers at `now`: cancellation wins over the date,
    /// the date wins over capacity.
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> EventStatus {
        if !self.is_active {
            EventStatus::Cancelled
        } else if now > self.date {
            EventStatus::Ended
        } else if self.is_sold_out() {
            EventStatus::SoldOut
        } else {
            EventStatus::Active
        }
    }
}

/// A non-fungible proof of purchase bound to one event and one current owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Sequential token identifier
    pub token_id: TokenId,
    /// The event this ticket admits to (immutable)
    pub event_id: EventId,
    /// Current owner
    pub owner: Identity,
    /// Set once at check-in; never reset
    pub is_used: bool,
    /// When the ticket was minted
    pub purchase_time: DateTime<Utc>,
    /// The event's ticket price at mint time (immutable, basis of the resale cap)
    pub original_price: Amount,
    /// Token metadata reference supplied at mint
    pub token_uri: String,
}

/// Lifecycle of one listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    /// Open for purchase
    Listed,
    /// Bought; ownership moved to the buyer
    Sold,
    /// Withdrawn by the seller
    Cancelled,
}

/// An offer to resell a ticket at a capped price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Identifier of this listing (not reused across re-listings)
    pub listing_id: ListingId,
    /// Ticket on offer
    pub token_id: TokenId,
    /// Owner of the ticket when the listing was created
    pub seller: Identity,
    /// Asking price
    pub price: Amount,
    /// Current lifecycle state
    pub status: ListingStatus,
    /// When the listing was created
    pub listed_at: DateTime<Utc>,
    /// When the listing was sold or cancelled
    pub closed_at: Option<DateTime<Utc>>,
}

impl Listing {
    /// Whether the listing can still be bought or cancelled.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Listed
    }
}
