//! Ticket verification at the venue door.

use crate::registry::EventRegistry;
use crate::tickets::TicketLedger;
use crate::types::{Event, Ticket, TokenId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a ticket was accepted or refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationReason {
    /// Admit
    Valid,
    /// No ticket has this id
    DoesNotExist,
    /// Already checked in
    AlreadyUsed,
    /// The event date has passed
    EventEnded,
    /// The organizer deactivated the event
    EventCancelled,
}

impl VerificationReason {
    /// Short label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::DoesNotExist => "does not exist",
            Self::AlreadyUsed => "already used",
            Self::EventEnded => "event ended",
            Self::EventCancelled => "event cancelled",
        }
    }

    /// Sentence shown to door staff.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Valid => "Ticket is valid.",
            Self::DoesNotExist => "This ticket is invalid or does not exist.",
            Self::AlreadyUsed => "This ticket has already been used.",
            Self::EventEnded => "This ticket is for an event that has already ended.",
            Self::EventCancelled => "This ticket is for an event that has been cancelled.",
        }
    }
}

impl fmt::Display for VerificationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`verify`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    /// The ticket, when it exists
    pub ticket: Option<Ticket>,
    /// Its event, when the ticket exists
    pub event: Option<Event>,
    /// Whether to admit
    pub is_valid: bool,
    /// Which rule decided
    pub reason: VerificationReason,
}

/// Classifies a ticket; the first matching rule wins:
/// missing, used, event date passed, event inactive, otherwise valid.
#[must_use]
pub fn verify(
    tickets: &TicketLedger,
    events: &EventRegistry,
    token_id: TokenId,
    now: DateTime<Utc>,
) -> Verification {
    let Some(ticket) = tickets.find(token_id) else {
        return Verification {
            ticket: None,
            event: None,
            is_valid: false,
            reason: VerificationReason::DoesNotExist,
        };
    };
    let event = events.find(ticket.event_id);

    let reason = match event {
        None => VerificationReason::DoesNotExist,
        Some(_) if ticket.is_used => VerificationReason::AlreadyUsed,
        Some(event) if now > event.date => VerificationReason::EventEnded,
        Some(event) if !event.is_active => VerificationReason::EventCancelled,
        Some(_) => VerificationReason::Valid,
    };

    Verification {
        ticket: Some(ticket.clone()),
        event: event.cloned(),
        is_valid: reason == VerificationReason::Valid,
        reason,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::context::TxContext;
    use crate::records::MarketRecord;
    use crate::types::{Amount, EventId, Identity, NewEvent};
    use chrono::Duration;

    fn start() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_000)
    }

    fn setup() -> (EventRegistry, TicketLedger) {
        let mut registry = EventRegistry::new();
        let event = registry
            .new_event(
                NewEvent {
                    title: "Opera".to_string(),
                    description: "Act I".to_string(),
                    location: "House".to_string(),
                    date: start() + Duration::days(2),
                    ticket_price: Amount::from_base_units(10),
                    max_tickets: 5,
                    metadata_uri: "ipfs://opera".to_string(),
                },
                &TxContext::new(Identity::new("0xorg"), start()),
            )
            .unwrap();
        registry.apply(&MarketRecord::EventCreated { event }).unwrap();

        let mut tickets = TicketLedger::new();
        let ticket = tickets
            .new_ticket(
                &registry,
                EventId::new(1),
                Amount::from_base_units(10),
                "ipfs://seat".to_string(),
                &TxContext::new(Identity::new("0xfan"), start()),
            )
            .unwrap();
        let record = MarketRecord::TicketMinted {
            ticket,
            payment: Amount::from_base_units(10),
        };
        registry.apply(&record).unwrap();
        tickets.apply(&record).unwrap();
        (registry, tickets)
    }

    #[test]
    fn fresh_ticket_is_valid() {
        let (registry, tickets) = setup();
        let result = verify(&tickets, &registry, TokenId::new(1), start());
        assert!(result.is_valid);
        assert_eq!(result.reason.message(), "Ticket is valid.");
        assert_eq!(result.event.unwrap().event_id, EventId::new(1));
    }

    #[test]
    fn missing_ticket_does_not_exist() {
        let (registry, tickets) = setup();
        let result = verify(&tickets, &registry, TokenId::new(2), start());
        assert!(!result.is_valid);
        assert_eq!(result.reason, VerificationReason::DoesNotExist);
        assert!(result.ticket.is_none());
    }

    #[test]
    fn used_wins_over_ended_and_ended_over_cancelled() {
        let (mut registry, mut tickets) = setup();
        let after_event = start() + Duration::days(3);

        registry
            .apply(&MarketRecord::EventDeactivated {
                event_id: EventId::new(1),
                deactivated_at: start(),
            })
            .unwrap();
        assert_eq!(
            verify(&tickets, &registry, TokenId::new(1), start()).reason,
            VerificationReason::EventCancelled
        );
        assert_eq!(
            verify(&tickets, &registry, TokenId::new(1), after_event).reason,
            VerificationReason::EventEnded
        );

        tickets
            .apply(&MarketRecord::TicketUsed {
                token_id: TokenId::new(1),
                event_id: EventId::new(1),
                used_at: start(),
            })
            .unwrap();
        let result = verify(&tickets, &registry, TokenId::new(1), after_event);
        assert_eq!(result.reason, VerificationReason::AlreadyUsed);
        assert_eq!(result.reason.message(), "This ticket has already been used.");
        assert_eq!(result.reason.to_string(), "already used");
    }
}
