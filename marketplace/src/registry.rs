//! Event registry: event creation, sold counters, deactivation, organizer index.
//!
//! Validation methods take `&self` and only decide; state changes happen in
//! [`EventRegistry::apply`] once the ledger has committed the records.

use crate::context::TxContext;
use crate::error::{Entity, MarketError, Result, Role};
use crate::records::MarketRecord;
use crate::types::{Event, EventId, Identity, NewEvent};
use std::collections::{BTreeMap, HashMap, HashSet};

/// All events ever created, indexed by id and by organizer.
#[derive(Clone, Debug)]
pub struct EventRegistry {
    events: BTreeMap<EventId, Event>,
    by_organizer: HashMap<Identity, Vec<EventId>>,
    verified_organizers: HashSet<Identity>,
    next_event_id: EventId,
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self {
            events: BTreeMap::new(),
            by_organizer: HashMap::new(),
            verified_organizers: HashSet::new(),
            next_event_id: EventId::new(1),
        }
    }
}

impl EventRegistry {
    /// Creates an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next created event will receive.
    #[must_use]
    pub const fn next_event_id(&self) -> EventId {
        self.next_event_id
    }

    /// Number of events ever created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no event has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Validates a `createEvent` request and builds the event it would create.
    ///
    /// The caller becomes the organizer.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] if `date <= now`, the price or
    /// capacity is zero, or any text field is blank.
    pub fn new_event(&self, draft: NewEvent, ctx: &TxContext) -> Result<Event> {
        for (field, value) in [
            ("title", &draft.title),
            ("description", &draft.description),
            ("location", &draft.location),
            ("metadata URI", &draft.metadata_uri),
        ] {
            if value.trim().is_empty() {
                return Err(MarketError::validation(format!("Event {field} cannot be empty")));
            }
        }

        if draft.date <= ctx.now {
            return Err(MarketError::validation("Event date must be in the future"));
        }

        if draft.ticket_price.is_zero() {
            return Err(MarketError::validation("Ticket price must be greater than zero"));
        }

        if draft.max_tickets == 0 {
            return Err(MarketError::validation("Max tickets must be greater than zero"));
        }

        Ok(Event {
            event_id: self.next_event_id,
            title: draft.title,
            description: draft.description,
            location: draft.location,
            date: draft.date,
            ticket_price: draft.ticket_price,
            max_tickets: draft.max_tickets,
            sold_tickets: 0,
            organizer: ctx.caller.clone(),
            is_active: true,
            metadata_uri: draft.metadata_uri,
            created_at: ctx.now,
        })
    }

    /// Looks up an event.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if no event has this id.
    pub fn get_event(&self, event_id: EventId) -> Result<&Event> {
        self.events.get(&event_id).ok_or(MarketError::NotFound {
            entity: Entity::Event,
            id: event_id.value(),
        })
    }

    /// Point lookup that treats absence as a normal outcome.
    #[must_use]
    pub fn find(&self, event_id: EventId) -> Option<&Event> {
        self.events.get(&event_id)
    }

    /// Checks that one more ticket can be minted against the event.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NotFound`] if the event does not exist
    /// - [`MarketError::EventInactive`] if it has been deactivated
    /// - [`MarketError::SoldOut`] if `sold_tickets == max_tickets`
    pub fn check_mintable(&self, event_id: EventId) -> Result<&Event> {
        let event = self.get_event(event_id)?;
        if !event.is_active {
            return Err(MarketError::EventInactive(event_id));
        }
        if event.is_sold_out() {
            return Err(MarketError::SoldOut {
                event_id,
                max_tickets: event.max_tickets,
            });
        }
        Ok(event)
    }

    /// Records one more sold ticket. Called only while applying a committed mint.
    ///
    /// # Errors
    ///
    /// Same as [`check_mintable`](Self::check_mintable); on error nothing changes.
    pub fn increment_sold(&mut self, event_id: EventId) -> Result<u32> {
        self.check_mintable(event_id)?;
        let event = self
            .events
            .get_mut(&event_id)
            .ok_or(MarketError::NotFound {
                entity: Entity::Event,
                id: event_id.value(),
            })?;
        event.sold_tickets += 1;
        Ok(event.sold_tickets)
    }

    /// Checks that `caller` may deactivate the event.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NotFound`] if the event does not exist
    /// - [`MarketError::Unauthorized`] unless the caller is the organizer
    /// - [`MarketError::AlreadyInactive`] if it was already deactivated
    pub fn check_deactivate(&self, event_id: EventId, caller: &Identity) -> Result<&Event> {
        let event = self.get_event(event_id)?;
        if &event.organizer != caller {
            return Err(MarketError::Unauthorized {
                caller: caller.clone(),
                required: Role::Organizer,
            });
        }
        if !event.is_active {
            return Err(MarketError::AlreadyInactive(event_id));
        }
        Ok(event)
    }

    /// Ids of the events an organizer created, in creation order.
    #[must_use]
    pub fn events_by_organizer(&self, organizer: &Identity) -> Vec<EventId> {
        self.by_organizer.get(organizer).cloned().unwrap_or_default()
    }

    /// Checks that `caller` may mark `organizer` as verified.
    ///
    /// # Errors
    ///
    /// - [`MarketError::Unauthorized`] unless the caller is the platform owner
    /// - [`MarketError::Validation`] if the organizer is already verified
    pub fn check_verify_organizer(
        &self,
        organizer: &Identity,
        caller: &Identity,
        platform_owner: &Identity,
    ) -> Result<()> {
        if caller != platform_owner {
            return Err(MarketError::Unauthorized {
                caller: caller.clone(),
                required: Role::PlatformOwner,
            });
        }
        if self.verified_organizers.contains(organizer) {
            return Err(MarketError::validation(format!(
                "Organizer {organizer} is already verified"
            )));
        }
        Ok(())
    }

    /// Whether the platform owner has verified this organizer.
    #[must_use]
    pub fn is_verified_organizer(&self, organizer: &Identity) -> bool {
        self.verified_organizers.contains(organizer)
    }

    /// Applies a committed record.
    ///
    /// # Errors
    ///
    /// Propagates [`increment_sold`](Self::increment_sold) failures and
    /// [`MarketError::NotFound`] for records about unknown events.
    pub fn apply(&mut self, record: &MarketRecord) -> Result<()> {
        match record {
            MarketRecord::EventCreated { event } => {
                self.by_organizer
                    .entry(event.organizer.clone())
                    .or_default()
                    .push(event.event_id);
                if event.event_id >= self.next_event_id {
                    self.next_event_id = event.event_id.next();
                }
                self.events.insert(event.event_id, event.clone());
            },
            MarketRecord::EventDeactivated { event_id, .. } => {
                let event = self
                    .events
                    .get_mut(event_id)
                    .ok_or(MarketError::NotFound {
                        entity: Entity::Event,
                        id: event_id.value(),
                    })?;
                event.is_active = false;
            },
            MarketRecord::TicketMinted { ticket, .. } => {
                self.increment_sold(ticket.event_id)?;
            },
            MarketRecord::OrganizerVerified { organizer, .. } => {
                self.verified_organizers.insert(organizer.clone());
            },
            _ => {},
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::types::{Amount, Ticket, TokenId};
    use chrono::{DateTime, Duration, Utc};

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_000)
    }

    fn organizer() -> Identity {
        Identity::new("0xorganizer")
    }

    fn draft(max_tickets: u32) -> NewEvent {
        NewEvent {
            title: "Rust Conf".to_string(),
            description: "Talks".to_string(),
            location: "Hall A".to_string(),
            date: now() + Duration::days(1),
            ticket_price: Amount::from_base_units(100),
            max_tickets,
            metadata_uri: "ipfs://event".to_string(),
        }
    }

    fn create(registry: &mut EventRegistry, max_tickets: u32) -> EventId {
        let ctx = TxContext::new(organizer(), now());
        let event = registry.new_event(draft(max_tickets), &ctx).unwrap();
        let id = event.event_id;
        registry.apply(&MarketRecord::EventCreated { event }).unwrap();
        id
    }

    fn minted(event_id: EventId) -> MarketRecord {
        MarketRecord::TicketMinted {
            ticket: Ticket {
                token_id: TokenId::new(1),
                event_id,
                owner: Identity::new("0xbuyer"),
                is_used: false,
                purchase_time: now(),
                original_price: Amount::from_base_units(100),
                token_uri: "ipfs://ticket".to_string(),
            },
            payment: Amount::from_base_units(100),
        }
    }

    #[test]
    fn ids_are_sequential_from_one() {
        let mut registry = EventRegistry::new();
        assert_eq!(create(&mut registry, 1), EventId::new(1));
        assert_eq!(create(&mut registry, 1), EventId::new(2));
        assert_eq!(registry.next_event_id(), EventId::new(3));
        assert_eq!(
            registry.events_by_organizer(&organizer()),
            vec![EventId::new(1), EventId::new(2)]
        );
    }

    #[test]
    fn rejects_past_dates_and_zero_values() {
        let registry = EventRegistry::new();
        let ctx = TxContext::new(organizer(), now());

        let mut past = draft(1);
        past.date = now();
        assert!(matches!(
            registry.new_event(past, &ctx),
            Err(MarketError::Validation { .. })
        ));

        let mut free = draft(1);
        free.ticket_price = Amount::ZERO;
        assert!(registry.new_event(free, &ctx).is_err());

        assert!(registry.new_event(draft(0), &ctx).is_err());

        let mut untitled = draft(1);
        untitled.title = "   ".to_string();
        let error = registry.new_event(untitled, &ctx).unwrap_err();
        assert_eq!(error.to_string(), "Invalid input: Event title cannot be empty");
    }

    #[test]
    fn increment_sold_stops_at_capacity() {
        let mut registry = EventRegistry::new();
        let id = create(&mut registry, 2);

        assert_eq!(registry.increment_sold(id).unwrap(), 1);
        registry.apply(&minted(id)).unwrap();
        assert_eq!(registry.get_event(id).unwrap().sold_tickets, 2);

        let error = registry.increment_sold(id).unwrap_err();
        assert_eq!(
            error,
            MarketError::SoldOut {
                event_id: id,
                max_tickets: 2
            }
        );
        assert_eq!(registry.get_event(id).unwrap().sold_tickets, 2);
    }

    #[test]
    fn deactivation_is_organizer_only_and_terminal() {
        let mut registry = EventRegistry::new();
        let id = create(&mut registry, 5);

        let stranger = Identity::new("0xstranger");
        assert!(matches!(
            registry.check_deactivate(id, &stranger),
            Err(MarketError::Unauthorized {
                required: Role::Organizer,
                ..
            })
        ));

        registry.check_deactivate(id, &organizer()).unwrap();
        registry
            .apply(&MarketRecord::EventDeactivated {
                event_id: id,
                deactivated_at: now(),
            })
            .unwrap();

        assert_eq!(
            registry.check_deactivate(id, &organizer()).unwrap_err(),
            MarketError::AlreadyInactive(id)
        );
        assert_eq!(
            registry.increment_sold(id).unwrap_err(),
            MarketError::EventInactive(id)
        );
    }

    #[test]
    fn unknown_event_is_not_found() {
        let registry = EventRegistry::new();
        assert_eq!(
            registry.get_event(EventId::new(9)).unwrap_err(),
            MarketError::NotFound {
                entity: Entity::Event,
                id: 9
            }
        );
        assert!(registry.events_by_organizer(&organizer()).is_empty());
    }

    #[test]
    fn only_platform_owner_verifies_organizers() {
        let mut registry = EventRegistry::new();
        let owner = Identity::new("0xplatform");

        assert!(registry
            .check_verify_organizer(&organizer(), &organizer(), &owner)
            .is_err());
        registry
            .check_verify_organizer(&organizer(), &owner, &owner)
            .unwrap();
        registry
            .apply(&MarketRecord::OrganizerVerified {
                organizer: organizer(),
                verified_at: now(),
            })
            .unwrap();

        assert!(registry.is_verified_organizer(&organizer()));
        assert!(matches!(
            registry.check_verify_organizer(&organizer(), &owner, &owner),
            Err(MarketError::Validation { .. })
        ));
    }
}
