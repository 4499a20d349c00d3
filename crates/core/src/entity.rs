//! Base entity shape: identity, audit fields and pending domain events.

use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::events::DomainEvent;
use crate::identity::{Identity, UserId};

/// A persisted record with a typed identity.
///
/// Implementors embed an [`Audit`] block and a [`PendingEvents`] buffer and
/// expose them through the accessor methods. `TYPE_NAME` is the stable name
/// used both for store partitioning and for cache keys, so it must not change
/// once data exists.
pub trait Entity: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Identity type of this entity.
    type Id: Identity;

    /// Stable type name, e.g. `"User"`.
    const TYPE_NAME: &'static str;

    /// Navigation paths that are only materialized when a specification
    /// includes them.
    const NAVIGATIONS: &'static [&'static str] = &[];

    fn id(&self) -> Self::Id;

    fn audit(&self) -> &Audit;

    fn audit_mut(&mut self) -> &mut Audit;

    fn pending_events(&self) -> &PendingEvents<Self>;

    fn pending_events_mut(&mut self) -> &mut PendingEvents<Self>;

    /// Unique keys the store must enforce, as `(index name, value)` pairs.
    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Drops the related data behind `navigation` so that it reads as not loaded.
    fn unload(&mut self, _navigation: &str) {}

    /// Restores not-loaded related data behind `navigation` from the stored copy.
    ///
    /// Called before an update is written so that an entity read without an
    /// include does not erase its related data.
    fn reload_from(&mut self, _navigation: &str, _stored: &Self) {}

    /// Queues a domain event for dispatch at the next commit.
    fn raise(&mut self, event: DomainEvent<Self>) {
        self.pending_events_mut().push(event);
    }

    /// Queues `event`, replacing a pending event of the same kind if one exists.
    ///
    /// Lets a decorator attach an event ahead of the inner repository without
    /// the event being dispatched twice.
    fn raise_or_refresh(&mut self, event: DomainEvent<Self>) {
        self.pending_events_mut().refresh(event);
    }

    /// A copy of the entity without its pending events, as carried by events.
    fn snapshot(&self) -> Self {
        let mut copy = self.clone();
        copy.pending_events_mut().drain();
        copy
    }
}

/// Audit fields stamped by the repository.
///
/// `created_*` are written only by [`Audit::stamp_created`]; updates keep them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    created_by: Option<UserId>,
    created_at: Option<DateTime<Utc>>,
    updated_by: Option<UserId>,
    updated_at: Option<DateTime<Utc>>,
}

impl Audit {
    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_by(&self) -> Option<UserId> {
        self.updated_by
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Stamps creation and modification with the same principal and instant.
    ///
    /// Any stamp the record already carries is replaced.
    pub fn stamp_created(&mut self, by: UserId, at: DateTime<Utc>) {
        self.created_by = Some(by);
        self.created_at = Some(at);
        self.updated_by = Some(by);
        self.updated_at = Some(at);
    }

    /// Stamps a modification.
    ///
    /// `updated_at` always moves forward: if `at` is not after the previous
    /// stamp (clock skew, coarse clocks) it is bumped by one microsecond.
    pub fn stamp_updated(&mut self, by: UserId, at: DateTime<Utc>) {
        let at = match self.updated_at {
            Some(previous) if at <= previous => previous + Duration::microseconds(1),
            _ => at,
        };
        self.updated_by = Some(by);
        self.updated_at = Some(at);
    }
}

/// Domain events raised by an entity and not yet dispatched.
///
/// The buffer is owned by the entity until the commit boundary drains it
/// with [`PendingEvents::drain`]; it is never serialized.
#[derive(Debug, Clone)]
pub struct PendingEvents<E> {
    events: Vec<DomainEvent<E>>,
}

impl<E> Default for PendingEvents<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E> PendingEvents<E> {
    pub fn push(&mut self, event: DomainEvent<E>) {
        self.events.push(event);
    }

    /// Replaces the first pending event of the same kind, or appends.
    pub fn refresh(&mut self, event: DomainEvent<E>) {
        match self.events.iter_mut().find(|e| e.kind() == event.kind()) {
            Some(slot) => *slot = event,
            None => self.events.push(event),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DomainEvent<E>> {
        self.events.iter()
    }

    /// Takes every pending event, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<DomainEvent<E>> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_stamp_created_sets_all_fields_once() {
        let user = UserId::create_unique();
        let mut audit = Audit::default();

        audit.stamp_created(user, instant(0));

        assert_eq!(audit.created_by(), Some(user));
        assert_eq!(audit.updated_by(), Some(user));
        assert_eq!(audit.created_at(), audit.updated_at());
    }

    #[test]
    fn test_stamp_created_replaces_previous_stamp() {
        let first = UserId::create_unique();
        let second = UserId::create_unique();
        let mut audit = Audit::default();

        audit.stamp_created(first, instant(0));
        audit.stamp_created(second, instant(10));

        assert_eq!(audit.created_by(), Some(second));
        assert_eq!(audit.created_at(), Some(instant(10)));
        assert_eq!(audit.updated_by(), Some(second));
        assert_eq!(audit.updated_at(), Some(instant(10)));
    }

    #[test]
    fn test_stamp_updated_is_strictly_increasing() {
        let user = UserId::create_unique();
        let mut audit = Audit::default();
        audit.stamp_created(user, instant(5));

        audit.stamp_updated(user, instant(5));
        let first = audit.updated_at().unwrap();
        assert!(first > instant(5));

        audit.stamp_updated(user, instant(1));
        assert!(audit.updated_at().unwrap() > first);
        assert_eq!(audit.created_at(), Some(instant(5)));
    }

    #[test]
    fn test_pending_events_drain_empties_buffer() {
        let mut pending: PendingEvents<u8> = PendingEvents::default();
        pending.push(DomainEvent::Created(1));
        pending.push(DomainEvent::Updated(2));

        let drained = pending.drain();

        assert_eq!(drained.len(), 2);
        assert!(pending.is_empty());
        assert!(pending.drain().is_empty());
    }

    #[test]
    fn test_refresh_replaces_same_kind_only() {
        let mut pending: PendingEvents<u8> = PendingEvents::default();
        pending.push(DomainEvent::Updated(1));
        pending.refresh(DomainEvent::Updated(2));
        pending.refresh(DomainEvent::Deleted(3));

        assert_eq!(
            pending.drain(),
            vec![DomainEvent::Updated(2), DomainEvent::Deleted(3)]
        );
    }

    #[test]
    fn test_snapshot_has_no_pending_events() {
        use crate::testing::Note;

        let mut note = Note::new("x");
        note.raise(DomainEvent::Created(note.snapshot()));

        let snapshot = note.snapshot();

        assert_eq!(note.pending_events().len(), 1);
        assert!(snapshot.pending_events().is_empty());
        assert_eq!(snapshot.id, note.id);
    }
}
