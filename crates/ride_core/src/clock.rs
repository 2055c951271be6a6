use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::{Entity, Resource};

pub const ONE_SEC_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    SearchCompleted,
    DriverArriving,
    RideStarted,
    ElapsedTick,
    RideDataTick,
    SessionDataTick,
    RideCompleted,
}

/// Entity a scheduled event is addressed to. Session-wide events carry no subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSubject {
    Ride(Entity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub kind: EventKind,
    pub subject: Option<EventSubject>,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by timestamp.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| self.kind.cmp(&other.kind))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event popped by the runner for the current step.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

/// Discrete-event clock: all "timers" are events in one min-heap, popped one at
/// a time by the runner. Time only advances when an event is popped, so tests
/// drive the lifecycle deterministically without wall-clock sleeps.
#[derive(Debug, Default, Resource)]
pub struct SimulationClock {
    now: u64,
    events: BinaryHeap<Event>,
}

impl SimulationClock {
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn schedule(&mut self, event: Event) {
        debug_assert!(
            event.timestamp >= self.now,
            "event timestamp must be >= current time"
        );
        self.events.push(event);
    }

    pub fn schedule_at(&mut self, timestamp: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule(Event {
            timestamp,
            kind,
            subject,
        });
    }

    pub fn schedule_in(&mut self, delay_ms: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_at(self.now + delay_ms, kind, subject);
    }

    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|e| e.timestamp)
    }

    pub fn pending_event_count(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Removes every pending event addressed to `subject`. Teardown path: a
    /// discarded ride must not be mutated by events scheduled before it ended.
    pub fn cancel_subject(&mut self, subject: EventSubject) -> usize {
        let before = self.events.len();
        let retained: Vec<Event> = self
            .events
            .drain()
            .filter(|event| event.subject != Some(subject))
            .collect();
        self.events = retained.into_iter().collect();
        before - self.events.len()
    }

    /// Removes every pending event of `kind`. Used when a self-rescheduling
    /// stream is switched off, so switching it back on cannot leave two copies
    /// in the heap.
    pub fn cancel_kind(&mut self, kind: EventKind) -> usize {
        let before = self.events.len();
        let retained: Vec<Event> = self.events.drain().filter(|e| e.kind != kind).collect();
        self.events = retained.into_iter().collect();
        before - self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pops_events_in_time_order() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(10, EventKind::ElapsedTick, None);
        clock.schedule_at(5, EventKind::SearchCompleted, None);
        clock.schedule_at(20, EventKind::RideCompleted, None);

        let first = clock.pop_next().expect("first event");
        assert_eq!(first.timestamp, 5);
        assert_eq!(clock.now(), 5);

        let second = clock.pop_next().expect("second event");
        assert_eq!(second.timestamp, 10);
        assert_eq!(clock.now(), 10);

        let third = clock.pop_next().expect("third event");
        assert_eq!(third.timestamp, 20);
        assert_eq!(clock.now(), 20);

        assert!(clock.pop_next().is_none());
        assert!(clock.is_empty());
    }

    #[test]
    fn schedule_in_is_relative_to_now() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(1000, EventKind::SearchCompleted, None);
        clock.pop_next().expect("event");
        clock.schedule_in(500, EventKind::DriverArriving, None);
        assert_eq!(clock.next_event_time(), Some(1500));
    }

    #[test]
    fn cancel_subject_removes_only_that_subject() {
        let ride_a = Entity::from_raw(1);
        let ride_b = Entity::from_raw(2);
        let mut clock = SimulationClock::default();
        clock.schedule_at(5, EventKind::ElapsedTick, Some(EventSubject::Ride(ride_a)));
        clock.schedule_at(10, EventKind::RideDataTick, Some(EventSubject::Ride(ride_a)));
        clock.schedule_at(15, EventKind::ElapsedTick, Some(EventSubject::Ride(ride_b)));
        clock.schedule_at(30, EventKind::SessionDataTick, None);

        let removed = clock.cancel_subject(EventSubject::Ride(ride_a));
        assert_eq!(removed, 2);
        assert_eq!(clock.pending_event_count(), 2);

        let next = clock.pop_next().expect("event");
        assert_eq!(next.subject, Some(EventSubject::Ride(ride_b)));
    }

    #[test]
    fn cancel_kind_removes_only_that_kind() {
        let ride = Entity::from_raw(1);
        let mut clock = SimulationClock::default();
        clock.schedule_at(5, EventKind::ElapsedTick, Some(EventSubject::Ride(ride)));
        clock.schedule_at(30, EventKind::SessionDataTick, None);
        clock.schedule_at(60, EventKind::SessionDataTick, None);

        let removed = clock.cancel_kind(EventKind::SessionDataTick);
        assert_eq!(removed, 2);
        assert_eq!(clock.pending_event_count(), 1);

        let next = clock.pop_next().expect("event");
        assert_eq!(next.kind, EventKind::ElapsedTick);
    }
}
