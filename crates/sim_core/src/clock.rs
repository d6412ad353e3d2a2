//! Discrete event queue: clock progression and event routing happen here,
//! outside systems.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use bevy_ecs::prelude::{Entity, Resource};

/// What caused an agent-side event to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentTrigger {
    /// The agent has reached an intersection and must choose its next road
    /// (or, if matched, this marks the moment it starts its search loop again).
    IntersectionReached,
    /// The agent has completed a trip: drops off its resource (or detours via
    /// a hub first) and becomes empty again.
    DropoffReached,
}

/// Why a resource-side event fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceEventCause {
    BecomesAvailable,
    Expired,
    /// Not itself ever queued; the resource entity is despawned at match
    /// time, so no event with this cause is ever scheduled or fires.
    PickedUp,
}

/// The payload of a scheduled [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Agent(Entity, AgentTrigger),
    Resource(Entity, ResourceEventCause),
}

/// A scheduled occurrence. Ordering is by `(time, seq)` only — ties are
/// broken by a stable monotonic sequence number assigned at schedule time,
/// never by event kind or entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub time: u64,
    pub seq: u64,
    pub kind: EventKind,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest time (and, on
        // ties, the smallest sequence number) pops first.
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Opaque handle returned by [`SimulationClock::schedule`], used to cancel a
/// previously-scheduled event before it fires.
pub type ScheduleHandle = u64;

/// The event queue and logical clock. Supports lazy cancellation: a
/// `BinaryHeap` has no efficient arbitrary-element removal, so cancelled
/// sequence numbers are tracked in an auxiliary set and skipped on pop.
#[derive(Resource, Debug, Default)]
pub struct SimulationClock {
    now: u64,
    next_seq: u64,
    events: BinaryHeap<Event>,
    cancelled: HashSet<u64>,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Schedules `kind` to fire at absolute `time`, returning a handle that
    /// can later be passed to [`SimulationClock::cancel`].
    pub fn schedule_at(&mut self, time: u64, kind: EventKind) -> ScheduleHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Event { time, seq, kind });
        seq
    }

    /// Schedules `kind` to fire `delta` time units after `now`.
    pub fn schedule_in(&mut self, delta: u64, kind: EventKind) -> ScheduleHandle {
        self.schedule_at(self.now + delta, kind)
    }

    /// Marks a previously-returned handle as cancelled. A no-op if the event
    /// already fired or was already cancelled.
    pub fn cancel(&mut self, handle: ScheduleHandle) {
        self.cancelled.insert(handle);
    }

    /// Pops the earliest non-cancelled event and advances `now` to its time.
    /// Returns `None` once the queue is empty of live events.
    pub fn pop_next(&mut self) -> Option<Event> {
        loop {
            let event = self.events.pop()?;
            if self.cancelled.remove(&event.seq) {
                continue;
            }
            self.now = event.time;
            return Some(event);
        }
    }

    /// Peeks the time of the next live event without popping it.
    pub fn next_event_time(&mut self) -> Option<u64> {
        while let Some(event) = self.events.peek() {
            if self.cancelled.contains(&event.seq) {
                self.events.pop();
                continue;
            }
            return Some(event.time);
        }
        None
    }

    pub fn is_empty(&mut self) -> bool {
        self.next_event_time().is_none()
    }

    pub fn pending_event_count(&self) -> usize {
        self.events.len().saturating_sub(self.cancelled.len())
    }
}
