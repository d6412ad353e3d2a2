//! Components and resources that make up the ECS world state for agents
//! and resources.

use std::collections::BTreeSet;

use bevy_ecs::prelude::{Component, Entity, Resource};

use crate::clock::{ResourceEventCause, ScheduleHandle};
use crate::map::{CityMap, LocationOnRoad};

/// The road network, installed once at scenario-build time and never
/// mutated afterward.
#[derive(Resource, Debug, Clone)]
pub struct MapResource(pub CityMap);

/// Where an [`Agent`] currently sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    /// Empty (no assignment) and, between events, travelling toward an
    /// intersection where it will choose its next road.
    IntersectionReached,
    /// Matched, travelling toward the pickup point. Transient: never itself
    /// the target of a queued trigger, only a bookkeeping label set at
    /// match time.
    PickingUp,
    /// Transient label set the instant the dropoff event fires, immediately
    /// before transitioning back to `IntersectionReached`.
    DroppingOff,
}

/// The currently matched resource for an agent, cached so dispatch and
/// telemetry don't need to re-query the resource entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentAssignment {
    pub resource: Entity,
    pub pickup: LocationOnRoad,
    pub dropoff: LocationOnRoad,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Agent {
    pub location: LocationOnRoad,
    /// Time at which this agent most recently became empty (or, for agents
    /// that were never matched, the simulation start time).
    pub start_search_time: u64,
    pub next_event_time: u64,
    pub next_event_handle: Option<ScheduleHandle>,
    pub phase: AgentPhase,
    pub assignment: Option<AgentAssignment>,
}

impl Agent {
    pub fn is_empty(&self) -> bool {
        matches!(self.phase, AgentPhase::IntersectionReached) && self.assignment.is_none()
    }

    /// Reconstructs this agent's exact position on its current road at
    /// `at_time`, which may be strictly between the time it started the
    /// road and `next_event_time` (its scheduled arrival at the far end).
    pub fn location_at(&self, at_time: u64, map: &CityMap) -> LocationOnRoad {
        let road = map.road(self.location.road);
        let travel_to_end = self.next_event_time.saturating_sub(at_time);
        let travel_from_start = road.travel_time.saturating_sub(travel_to_end);
        LocationOnRoad {
            road: self.location.road,
            travel_time_from_start: travel_from_start,
        }
    }
}

/// A request for transport: a pickup point, a destination, and the
/// arrival/expiry bookkeeping needed by the pool batcher.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRequest {
    pub pickup: LocationOnRoad,
    pub dropoff: LocationOnRoad,
    pub available_time: u64,
    pub trip_time: u64,
    pub expiration_time: u64,
    pub event_cause: ResourceEventCause,
    pub next_event_handle: Option<ScheduleHandle>,
}

/// Ordered set of currently-empty agent ids, maintained alongside the ECS
/// components rather than recomputed by query each pool close — matches
/// the data model's requirement that membership be keyed by id for
/// deterministic iteration order.
#[derive(Resource, Debug, Default)]
pub struct EmptyAgents(pub BTreeSet<Entity>);

/// Ordered set of resource ids that have been pooled-and-matched-away or
/// overflowed a pool with no agents to match against, and are waiting for
/// a later pool to try again or for their expiration to fire.
#[derive(Resource, Debug, Default)]
pub struct WaitingResources(pub BTreeSet<Entity>);
