//! Stable matching between a pool of resources and the set of empty agents.

mod stable;

pub use stable::{benefit, reach_time, stable_match, Match};

use bevy_ecs::prelude::Entity;

use crate::map::{CityMap, LocationOnRoad};

/// A resource's view as presented to the matcher: its pickup point and the
/// entity id used for tie-breaking and lookups.
#[derive(Debug, Clone, Copy)]
pub struct ResourceCandidate {
    pub id: Entity,
    pub pickup: LocationOnRoad,
    pub dropoff: LocationOnRoad,
}

/// An agent's view as presented to the matcher.
#[derive(Debug, Clone, Copy)]
pub struct AgentCandidate {
    pub id: Entity,
    pub location: LocationOnRoad,
}

/// Runs stable matching for one pool close. `resources` and `agents` are
/// both expected to be non-empty; callers handle the "no empty agents at
/// all" surplus case themselves before invoking this.
pub fn run_matching(
    resources: &[ResourceCandidate],
    agents: &[AgentCandidate],
    map: &CityMap,
) -> Vec<Match> {
    stable_match(resources, agents, map)
}
