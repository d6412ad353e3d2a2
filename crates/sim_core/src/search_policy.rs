//! The search-policy collaborator: chosen by an empty agent at every
//! intersection to decide which road to take next while it waits for a
//! match.

use std::panic::{catch_unwind, AssertUnwindSafe};

use bevy_ecs::prelude::{Entity, Resource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::map::{CityMap, LocationOnRoad, RoadId};

/// A one-method collaborator that picks the next road for an empty agent
/// parked at an intersection. Implementations must never panic in a way
/// that should crash the simulation — callers wrap invocations in
/// `catch_unwind` regardless, but a well-behaved policy returns `None`
/// for "no choice available" instead of panicking.
pub trait SearchPolicy: Send + Sync {
    fn next_road(&self, agent: Entity, current: LocationOnRoad, map: &CityMap, now: u64) -> Option<RoadId>;
}

/// Default search policy: picks uniformly at random among the roads
/// leaving the intersection at the end of the agent's current road.
/// Deterministic and free of interior mutability — the RNG is reseeded
/// per call from `(base_seed, agent, now)` so repeated calls for the same
/// agent at the same time are reproducible.
#[derive(Debug, Clone, Copy)]
pub struct RandomRoadSearchPolicy {
    pub base_seed: u64,
}

impl RandomRoadSearchPolicy {
    pub fn new(base_seed: u64) -> Self {
        Self { base_seed }
    }
}

impl SearchPolicy for RandomRoadSearchPolicy {
    fn next_road(&self, agent: Entity, current: LocationOnRoad, map: &CityMap, now: u64) -> Option<RoadId> {
        let road = map.road(current.road);
        let choices = map.outgoing_roads(road.to);
        if choices.is_empty() {
            return None;
        }
        let seed = self
            .base_seed
            .wrapping_add(agent.index() as u64)
            .wrapping_mul(0x9E3779B97F4A7C15)
            .wrapping_add(now);
        let mut rng = StdRng::seed_from_u64(seed);
        let idx = rng.gen_range(0..choices.len());
        Some(choices[idx])
    }
}

/// Wraps the configured search policy as an ECS resource.
#[derive(Resource)]
pub struct SearchPolicyResource(pub Box<dyn SearchPolicy>);

/// Invokes the policy, catching panics per the "exceptions from the
/// search-policy collaborator are logged and the offending agent is left
/// in its current phase" requirement.
pub fn invoke_search_policy(
    policy: &dyn SearchPolicy,
    agent: Entity,
    current: LocationOnRoad,
    map: &CityMap,
    now: u64,
) -> Option<RoadId> {
    match catch_unwind(AssertUnwindSafe(|| policy.next_road(agent, current, map, now))) {
        Ok(result) => result,
        Err(_) => {
            eprintln!("search policy panicked for agent {agent:?} at time {now}; agent left parked");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::CityMapBuilder;

    #[test]
    fn random_policy_picks_among_outgoing_roads() {
        let mut b = CityMapBuilder::new();
        let a = b.add_intersection(0.0, 0.0);
        let c = b.add_intersection(0.0, 1.0);
        let d = b.add_intersection(1.0, 1.0);
        let ac = b.add_road(a, c, 10);
        b.add_road(c, d, 10);
        b.add_road(c, a, 10);
        let map = b.build();

        let policy = RandomRoadSearchPolicy::new(7);
        let loc = LocationOnRoad {
            road: ac,
            travel_time_from_start: 0,
        };
        let chosen = policy.next_road(Entity::from_raw(1), loc, &map, 0).unwrap();
        assert!(map.outgoing_roads(map.road(ac).to).contains(&chosen));
    }

    #[test]
    fn random_policy_is_deterministic_for_same_inputs() {
        let mut b = CityMapBuilder::new();
        let a = b.add_intersection(0.0, 0.0);
        let c = b.add_intersection(0.0, 1.0);
        let ac = b.add_road(a, c, 10);
        b.add_road(c, a, 10);
        let map = b.build();

        let policy = RandomRoadSearchPolicy::new(99);
        let loc = LocationOnRoad {
            road: ac,
            travel_time_from_start: 0,
        };
        let first = policy.next_road(Entity::from_raw(3), loc, &map, 50);
        let second = policy.next_road(Entity::from_raw(3), loc, &map, 50);
        assert_eq!(first, second);
    }

    #[test]
    fn returns_none_at_a_dead_end() {
        let mut b = CityMapBuilder::new();
        let a = b.add_intersection(0.0, 0.0);
        let c = b.add_intersection(0.0, 1.0);
        let ac = b.add_road(a, c, 10);
        let map = b.build();

        let policy = RandomRoadSearchPolicy::new(1);
        let loc = LocationOnRoad {
            road: ac,
            travel_time_from_start: 0,
        };
        assert_eq!(policy.next_road(Entity::from_raw(1), loc, &map, 0), None);
    }
}
