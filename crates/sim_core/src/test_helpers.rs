//! Test helpers for common test setup and utilities.
//!
//! This module provides shared test utilities to reduce duplication across test files.

use bevy_ecs::prelude::World;

use crate::clock::SimulationClock;
use crate::ecs::{EmptyAgents, MapResource, WaitingResources};
use crate::map::{CityMap, CityMapBuilder, IntersectionId, RoadId};
use crate::pool::PoolBatcher;
use crate::scenario::Hubs;
use crate::search_policy::{RandomRoadSearchPolicy, SearchPolicyResource};
use crate::telemetry::Statistics;

/// A small two-intersection, two-road (bidirectional) map used across test
/// files for consistency: `ROAD_OUT` runs start -> end, `ROAD_BACK` runs
/// end -> start, each taking 30 seconds.
pub const ROAD_TRAVEL_TIME: u64 = 30;

pub fn test_map() -> CityMap {
    let mut builder = CityMapBuilder::new();
    let start = builder.add_intersection(37.77, -122.41);
    let end = builder.add_intersection(37.78, -122.40);
    builder.add_road(start, end, ROAD_TRAVEL_TIME);
    builder.add_road(end, start, ROAD_TRAVEL_TIME);
    builder.build()
}

pub fn test_road_out() -> RoadId {
    test_map().roads()[0].id
}

pub fn test_road_back() -> RoadId {
    test_map().roads()[1].id
}

pub fn test_start_intersection() -> IntersectionId {
    IntersectionId(0)
}

pub fn test_end_intersection() -> IntersectionId {
    IntersectionId(1)
}

/// Creates a minimal world with every ambient resource `run_next_event`
/// expects present, a tiny two-node map, and a deterministic search policy.
/// For scenarios that need placed agents or scheduled resources, use
/// [`crate::scenario::build_scenario`] on top of this.
pub fn create_test_world() -> World {
    let mut world = World::new();
    world.insert_resource(SimulationClock::new());
    world.insert_resource(PoolBatcher::new(0, 30, 60));
    world.insert_resource(EmptyAgents::default());
    world.insert_resource(WaitingResources::default());
    world.insert_resource(Statistics::default());
    world.insert_resource(Hubs::default());
    world.insert_resource(MapResource(test_map()));
    world.insert_resource(SearchPolicyResource(Box::new(RandomRoadSearchPolicy::new(1))));
    world
}
