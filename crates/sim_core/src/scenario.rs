//! Scenario assembly: turns a road network, a hub list, and a resource
//! trace into a fully-primed ECS world ready for the runner.

use bevy_ecs::prelude::{Resource, World};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::clock::{AgentTrigger, EventKind, ResourceEventCause, SimulationClock};
use crate::ecs::{Agent, AgentPhase, EmptyAgents, MapResource, ResourceRequest, WaitingResources};
use crate::errors::SetupError;
use crate::map::{CityMap, LocationOnRoad};
use crate::pool::PoolBatcher;
use crate::search_policy::{RandomRoadSearchPolicy, SearchPolicyResource};
use crate::spawner::random_road;
use crate::telemetry::Statistics;

/// The configured set of hub locations agents may be redirected through
/// after a dropoff when one is close enough.
#[derive(Resource, Debug, Default, Clone)]
pub struct Hubs(pub Vec<LocationOnRoad>);

/// One resource request as provided by an external loader or a synthetic
/// generator, prior to being scheduled onto the event queue.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSeed {
    pub pickup: LocationOnRoad,
    pub dropoff: LocationOnRoad,
    pub available_time: u64,
    pub trip_time: u64,
}

/// Configuration accepted by [`build_scenario`]. Mirrors the CLI surface:
/// total agent count, resource lifetime, placement seed, and the optional
/// speed reduction already baked into the supplied [`CityMap`].
#[derive(Debug, Clone)]
pub struct ScenarioParams {
    pub seed: u64,
    pub total_agents: u32,
    pub resource_maximum_life_time: u64,
    pub pool_window_secs: u64,
    pub pool_initial_offset: u64,
    pub hub_redirect_threshold_secs: u64,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            seed: 0,
            total_agents: 0,
            resource_maximum_life_time: 300,
            pool_window_secs: 30,
            pool_initial_offset: 0,
            hub_redirect_threshold_secs: 60,
        }
    }
}

impl ScenarioParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_total_agents(mut self, total_agents: u32) -> Self {
        self.total_agents = total_agents;
        self
    }

    pub fn with_resource_maximum_life_time(mut self, secs: u64) -> Self {
        self.resource_maximum_life_time = secs;
        self
    }

    pub fn with_pool_window_secs(mut self, secs: u64) -> Self {
        self.pool_window_secs = secs;
        self
    }

    pub fn with_pool_initial_offset(mut self, secs: u64) -> Self {
        self.pool_initial_offset = secs;
        self
    }

    pub fn with_hub_redirect_threshold_secs(mut self, secs: u64) -> Self {
        self.hub_redirect_threshold_secs = secs;
        self
    }
}

/// Builds a complete, runnable world: installs the map, hubs, bookkeeping
/// resources, and the search policy, randomly places `params.total_agents`
/// empty agents on the network, and schedules every resource in
/// `resources` as a future `BECOMES_AVAILABLE` event.
pub fn build_scenario(
    world: &mut World,
    map: CityMap,
    hubs: Vec<LocationOnRoad>,
    resources: Vec<ResourceSeed>,
    params: ScenarioParams,
) -> Result<(), SetupError> {
    if map.intersections().is_empty() {
        return Err(SetupError::EmptyMap);
    }

    world.insert_resource(SimulationClock::new());
    world.insert_resource(PoolBatcher::new(
        params.pool_initial_offset,
        params.pool_window_secs,
        params.hub_redirect_threshold_secs,
    ));
    world.insert_resource(EmptyAgents::default());
    world.insert_resource(WaitingResources::default());
    world.insert_resource(Statistics::default());
    world.insert_resource(Hubs(hubs));
    world.insert_resource(SearchPolicyResource(Box::new(RandomRoadSearchPolicy::new(
        params.seed,
    ))));
    world.insert_resource(MapResource(map.clone()));

    let mut placement_rng = StdRng::seed_from_u64(params.seed);
    let mut agent_ids = Vec::with_capacity(params.total_agents as usize);
    for _ in 0..params.total_agents {
        let Some(road_id) = random_road(&map, &mut placement_rng) else {
            return Err(SetupError::EmptyMap);
        };
        let id = world
            .spawn(Agent {
                location: LocationOnRoad {
                    road: road_id,
                    travel_time_from_start: 0,
                },
                start_search_time: 0,
                next_event_time: 0,
                next_event_handle: None,
                phase: AgentPhase::IntersectionReached,
                assignment: None,
            })
            .id();
        agent_ids.push(id);
    }

    if let Some(mut empty) = world.get_resource_mut::<EmptyAgents>() {
        empty.0.extend(agent_ids.iter().copied());
    }

    for agent_id in agent_ids {
        let road = {
            let agent = world.get::<Agent>(agent_id).expect("just spawned");
            map.road(agent.location.road)
        };
        let event_time = road.travel_time;
        let handle = {
            let mut clock = world.get_resource_mut::<SimulationClock>().expect("just inserted");
            clock.schedule_at(
                event_time,
                EventKind::Agent(agent_id, AgentTrigger::IntersectionReached),
            )
        };
        let mut agent = world.get_mut::<Agent>(agent_id).expect("just spawned");
        agent.next_event_time = event_time;
        agent.next_event_handle = Some(handle);
    }

    for seed in resources {
        if params.resource_maximum_life_time == 0 {
            return Err(SetupError::InvalidResourceWindow {
                available: seed.available_time,
                life_time: params.resource_maximum_life_time,
            });
        }
        let expiration_time = seed.available_time + params.resource_maximum_life_time;
        let id = world
            .spawn(ResourceRequest {
                pickup: seed.pickup,
                dropoff: seed.dropoff,
                available_time: seed.available_time,
                trip_time: seed.trip_time,
                expiration_time,
                event_cause: ResourceEventCause::BecomesAvailable,
                next_event_handle: None,
            })
            .id();
        let mut clock = world.get_resource_mut::<SimulationClock>().expect("just inserted");
        clock.schedule_at(
            seed.available_time,
            EventKind::Resource(id, ResourceEventCause::BecomesAvailable),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::CityMapBuilder;

    fn tiny_map() -> CityMap {
        let mut b = CityMapBuilder::new();
        let a = b.add_intersection(0.0, 0.0);
        let c = b.add_intersection(0.0, 0.01);
        b.add_road(a, c, 30);
        b.add_road(c, a, 30);
        b.build()
    }

    #[test]
    fn build_scenario_places_and_schedules_agents() {
        let mut world = World::new();
        let params = ScenarioParams::default().with_seed(1).with_total_agents(5);
        build_scenario(&mut world, tiny_map(), vec![], vec![], params).unwrap();

        let empty = world.get_resource::<EmptyAgents>().unwrap();
        assert_eq!(empty.0.len(), 5);

        let clock = world.get_resource::<SimulationClock>().unwrap();
        assert_eq!(clock.pending_event_count(), 5);
    }

    #[test]
    fn build_scenario_rejects_empty_map() {
        let mut world = World::new();
        let empty_map = CityMapBuilder::new().build();
        let err = build_scenario(&mut world, empty_map, vec![], vec![], ScenarioParams::default());
        assert_eq!(err, Err(SetupError::EmptyMap));
    }

    #[test]
    fn build_scenario_schedules_resource_arrivals() {
        let mut world = World::new();
        let map = tiny_map();
        let road = map.roads()[0].id;
        let resources = vec![ResourceSeed {
            pickup: LocationOnRoad {
                road,
                travel_time_from_start: 0,
            },
            dropoff: LocationOnRoad {
                road,
                travel_time_from_start: 20,
            },
            available_time: 10,
            trip_time: 40,
        }];
        let params = ScenarioParams::default().with_seed(2).with_total_agents(0);
        build_scenario(&mut world, map, vec![], resources, params).unwrap();

        let clock = world.get_resource::<SimulationClock>().unwrap();
        assert_eq!(clock.pending_event_count(), 1);
    }

    #[test]
    fn build_scenario_handles_zero_agents_and_resources() {
        let mut world = World::new();
        let params = ScenarioParams::default();
        build_scenario(&mut world, tiny_map(), vec![], vec![], params).unwrap();
        let clock = world.get_resource::<SimulationClock>().unwrap();
        assert_eq!(clock.pending_event_count(), 0);
    }

    #[test]
    fn pool_initial_offset_shifts_the_first_window() {
        let mut world = World::new();
        let params = ScenarioParams::default()
            .with_pool_window_secs(30)
            .with_pool_initial_offset(100);
        build_scenario(&mut world, tiny_map(), vec![], vec![], params).unwrap();

        let pool = world.get_resource::<PoolBatcher>().unwrap();
        assert_eq!(pool.pool_start, 100);
        assert_eq!(pool.pool_end, 130);
    }
}
