//! Pool-window bookkeeping: folding one resource's arrival into the
//! current batch, and closing a pool by running stable matching against
//! the currently-empty agents.

use bevy_ecs::prelude::{Entity, World};

use crate::dispatch::{dispatch_match, mark_resource_surplus};
use crate::ecs::{Agent, EmptyAgents, MapResource, ResourceRequest};
use crate::errors::InvariantViolation;
use crate::matching::{run_matching, AgentCandidate, ResourceCandidate};
use crate::pool::PoolBatcher;
use crate::telemetry::Statistics;

/// Folds a freshly-arrived resource into the open pool. Never itself
/// triggers a close — the runner decides when a close is due.
pub fn enqueue_arrival(world: &mut World, resource_id: Entity) {
    if let Some(mut pool) = world.get_resource_mut::<PoolBatcher>() {
        pool.batch.push(resource_id);
    }
}

/// Closes the currently open pool at `close_time`: runs stable matching
/// between the batched resources and the currently-empty agents, applies
/// every match, and marks any unmatched resources as surplus (waiting for
/// the next pool or their own expiration).
pub fn close_pool(world: &mut World, close_time: u64) -> Result<(), InvariantViolation> {
    let pool_start = world
        .get_resource::<PoolBatcher>()
        .map(|p| p.pool_start)
        .unwrap_or(close_time);
    let batch = world
        .get_resource_mut::<PoolBatcher>()
        .map(|mut p| p.take_batch())
        .unwrap_or_default();

    if batch.is_empty() {
        return Ok(());
    }

    let empty_agent_ids: Vec<Entity> = world
        .get_resource::<EmptyAgents>()
        .map(|e| e.0.iter().copied().collect())
        .unwrap_or_default();

    if let Some(mut stats) = world.get_resource_mut::<Statistics>() {
        stats.pool_count += 1;
        stats.total_resources_seen += batch.len() as u64;
        stats.total_pool_time += close_time.saturating_sub(pool_start);
    }

    if empty_agent_ids.is_empty() {
        for resource_id in batch {
            mark_resource_surplus(world, resource_id)?;
        }
        return Ok(());
    }

    let map = world
        .get_resource::<MapResource>()
        .ok_or_else(|| InvariantViolation::MissingComponent("CityMap".into()))?
        .0
        .clone();

    let resource_candidates: Vec<ResourceCandidate> = batch
        .iter()
        .filter_map(|id| {
            world
                .get::<ResourceRequest>(*id)
                .map(|r| ResourceCandidate {
                    id: *id,
                    pickup: r.pickup,
                    dropoff: r.dropoff,
                })
        })
        .collect();
    let agent_candidates: Vec<AgentCandidate> = empty_agent_ids
        .iter()
        .filter_map(|id| {
            world.get::<Agent>(*id).map(|a| AgentCandidate {
                id: *id,
                location: a.location_at(close_time, &map),
            })
        })
        .collect();

    let matches = run_matching(&resource_candidates, &agent_candidates, &map);

    let matched_resources: std::collections::HashSet<Entity> =
        matches.iter().map(|m| m.resource).collect();

    for m in &matches {
        dispatch_match(world, close_time, m.agent, m.resource, m.benefit)?;
    }

    for resource_id in batch {
        if !matched_resources.contains(&resource_id) {
            mark_resource_surplus(world, resource_id)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimulationClock;
    use crate::ecs::{AgentPhase, WaitingResources};
    use crate::map::{CityMap, CityMapBuilder, LocationOnRoad};
    use crate::scenario::Hubs;
    use bevy_ecs::prelude::Entity;

    /// A 4-intersection line A-B-C-D, both directions, 10s per hop. Lets
    /// agents and resources be placed at distinct, well-separated points.
    fn line_map() -> CityMap {
        let mut b = CityMapBuilder::new();
        let a = b.add_intersection(0.0, 0.0);
        let bi = b.add_intersection(0.0, 0.01);
        let c = b.add_intersection(0.0, 0.02);
        let d = b.add_intersection(0.0, 0.03);
        b.add_road(a, bi, 10);
        b.add_road(bi, a, 10);
        b.add_road(bi, c, 10);
        b.add_road(c, bi, 10);
        b.add_road(c, d, 10);
        b.add_road(d, c, 10);
        b.build()
    }

    fn base_world(map: CityMap) -> World {
        let mut world = World::new();
        world.insert_resource(SimulationClock::new());
        world.insert_resource(EmptyAgents::default());
        world.insert_resource(WaitingResources::default());
        world.insert_resource(Statistics::default());
        world.insert_resource(Hubs::default());
        world.insert_resource(PoolBatcher::new(0, 30, 60));
        world.insert_resource(MapResource(map));
        world
    }

    fn spawn_agent(world: &mut World, location: LocationOnRoad) -> Entity {
        let id = world
            .spawn(Agent {
                location,
                start_search_time: 0,
                next_event_time: 0,
                next_event_handle: None,
                phase: AgentPhase::IntersectionReached,
                assignment: None,
            })
            .id();
        world.get_resource_mut::<EmptyAgents>().unwrap().0.insert(id);
        id
    }

    fn spawn_resource(
        world: &mut World,
        pickup: LocationOnRoad,
        dropoff: LocationOnRoad,
        available_time: u64,
    ) -> Entity {
        let id = world
            .spawn(ResourceRequest {
                pickup,
                dropoff,
                available_time,
                trip_time: 40,
                expiration_time: available_time + 300,
                event_cause: crate::clock::ResourceEventCause::BecomesAvailable,
                next_event_handle: None,
            })
            .id();
        world.get_resource_mut::<PoolBatcher>().unwrap().batch.push(id);
        id
    }

    #[test]
    fn closing_an_empty_batch_is_a_no_op() {
        let mut world = base_world(line_map());
        close_pool(&mut world, 30).unwrap();
        let stats = world.get_resource::<Statistics>().unwrap();
        assert_eq!(stats.pool_count, 0);
    }

    #[test]
    fn more_resources_than_agents_leaves_exactly_the_surplus_waiting() {
        let map = line_map();
        let roads = map.roads().to_vec();
        let ab = roads[0].id;
        let ba = roads[1].id;
        let bc = roads[2].id;
        let cd = roads[4].id;
        let dc = roads[5].id;
        let mut world = base_world(map);

        let agent_near_a = spawn_agent(
            &mut world,
            LocationOnRoad {
                road: ab,
                travel_time_from_start: 0,
            },
        );
        let agent_near_d = spawn_agent(
            &mut world,
            LocationOnRoad {
                road: dc,
                travel_time_from_start: 0,
            },
        );

        let r_near_a = spawn_resource(
            &mut world,
            LocationOnRoad {
                road: ab,
                travel_time_from_start: 0,
            },
            LocationOnRoad {
                road: bc,
                travel_time_from_start: 10,
            },
            5,
        );
        let r_near_d = spawn_resource(
            &mut world,
            LocationOnRoad {
                road: cd,
                travel_time_from_start: 10,
            },
            LocationOnRoad {
                road: ba,
                travel_time_from_start: 10,
            },
            5,
        );
        let r_middle = spawn_resource(
            &mut world,
            LocationOnRoad {
                road: bc,
                travel_time_from_start: 0,
            },
            LocationOnRoad {
                road: cd,
                travel_time_from_start: 10,
            },
            5,
        );

        close_pool(&mut world, 30).unwrap();

        let stats = world.get_resource::<Statistics>().unwrap();
        assert_eq!(stats.pool_count, 1);
        assert_eq!(stats.total_resources_seen, 3);
        assert_eq!(stats.total_assignments, 2);

        // Both agents matched; resources closest to each agent are claimed.
        assert!(world.get::<ResourceRequest>(r_near_a).is_none());
        assert!(world.get::<ResourceRequest>(r_near_d).is_none());
        assert!(world.get_resource::<EmptyAgents>().unwrap().0.is_empty());

        // Exactly one resource is left over, waiting on its own expiration.
        let waiting = world.get_resource::<WaitingResources>().unwrap();
        assert_eq!(waiting.0.len(), 1);
        assert!(waiting.0.contains(&r_middle));
        assert!(world.get::<ResourceRequest>(r_middle).is_some());

        let agent_a = world.get::<Agent>(agent_near_a).unwrap();
        let agent_d = world.get::<Agent>(agent_near_d).unwrap();
        assert_eq!(agent_a.phase, AgentPhase::PickingUp);
        assert_eq!(agent_d.phase, AgentPhase::PickingUp);
    }

    #[test]
    fn resources_pooled_with_no_empty_agents_are_all_marked_surplus() {
        let map = line_map();
        let ab = map.roads()[0].id;
        let mut world = base_world(map);

        let r = spawn_resource(
            &mut world,
            LocationOnRoad {
                road: ab,
                travel_time_from_start: 0,
            },
            LocationOnRoad {
                road: ab,
                travel_time_from_start: 10,
            },
            5,
        );

        close_pool(&mut world, 30).unwrap();

        let stats = world.get_resource::<Statistics>().unwrap();
        assert_eq!(stats.total_assignments, 0);
        assert!(world.get_resource::<WaitingResources>().unwrap().0.contains(&r));
    }
}
