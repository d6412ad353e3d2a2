//! Deferred-acceptance (Gale-Shapley) stable matching with bilateral
//! preferences: resources rank agents by benefit (closer approach is
//! better), agents rank resources by reach time (sooner is better). Ties
//! on either side are broken by the smaller entity id.

use std::collections::{HashMap, VecDeque};

use bevy_ecs::prelude::Entity;

use super::{AgentCandidate, ResourceCandidate};
use crate::map::{great_circle_distance, CityMap, LocationOnRoad};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub agent: Entity,
    pub resource: Entity,
    pub benefit: f64,
}

/// Approximate lat/lon of a point along a road, linearly interpolated
/// between its endpoints by fractional progress.
fn approximate_coords(map: &CityMap, loc: LocationOnRoad) -> (f64, f64) {
    let road = map.road(loc.road);
    let from = map.intersection(road.from);
    let to = map.intersection(road.to);
    if road.travel_time == 0 {
        return (from.lat, from.lon);
    }
    let t = loc.travel_time_from_start as f64 / road.travel_time as f64;
    (
        from.lat + (to.lat - from.lat) * t,
        from.lon + (to.lon - from.lon) * t,
    )
}

fn great_circle_between(map: &CityMap, a: LocationOnRoad, b: LocationOnRoad) -> f64 {
    let (lat1, lon1) = approximate_coords(map, a);
    let (lat2, lon2) = approximate_coords(map, b);
    great_circle_distance(lat1, lon1, lat2, lon2)
}

/// A resource's preference weight for a candidate agent: the ratio of the
/// resource's own trip distance to the total of trip plus approach
/// distance. Bounded in `(0, 1]` as long as the trip distance is
/// strictly positive; larger is better (a shorter approach relative to
/// the trip is preferred).
pub fn benefit(resource: &ResourceCandidate, agent: &AgentCandidate, map: &CityMap) -> f64 {
    let trip_dist = great_circle_between(map, resource.pickup, resource.dropoff);
    let approach_dist = great_circle_between(map, agent.location, resource.pickup);
    trip_dist / (trip_dist + approach_dist)
}

/// How long it would take the agent to reach the resource's pickup point
/// over the road network. `None` if unreachable, treated as the worst
/// possible preference.
pub fn reach_time(agent: &AgentCandidate, resource: &ResourceCandidate, map: &CityMap) -> Option<u64> {
    map.travel_time(agent.location, resource.pickup)
}

fn rank_agents_for_resource(
    resource: &ResourceCandidate,
    agents: &[AgentCandidate],
    map: &CityMap,
) -> Vec<Entity> {
    let mut scored: Vec<(Entity, f64)> = agents
        .iter()
        .map(|a| (a.id, benefit(resource, a, map)))
        .collect();
    scored.sort_by(|(id_a, benefit_a), (id_b, benefit_b)| {
        benefit_b
            .partial_cmp(benefit_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| id_a.cmp(id_b))
    });
    scored.into_iter().map(|(id, _)| id).collect()
}

fn rank_resources_for_agent(
    agent: &AgentCandidate,
    resources: &[ResourceCandidate],
    map: &CityMap,
) -> Vec<Entity> {
    let mut scored: Vec<(Entity, u64)> = resources
        .iter()
        .filter_map(|r| reach_time(agent, r, map).map(|t| (r.id, t)))
        .collect();
    scored.sort_by(|(id_a, time_a), (id_b, time_b)| {
        time_a.cmp(time_b).then_with(|| id_a.cmp(id_b))
    });
    scored.into_iter().map(|(id, _)| id).collect()
}

/// Runs deferred acceptance with the shorter side proposing, producing a
/// stable matching under both sides' preference orders. Unmatched
/// resources and agents simply don't appear in the result. `|M| =
/// min(|A|, |R|)`.
pub fn stable_match(
    resources: &[ResourceCandidate],
    agents: &[AgentCandidate],
    map: &CityMap,
) -> Vec<Match> {
    if resources.is_empty() || agents.is_empty() {
        return Vec::new();
    }

    let resources_by_id: HashMap<Entity, &ResourceCandidate> =
        resources.iter().map(|r| (r.id, r)).collect();
    let agents_by_id: HashMap<Entity, &AgentCandidate> = agents.iter().map(|a| (a.id, a)).collect();

    let resource_prefs: HashMap<Entity, Vec<Entity>> = resources
        .iter()
        .map(|r| (r.id, rank_agents_for_resource(r, agents, map)))
        .collect();
    let agent_prefs: HashMap<Entity, Vec<Entity>> = agents
        .iter()
        .map(|a| (a.id, rank_resources_for_agent(a, resources, map)))
        .collect();

    let pairs: Vec<(Entity, Entity)> = if resources.len() <= agents.len() {
        gale_shapley(
            resources.iter().map(|r| r.id),
            &resource_prefs,
            &agent_prefs,
        )
    } else {
        gale_shapley(agents.iter().map(|a| a.id), &agent_prefs, &resource_prefs)
            .into_iter()
            .map(|(agent, resource)| (resource, agent))
            .collect()
    };

    pairs
        .into_iter()
        .filter_map(|(resource, agent)| {
            let r = *resources_by_id.get(&resource)?;
            let a = *agents_by_id.get(&agent)?;
            Some(Match {
                agent,
                resource,
                benefit: benefit(r, a, map),
            })
        })
        .collect()
}

/// Generic deferred acceptance: `proposers` propose down their own
/// preference list (`proposer_prefs`); `receiver_prefs` ranks proposers
/// from each receiver's perspective. Returns `(proposer, receiver)` pairs,
/// except this helper is always invoked with the resource side as the
/// first element of the tuple, agent side second — callers on the "agents
/// propose" branch flip the tuple back before returning.
fn gale_shapley(
    proposers: impl Iterator<Item = Entity>,
    proposer_prefs: &HashMap<Entity, Vec<Entity>>,
    receiver_prefs: &HashMap<Entity, Vec<Entity>>,
) -> Vec<(Entity, Entity)> {
    let mut free: VecDeque<Entity> = {
        let mut ids: Vec<Entity> = proposers.collect();
        ids.sort();
        ids.into()
    };
    let mut next_proposal_index: HashMap<Entity, usize> = HashMap::new();
    let mut held_by_receiver: HashMap<Entity, Entity> = HashMap::new();
    let mut match_of_proposer: HashMap<Entity, Entity> = HashMap::new();

    let receiver_rank: HashMap<Entity, HashMap<Entity, usize>> = receiver_prefs
        .iter()
        .map(|(receiver, prefs)| {
            let rank: HashMap<Entity, usize> = prefs
                .iter()
                .enumerate()
                .map(|(i, id)| (*id, i))
                .collect();
            (*receiver, rank)
        })
        .collect();

    while let Some(proposer) = free.pop_front() {
        let prefs = match proposer_prefs.get(&proposer) {
            Some(p) => p,
            None => continue,
        };
        let idx = next_proposal_index.entry(proposer).or_insert(0);
        if *idx >= prefs.len() {
            continue;
        }
        let receiver = prefs[*idx];
        *idx += 1;

        let rank = match receiver_rank.get(&receiver) {
            Some(r) => r,
            None => {
                free.push_back(proposer);
                continue;
            }
        };
        let proposer_rank = match rank.get(&proposer) {
            Some(r) => *r,
            None => {
                // Receiver never ranked this proposer (e.g. unreachable);
                // this proposal is rejected outright.
                free.push_back(proposer);
                continue;
            }
        };

        match held_by_receiver.get(&receiver).copied() {
            None => {
                held_by_receiver.insert(receiver, proposer);
                match_of_proposer.insert(proposer, receiver);
            }
            Some(current) => {
                let current_rank = rank[&current];
                if proposer_rank < current_rank {
                    held_by_receiver.insert(receiver, proposer);
                    match_of_proposer.insert(proposer, receiver);
                    match_of_proposer.remove(&current);
                    free.push_back(current);
                } else {
                    free.push_back(proposer);
                }
            }
        }
    }

    match_of_proposer.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::CityMapBuilder;

    fn line_map() -> CityMap {
        let mut b = CityMapBuilder::new();
        let a = b.add_intersection(0.0, 0.0);
        let c = b.add_intersection(0.0, 0.01);
        let d = b.add_intersection(0.0, 0.02);
        b.add_road(a, c, 60);
        b.add_road(c, d, 60);
        b.add_road(d, c, 60);
        b.add_road(c, a, 60);
        b.build()
    }

    #[test]
    fn closer_agent_wins_the_nearer_resource() {
        let map = line_map();
        let road_ac = map.roads()[0].id;
        let road_cd = map.roads()[1].id;

        let agent_near = AgentCandidate {
            id: Entity::from_raw(1),
            location: LocationOnRoad {
                road: road_ac,
                travel_time_from_start: 0,
            },
        };
        let agent_far = AgentCandidate {
            id: Entity::from_raw(2),
            location: LocationOnRoad {
                road: road_cd,
                travel_time_from_start: 60,
            },
        };
        let resource = ResourceCandidate {
            id: Entity::from_raw(10),
            pickup: LocationOnRoad {
                road: road_ac,
                travel_time_from_start: 0,
            },
            dropoff: LocationOnRoad {
                road: road_cd,
                travel_time_from_start: 60,
            },
        };

        let matches = stable_match(&[resource], &[agent_near, agent_far], &map);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].agent, agent_near.id);
        assert!(matches[0].benefit > 0.0 && matches[0].benefit <= 1.0);
    }

    #[test]
    fn ties_broken_by_smaller_id() {
        let map = line_map();
        let road_ac = map.roads()[0].id;
        let road_cd = map.roads()[1].id;
        let loc = LocationOnRoad {
            road: road_ac,
            travel_time_from_start: 0,
        };
        let agent_a = AgentCandidate {
            id: Entity::from_raw(5),
            location: loc,
        };
        let agent_b = AgentCandidate {
            id: Entity::from_raw(3),
            location: loc,
        };
        let resource = ResourceCandidate {
            id: Entity::from_raw(1),
            pickup: loc,
            dropoff: LocationOnRoad {
                road: road_cd,
                travel_time_from_start: 30,
            },
        };

        let matches = stable_match(&[resource], &[agent_a, agent_b], &map);
        assert_eq!(matches[0].agent, Entity::from_raw(3));
    }

    #[test]
    fn more_resources_than_agents_leaves_some_unmatched() {
        let map = line_map();
        let road_ac = map.roads()[0].id;
        let road_cd = map.roads()[1].id;
        let loc = LocationOnRoad {
            road: road_ac,
            travel_time_from_start: 0,
        };
        let dropoff = LocationOnRoad {
            road: road_cd,
            travel_time_from_start: 30,
        };
        let agent = AgentCandidate {
            id: Entity::from_raw(1),
            location: loc,
        };
        let r1 = ResourceCandidate {
            id: Entity::from_raw(10),
            pickup: loc,
            dropoff,
        };
        let r2 = ResourceCandidate {
            id: Entity::from_raw(11),
            pickup: loc,
            dropoff,
        };

        let matches = stable_match(&[r1, r2], &[agent], &map);
        assert_eq!(matches.len(), 1);
    }
}
