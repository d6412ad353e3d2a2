//! Agent-side transitions: the empty-agent search loop and the post-match
//! dropoff handling.

use bevy_ecs::prelude::{Entity, World};

use crate::clock::{AgentTrigger, EventKind, SimulationClock};
use crate::ecs::{Agent, AgentPhase, EmptyAgents, MapResource};
use crate::errors::InvariantViolation;
use crate::map::LocationOnRoad;
use crate::search_policy::{invoke_search_policy, SearchPolicyResource};

/// The agent has reached an intersection (either fresh from placement or
/// after completing a leg of its search loop) and must pick a next road.
/// A policy failure or dead end leaves the agent parked with no pending
/// event, per the search-policy error-handling requirement.
pub fn handle_intersection_reached(
    world: &mut World,
    agent_id: Entity,
    now: u64,
) -> Result<(), InvariantViolation> {
    let location = world
        .get::<Agent>(agent_id)
        .ok_or_else(|| InvariantViolation::MissingComponent("Agent".into()))?
        .location;

    let map = world
        .get_resource::<MapResource>()
        .ok_or_else(|| InvariantViolation::MissingComponent("CityMap".into()))?
        .0
        .clone();
    let policy = world
        .get_resource::<SearchPolicyResource>()
        .ok_or_else(|| InvariantViolation::MissingComponent("SearchPolicyResource".into()))?;

    let chosen = invoke_search_policy(policy.0.as_ref(), agent_id, location, &map, now);

    let Some(road_id) = chosen else {
        let mut agent = world
            .get_mut::<Agent>(agent_id)
            .ok_or_else(|| InvariantViolation::MissingComponent("Agent".into()))?;
        agent.next_event_handle = None;
        return Ok(());
    };

    let road = map.road(road_id);
    let next_location = LocationOnRoad {
        road: road_id,
        travel_time_from_start: 0,
    };
    let event_time = now + road.travel_time;

    let handle = {
        let mut clock = world
            .get_resource_mut::<SimulationClock>()
            .ok_or_else(|| InvariantViolation::MissingComponent("SimulationClock".into()))?;
        clock.schedule_at(
            event_time,
            EventKind::Agent(agent_id, AgentTrigger::IntersectionReached),
        )
    };

    let mut agent = world
        .get_mut::<Agent>(agent_id)
        .ok_or_else(|| InvariantViolation::MissingComponent("Agent".into()))?;
    agent.location = next_location;
    agent.next_event_time = event_time;
    agent.next_event_handle = Some(handle);

    Ok(())
}

/// The single post-match event firing: the agent reaches its dropoff (and
/// optional hub detour) destination, becomes empty again, and immediately
/// re-enters the search loop from that point.
pub fn handle_dropoff_reached(
    world: &mut World,
    agent_id: Entity,
    now: u64,
) -> Result<(), InvariantViolation> {
    let final_location = {
        let mut agent = world
            .get_mut::<Agent>(agent_id)
            .ok_or_else(|| InvariantViolation::MissingComponent("Agent".into()))?;
        agent.phase = AgentPhase::DroppingOff;
        let final_location = agent
            .assignment
            .map(|a| a.dropoff)
            .unwrap_or(agent.location);
        agent.location = final_location;
        agent.assignment = None;
        agent.phase = AgentPhase::IntersectionReached;
        agent.start_search_time = now;
        agent.next_event_handle = None;
        final_location
    };

    if let Some(mut empty_agents) = world.get_resource_mut::<EmptyAgents>() {
        empty_agents.0.insert(agent_id);
    }

    let _ = final_location;
    handle_intersection_reached(world, agent_id, now)
}
