//! Dispatch scheduler: applies one stable-matching result to the ECS
//! world, computing pickup/dropoff timing and the optional hub detour.

use bevy_ecs::prelude::{Entity, World};

use crate::clock::{AgentTrigger, EventKind, ResourceEventCause, SimulationClock};
use crate::ecs::{Agent, AgentAssignment, AgentPhase, EmptyAgents, MapResource, ResourceRequest, WaitingResources};
use crate::errors::InvariantViolation;
use crate::map::{CityMap, LocationOnRoad};
use crate::pool::PoolBatcher;
use crate::scenario::Hubs;
use crate::telemetry::Statistics;

/// Finds the nearest hub to `from` by travel time, returning its location
/// and the travel time to reach it, or `None` if there are no hubs or none
/// are reachable.
fn nearest_hub(map: &CityMap, hubs: &[LocationOnRoad], from: LocationOnRoad) -> Option<(LocationOnRoad, u64)> {
    hubs.iter()
        .filter_map(|hub| map.travel_time(from, *hub).map(|t| (*hub, t)))
        .min_by_key(|(_, t)| *t)
}

/// Applies a match between `agent_id` and `resource_id`, computed at pool
/// close time `close_time`. Cancels the agent's outstanding search-loop
/// event, schedules the single post-match dropoff event (including any
/// hub detour), and records telemetry.
pub fn dispatch_match(
    world: &mut World,
    close_time: u64,
    agent_id: Entity,
    resource_id: Entity,
    benefit: f64,
) -> Result<(), InvariantViolation> {
    let map = world
        .get_resource::<MapResource>()
        .ok_or_else(|| InvariantViolation::MissingComponent("CityMap".into()))?
        .0
        .clone();
    let hubs = world
        .get_resource::<Hubs>()
        .map(|h| h.0.clone())
        .unwrap_or_default();
    let hub_threshold = world
        .get_resource::<PoolBatcher>()
        .map(|p| p.hub_redirect_threshold_secs)
        .unwrap_or(60);

    let resource = *world
        .get::<ResourceRequest>(resource_id)
        .ok_or_else(|| InvariantViolation::MissingComponent("ResourceRequest".into()))?;

    let agent_location = {
        let agent = world
            .get::<Agent>(agent_id)
            .ok_or_else(|| InvariantViolation::MissingComponent("Agent".into()))?;
        agent.location_at(close_time, &map)
    };

    let approach_time = map
        .travel_time(agent_location, resource.pickup)
        .ok_or_else(|| InvariantViolation::AgentNotEmpty("agent cannot reach pickup".into()))?;
    let arrive_time = close_time + approach_time;
    let dropoff_arrival = arrive_time + resource.trip_time;

    let (final_location, t_hub) = match nearest_hub(&map, &hubs, resource.dropoff) {
        Some((hub, hub_time)) if hub_time < hub_threshold => (hub, hub_time),
        _ => (resource.dropoff, 0),
    };
    let event_time = dropoff_arrival + t_hub;

    let wait_time = arrive_time.saturating_sub(resource.available_time);

    let (prior_handle, start_search_time) = {
        let agent = world
            .get::<Agent>(agent_id)
            .ok_or_else(|| InvariantViolation::MissingComponent("Agent".into()))?;
        (agent.next_event_handle, agent.start_search_time)
    };
    let cruise_time = close_time.saturating_sub(start_search_time);
    let search_time = cruise_time + approach_time;

    if let Some(handle) = prior_handle {
        if let Some(mut clock) = world.get_resource_mut::<SimulationClock>() {
            clock.cancel(handle);
        }
    }

    let handle = {
        let mut clock = world
            .get_resource_mut::<SimulationClock>()
            .ok_or_else(|| InvariantViolation::MissingComponent("SimulationClock".into()))?;
        clock.schedule_at(event_time, EventKind::Agent(agent_id, AgentTrigger::DropoffReached))
    };

    {
        let mut agent = world
            .get_mut::<Agent>(agent_id)
            .ok_or_else(|| InvariantViolation::MissingComponent("Agent".into()))?;
        agent.phase = AgentPhase::PickingUp;
        agent.next_event_time = event_time;
        agent.next_event_handle = Some(handle);
        agent.assignment = Some(AgentAssignment {
            resource: resource_id,
            pickup: resource.pickup,
            dropoff: final_location,
        });
    }

    if let Some(mut empty_agents) = world.get_resource_mut::<EmptyAgents>() {
        empty_agents.0.remove(&agent_id);
    }
    if let Some(mut waiting) = world.get_resource_mut::<WaitingResources>() {
        waiting.0.remove(&resource_id);
    }

    if let Some(mut stats) = world.get_resource_mut::<Statistics>() {
        stats.total_assignments += 1;
        stats.total_cruise_time += cruise_time;
        stats.total_approach_time += approach_time;
        stats.total_search_time += search_time;
        stats.total_wait_time += wait_time;
        stats.total_benefit += benefit;
    }

    world.despawn(resource_id);

    Ok(())
}

/// Marks a pooled-but-unmatched resource as waiting, scheduling its
/// expiration event.
pub fn mark_resource_surplus(world: &mut World, resource_id: Entity) -> Result<(), InvariantViolation> {
    let expiration_time = world
        .get::<ResourceRequest>(resource_id)
        .ok_or_else(|| InvariantViolation::MissingComponent("ResourceRequest".into()))?
        .expiration_time;

    let handle = {
        let mut clock = world
            .get_resource_mut::<SimulationClock>()
            .ok_or_else(|| InvariantViolation::MissingComponent("SimulationClock".into()))?;
        clock.schedule_at(
            expiration_time,
            EventKind::Resource(resource_id, ResourceEventCause::Expired),
        )
    };

    let mut request = world
        .get_mut::<ResourceRequest>(resource_id)
        .ok_or_else(|| InvariantViolation::MissingComponent("ResourceRequest".into()))?;
    request.next_event_handle = Some(handle);

    if let Some(mut waiting) = world.get_resource_mut::<crate::ecs::WaitingResources>() {
        waiting.0.insert(resource_id);
    }

    Ok(())
}
