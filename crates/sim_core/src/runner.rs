//! Clock progression and event routing happen here, outside the per-event
//! handler functions in `systems`.

use bevy_ecs::prelude::World;

use crate::clock::{AgentTrigger, EventKind, ResourceEventCause, SimulationClock};
use crate::ecs::{EmptyAgents, WaitingResources};
use crate::errors::InvariantViolation;
use crate::pool::PoolBatcher;
use crate::systems::agent_cycle::{handle_dropoff_reached, handle_intersection_reached};
use crate::systems::pool_batching::{close_pool, enqueue_arrival};
use crate::systems::resource_lifecycle::handle_resource_expired;
use crate::telemetry::Statistics;

/// Ensures the ambient bookkeeping resources a scenario needs are present,
/// so `run_next_event` never has to treat their absence as a setup error.
pub fn initialize_simulation(world: &mut World) {
    if world.get_resource::<Statistics>().is_none() {
        world.insert_resource(Statistics::default());
    }
    if world.get_resource::<EmptyAgents>().is_none() {
        world.insert_resource(EmptyAgents::default());
    }
    if world.get_resource::<WaitingResources>().is_none() {
        world.insert_resource(WaitingResources::default());
    }
}

/// Closes the pool, sliding its window forward by one fixed step
/// regardless of the actual close time — the overlap/gap this can
/// introduce when a close fires early is intentional, matching the
/// windowing behavior described for the pool batcher.
fn close_and_slide(world: &mut World, close_time: u64) -> Result<(), InvariantViolation> {
    close_pool(world, close_time)?;
    if let Some(mut pool) = world.get_resource_mut::<PoolBatcher>() {
        pool.slide();
    }
    Ok(())
}

/// Pops and processes exactly one event. Returns `Ok(true)` if an event
/// was processed, `Ok(false)` if the queue was empty.
pub fn run_next_event(world: &mut World) -> Result<bool, InvariantViolation> {
    let event = {
        let mut clock = world
            .get_resource_mut::<SimulationClock>()
            .ok_or_else(|| InvariantViolation::MissingComponent("SimulationClock".into()))?;
        clock.pop_next()
    };
    let Some(event) = event else {
        return Ok(false);
    };

    // Any popped event, regardless of kind, can be the one whose time has
    // crossed the current pool's close boundary.
    loop {
        let pool_end = match world.get_resource::<PoolBatcher>() {
            Some(pool) => pool.pool_end,
            None => break,
        };
        if event.time < pool_end {
            break;
        }
        let batch_nonempty = world
            .get_resource::<PoolBatcher>()
            .map(|p| !p.batch.is_empty())
            .unwrap_or(false);
        if batch_nonempty {
            close_and_slide(world, pool_end)?;
        } else if let Some(mut pool) = world.get_resource_mut::<PoolBatcher>() {
            pool.slide();
        } else {
            break;
        }
    }

    match event.kind {
        EventKind::Resource(id, ResourceEventCause::BecomesAvailable) => {
            let in_window = world
                .get_resource::<PoolBatcher>()
                .map(|p| event.time >= p.pool_start && event.time < p.pool_end)
                .unwrap_or(false);
            if in_window {
                let batch_nonempty = world
                    .get_resource::<PoolBatcher>()
                    .map(|p| !p.batch.is_empty())
                    .unwrap_or(false);
                if batch_nonempty {
                    // Anomaly: an in-window arrival fires while the buffer
                    // is already non-empty, itself triggering an early
                    // close at the firing event's own time.
                    close_and_slide(world, event.time)?;
                }
                enqueue_arrival(world, id);
            }
        }
        EventKind::Resource(id, ResourceEventCause::Expired) => {
            handle_resource_expired(world, id)?;
        }
        EventKind::Resource(_, ResourceEventCause::PickedUp) => {
            // Never itself queued; the resource entity is despawned at
            // match time, so this arm never actually fires.
        }
        EventKind::Agent(id, AgentTrigger::IntersectionReached) => {
            handle_intersection_reached(world, id, event.time)?;
        }
        EventKind::Agent(id, AgentTrigger::DropoffReached) => {
            handle_dropoff_reached(world, id, event.time)?;
        }
    }

    Ok(true)
}

/// Runs events until the queue is exhausted or `max_steps` is reached
/// (a safety valve against runaway/non-terminating scenarios). Returns the
/// number of events processed.
pub fn run_until_empty(world: &mut World, max_steps: u64) -> Result<u64, InvariantViolation> {
    let mut steps = 0;
    while steps < max_steps {
        if !run_next_event(world)? {
            break;
        }
        steps += 1;
    }
    Ok(steps)
}
