//! Resource-side terminal transitions.

use bevy_ecs::prelude::{Entity, World};

use crate::ecs::WaitingResources;
use crate::errors::InvariantViolation;
use crate::telemetry::Statistics;

/// A waiting resource's lifetime ran out before it could be matched by any
/// later pool. Removed from bookkeeping and the world. If the resource was
/// somehow already resolved (not present in `waiting_resources`), this
/// fires no-op rather than double-counting it.
pub fn handle_resource_expired(world: &mut World, resource_id: Entity) -> Result<(), InvariantViolation> {
    let was_waiting = world
        .get_resource_mut::<WaitingResources>()
        .map(|mut w| w.0.remove(&resource_id))
        .unwrap_or(false);

    if !was_waiting {
        return Ok(());
    }

    if let Some(mut stats) = world.get_resource_mut::<Statistics>() {
        stats.expired_resources += 1;
    }
    world.despawn(resource_id);
    Ok(())
}
