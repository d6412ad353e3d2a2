//! Per-event handlers invoked by the runner. Each function mutates the
//! world in response to exactly one popped event.

pub mod agent_cycle;
pub mod pool_batching;
pub mod resource_lifecycle;
