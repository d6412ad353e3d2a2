//! Pool batcher: accumulates resource arrivals over a fixed window before
//! handing the batch to the stable matcher.

use bevy_ecs::prelude::{Entity, Resource};

/// The 30-second accumulation window, plus the associated hub-redirect
/// threshold used by the dispatch scheduler.
#[derive(Resource, Debug, Clone)]
pub struct PoolBatcher {
    pub pool_start: u64,
    pub pool_end: u64,
    pub window_secs: u64,
    pub hub_redirect_threshold_secs: u64,
    pub batch: Vec<Entity>,
}

impl PoolBatcher {
    pub fn new(start_time: u64, window_secs: u64, hub_redirect_threshold_secs: u64) -> Self {
        Self {
            pool_start: start_time,
            pool_end: start_time + window_secs,
            window_secs,
            hub_redirect_threshold_secs,
            batch: Vec::new(),
        }
    }

    /// Advances the window by one fixed step, regardless of the time at
    /// which the pool actually closed.
    pub fn slide(&mut self) {
        self.pool_start = self.pool_end;
        self.pool_end += self.window_secs;
    }

    pub fn take_batch(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.batch)
    }
}
