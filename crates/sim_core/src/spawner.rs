//! Agent placement and synthetic resource generation. Kept apart from
//! `scenario` so the placement/generation policy can vary independently of
//! how a scenario is assembled.

use rand::rngs::StdRng;
use rand::Rng;

use crate::map::{CityMap, LocationOnRoad, RoadId};
use crate::scenario::ResourceSeed;

/// Picks a uniformly random road in the map. `None` only for a map with no
/// roads at all.
pub fn random_road(map: &CityMap, rng: &mut StdRng) -> Option<RoadId> {
    let roads = map.roads();
    if roads.is_empty() {
        return None;
    }
    let idx = rng.gen_range(0..roads.len());
    Some(roads[idx].id)
}

/// A pickup/dropoff pair placed on two independently-chosen random roads,
/// offset zero on each (the start of the road).
pub fn random_pickup_dropoff(map: &CityMap, rng: &mut StdRng) -> Option<(LocationOnRoad, LocationOnRoad)> {
    let pickup_road = random_road(map, rng)?;
    let dropoff_road = random_road(map, rng)?;
    Some((
        LocationOnRoad {
            road: pickup_road,
            travel_time_from_start: 0,
        },
        LocationOnRoad {
            road: dropoff_road,
            travel_time_from_start: 0,
        },
    ))
}

/// Inter-arrival time distribution for synthetic resource generation.
pub trait InterArrivalDistribution {
    fn next_gap(&self, rng: &mut StdRng) -> u64;
}

#[derive(Debug, Clone, Copy)]
pub struct UniformInterArrival {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl InterArrivalDistribution for UniformInterArrival {
    fn next_gap(&self, rng: &mut StdRng) -> u64 {
        if self.max_secs <= self.min_secs {
            return self.min_secs;
        }
        rng.gen_range(self.min_secs..=self.max_secs)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExponentialInterArrival {
    pub mean_secs: f64,
}

impl InterArrivalDistribution for ExponentialInterArrival {
    fn next_gap(&self, rng: &mut StdRng) -> u64 {
        let u: f64 = rng.gen_range(f64::EPSILON..1.0);
        (-self.mean_secs * u.ln()).round().max(0.0) as u64
    }
}

/// Generates `count` resources with pickup/dropoff placed uniformly at
/// random on the map and arrival times drawn from `distribution`, starting
/// at `window_start` and strictly increasing. `trip_time` is derived from
/// the travel-time oracle between the chosen pickup and dropoff, falling
/// back to `default_trip_time` if they're mutually unreachable.
pub fn generate_synthetic_resources(
    map: &CityMap,
    rng: &mut StdRng,
    count: u32,
    window_start: u64,
    distribution: &dyn InterArrivalDistribution,
    default_trip_time: u64,
) -> Vec<ResourceSeed> {
    let mut seeds = Vec::with_capacity(count as usize);
    let mut time = window_start;
    for _ in 0..count {
        time += distribution.next_gap(rng);
        let Some((pickup, dropoff)) = random_pickup_dropoff(map, rng) else {
            break;
        };
        let trip_time = map.travel_time(pickup, dropoff).unwrap_or(default_trip_time);
        seeds.push(ResourceSeed {
            pickup,
            dropoff,
            available_time: time,
            trip_time,
        });
    }
    seeds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::CityMapBuilder;
    use rand::SeedableRng;

    fn tiny_map() -> CityMap {
        let mut b = CityMapBuilder::new();
        let a = b.add_intersection(0.0, 0.0);
        let c = b.add_intersection(0.0, 0.01);
        b.add_road(a, c, 30);
        b.add_road(c, a, 30);
        b.build()
    }

    #[test]
    fn synthetic_resources_have_strictly_increasing_arrivals() {
        let map = tiny_map();
        let mut rng = StdRng::seed_from_u64(7);
        let dist = UniformInterArrival {
            min_secs: 1,
            max_secs: 5,
        };
        let seeds = generate_synthetic_resources(&map, &mut rng, 10, 0, &dist, 60);
        for pair in seeds.windows(2) {
            assert!(pair[1].available_time > pair[0].available_time);
        }
    }

    #[test]
    fn exponential_distribution_never_returns_negative_gap() {
        let dist = ExponentialInterArrival { mean_secs: 10.0 };
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let _ = dist.next_gap(&mut rng);
        }
    }
}
