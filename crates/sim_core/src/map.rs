//! The road network: intersections, directed roads, and the all-pairs
//! travel-time oracle used for pickup/dropoff ETA computation.

use std::collections::HashMap;

/// Identifies an [`Intersection`] within a [`CityMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntersectionId(pub u32);

/// Identifies a [`Road`] within a [`CityMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoadId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub id: IntersectionId,
    pub lat: f64,
    pub lon: f64,
}

/// A directed edge between two intersections with a fixed scalar travel
/// time. Two one-way roads are used to model a bidirectional street.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Road {
    pub id: RoadId,
    pub from: IntersectionId,
    pub to: IntersectionId,
    pub travel_time: u64,
}

/// A point along a road: `travel_time_from_start` is the time required to
/// travel from the road's start intersection to this point, so it always
/// satisfies `0 <= travel_time_from_start <= road.travel_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationOnRoad {
    pub road: RoadId,
    pub travel_time_from_start: u64,
}

impl LocationOnRoad {
    pub fn start_of(road: &Road) -> Self {
        Self {
            road: road.id,
            travel_time_from_start: 0,
        }
    }
}

/// All-pairs shortest travel time between intersections, precomputed once
/// at map-build time via repeated single-source Dijkstra.
#[derive(Debug, Clone)]
pub struct TravelTimeOracle {
    table: Vec<Vec<Option<u64>>>,
}

impl TravelTimeOracle {
    fn build(intersection_count: usize, roads: &[Road]) -> Self {
        let mut adjacency: Vec<Vec<(usize, u64)>> = vec![Vec::new(); intersection_count];
        for road in roads {
            adjacency[road.from.0 as usize].push((road.to.0 as usize, road.travel_time));
        }

        let mut table = vec![vec![None; intersection_count]; intersection_count];
        for source in 0..intersection_count {
            table[source][source] = Some(0);
            let reachable = pathfinding::directed::dijkstra::dijkstra_all(&source, |node| {
                adjacency[*node].clone()
            });
            for (node, (_, cost)) in reachable {
                table[source][node] = Some(cost);
            }
        }

        Self { table }
    }

    /// Shortest travel time from intersection `a` to intersection `b`, or
    /// `None` if `b` is unreachable from `a`.
    pub fn travel_time(&self, a: IntersectionId, b: IntersectionId) -> Option<u64> {
        self.table
            .get(a.0 as usize)
            .and_then(|row| row.get(b.0 as usize))
            .copied()
            .flatten()
    }
}

/// The immutable, shared road network. Cheap to pass around by reference or
/// wrap in `Arc` since nothing in the simulation ever mutates it after build.
#[derive(Debug, Clone)]
pub struct CityMap {
    intersections: Vec<Intersection>,
    roads: Vec<Road>,
    outgoing: Vec<Vec<RoadId>>,
    oracle: TravelTimeOracle,
}

impl CityMap {
    pub fn intersection(&self, id: IntersectionId) -> &Intersection {
        &self.intersections[id.0 as usize]
    }

    pub fn road(&self, id: RoadId) -> &Road {
        &self.roads[id.0 as usize]
    }

    pub fn intersections(&self) -> &[Intersection] {
        &self.intersections
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    /// Roads leaving `intersection`, in the order they were added to the map.
    pub fn outgoing_roads(&self, intersection: IntersectionId) -> &[RoadId] {
        &self.outgoing[intersection.0 as usize]
    }

    pub fn oracle(&self) -> &TravelTimeOracle {
        &self.oracle
    }

    /// Travel time between two arbitrary points on the network. Same-road
    /// pairs take a direct along-road shortcut; everything else routes
    /// through the precomputed intersection-to-intersection oracle.
    pub fn travel_time(&self, from: LocationOnRoad, to: LocationOnRoad) -> Option<u64> {
        if from.road == to.road && to.travel_time_from_start >= from.travel_time_from_start {
            return Some(to.travel_time_from_start - from.travel_time_from_start);
        }

        let from_road = self.road(from.road);
        let to_road = self.road(to.road);
        let remaining_on_from = from_road.travel_time - from.travel_time_from_start;
        let between = self
            .oracle
            .travel_time(from_road.to, to_road.from)?;
        Some(remaining_on_from + between + to.travel_time_from_start)
    }

    /// Great-circle distance in meters between two intersections.
    pub fn distance_meters(&self, a: IntersectionId, b: IntersectionId) -> f64 {
        let ia = self.intersection(a);
        let ib = self.intersection(b);
        great_circle_distance(ia.lat, ia.lon, ib.lat, ib.lon)
    }
}

/// Haversine great-circle distance in meters.
pub fn great_circle_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_METERS * c
}

/// Builds a [`CityMap`] incrementally, then precomputes its travel-time
/// oracle once all intersections and roads are known.
#[derive(Debug, Default)]
pub struct CityMapBuilder {
    intersections: Vec<Intersection>,
    roads: Vec<Road>,
}

impl CityMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_intersection(&mut self, lat: f64, lon: f64) -> IntersectionId {
        let id = IntersectionId(self.intersections.len() as u32);
        self.intersections.push(Intersection { id, lat, lon });
        id
    }

    pub fn add_road(&mut self, from: IntersectionId, to: IntersectionId, travel_time: u64) -> RoadId {
        let id = RoadId(self.roads.len() as u32);
        self.roads.push(Road {
            id,
            from,
            to,
            travel_time,
        });
        id
    }

    pub fn build(self) -> CityMap {
        self.build_with_speed_reduction(1.0)
    }

    /// Builds the map with every road's travel time scaled by
    /// `1.0 / speed_reduction`. `speed_reduction` must be in `(0.0, 1.0]`;
    /// a value below 1.0 models reduced average speeds (e.g. congestion),
    /// stretching travel times proportionally.
    pub fn build_with_speed_reduction(self, speed_reduction: f64) -> CityMap {
        let intersection_count = self.intersections.len();
        let roads: Vec<Road> = if (speed_reduction - 1.0).abs() < f64::EPSILON {
            self.roads
        } else {
            self.roads
                .into_iter()
                .map(|mut road| {
                    road.travel_time =
                        ((road.travel_time as f64) / speed_reduction).round() as u64;
                    road
                })
                .collect()
        };

        let mut outgoing = vec![Vec::new(); intersection_count];
        for road in &roads {
            outgoing[road.from.0 as usize].push(road.id);
        }

        let oracle = TravelTimeOracle::build(intersection_count, &roads);

        CityMap {
            intersections: self.intersections,
            roads,
            outgoing,
            oracle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> CityMap {
        let mut b = CityMapBuilder::new();
        let a = b.add_intersection(0.0, 0.0);
        let c = b.add_intersection(0.0, 1.0);
        let d = b.add_intersection(1.0, 1.0);
        b.add_road(a, c, 100);
        b.add_road(c, d, 50);
        b.build()
    }

    #[test]
    fn oracle_computes_multi_hop_shortest_path() {
        let map = sample_map();
        let a = IntersectionId(0);
        let d = IntersectionId(2);
        assert_eq!(map.oracle().travel_time(a, d), Some(150));
    }

    #[test]
    fn oracle_returns_none_for_unreachable_pair() {
        let map = sample_map();
        let d = IntersectionId(2);
        let a = IntersectionId(0);
        assert_eq!(map.oracle().travel_time(d, a), None);
    }

    #[test]
    fn same_road_travel_time_is_along_road_delta() {
        let map = sample_map();
        let road = map.roads()[0].id;
        let from = LocationOnRoad {
            road,
            travel_time_from_start: 10,
        };
        let to = LocationOnRoad {
            road,
            travel_time_from_start: 40,
        };
        assert_eq!(map.travel_time(from, to), Some(30));
    }

    #[test]
    fn cross_road_travel_time_routes_through_oracle() {
        let map = sample_map();
        let first = map.roads()[0].id;
        let second = map.roads()[1].id;
        let from = LocationOnRoad {
            road: first,
            travel_time_from_start: 20,
        };
        let to = LocationOnRoad {
            road: second,
            travel_time_from_start: 10,
        };
        // remaining on first road (80) + 0 (adjacent, no further hop) + 10
        assert_eq!(map.travel_time(from, to), Some(90));
    }

    #[test]
    fn speed_reduction_stretches_travel_times() {
        let mut b = CityMapBuilder::new();
        let a = b.add_intersection(0.0, 0.0);
        let c = b.add_intersection(0.0, 1.0);
        b.add_road(a, c, 100);
        let map = b.build_with_speed_reduction(0.5);
        assert_eq!(map.roads()[0].travel_time, 200);
    }

    #[test]
    fn great_circle_distance_is_zero_for_same_point() {
        assert_eq!(great_circle_distance(10.0, 20.0, 10.0, 20.0), 0.0);
    }
}
