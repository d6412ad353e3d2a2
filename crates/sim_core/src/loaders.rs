//! Minimal stand-ins for the production map/trace/polygon loaders this
//! crate's external interfaces describe. These are not full OSM/KML
//! parsers — they exist so a scenario can be assembled from flat files
//! without pulling in a real geospatial stack.

use crate::map::{CityMap, CityMapBuilder, IntersectionId, LocationOnRoad};

/// A convex-polygon point-in-polygon filter, standing in for real KML
/// parsing. Vertices are expected in order (clockwise or counter-
/// clockwise, consistently) forming a convex region.
#[derive(Debug, Clone, Default)]
pub struct BoundingPolygon {
    vertices: Vec<(f64, f64)>,
}

impl BoundingPolygon {
    pub fn new(vertices: Vec<(f64, f64)>) -> Self {
        Self { vertices }
    }

    /// Loads a polygon from a flat file of `lat,lon` lines, one vertex per
    /// line.
    pub fn from_flat_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let mut vertices = Vec::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.splitn(2, ',');
            let lat: f64 = parts
                .next()
                .ok_or("missing latitude")?
                .trim()
                .parse()?;
            let lon: f64 = parts
                .next()
                .ok_or("missing longitude")?
                .trim()
                .parse()?;
            vertices.push((lat, lon));
        }
        Ok(Self { vertices })
    }

    /// Standard ray-casting point-in-polygon test.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }
        let mut inside = false;
        let n = self.vertices.len();
        let mut j = n - 1;
        for i in 0..n {
            let (lat_i, lon_i) = self.vertices[i];
            let (lat_j, lon_j) = self.vertices[j];
            if (lon_i > lon) != (lon_j > lon)
                && lat < (lat_j - lat_i) * (lon - lon_i) / (lon_j - lon_i) + lat_i
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Nearest intersection to a raw coordinate, by great-circle distance.
/// Linear scan: map sizes in this crate's scope are small enough that a
/// spatial index isn't warranted.
pub fn nearest_intersection(map: &CityMap, lat: f64, lon: f64) -> Option<IntersectionId> {
    map.intersections()
        .iter()
        .min_by(|a, b| {
            let da = crate::map::great_circle_distance(lat, lon, a.lat, a.lon);
            let db = crate::map::great_circle_distance(lat, lon, b.lat, b.lon);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|i| i.id)
}

/// Snaps a raw coordinate onto the network at the start of the first road
/// leaving the nearest intersection, falling back to the first outgoing
/// road of any intersection if the nearest one is a dead end.
pub fn map_match(map: &CityMap, lat: f64, lon: f64) -> Option<LocationOnRoad> {
    let nearest = nearest_intersection(map, lat, lon)?;
    let road = map.outgoing_roads(nearest).first().copied()?;
    Some(LocationOnRoad {
        road,
        travel_time_from_start: 0,
    })
}

#[cfg(feature = "map-json")]
pub mod map_json {
    //! `JsonMapSource`: the minimal map loader behind the `map-json`
    //! feature, reading `{"intersections": [...], "roads": [...], "hubs": [...]}`.
    //! Stands in for the out-of-scope production OSM/PBF `MapCreator`
    //! collaborator, which yields both the immutable map and the hub list.

    use serde::Deserialize;

    use super::{map_match, BoundingPolygon};
    use crate::map::{CityMap, CityMapBuilder, LocationOnRoad};

    #[derive(Debug, Deserialize)]
    struct JsonIntersection {
        lat: f64,
        lon: f64,
    }

    #[derive(Debug, Deserialize)]
    struct JsonRoad {
        from: u32,
        to: u32,
        travel_time: u64,
    }

    #[derive(Debug, Deserialize)]
    struct JsonHub {
        lat: f64,
        lon: f64,
    }

    #[derive(Debug, Deserialize)]
    struct JsonCityMap {
        intersections: Vec<JsonIntersection>,
        roads: Vec<JsonRoad>,
        #[serde(default)]
        hubs: Vec<JsonHub>,
    }

    /// The result of loading a map file: the network itself plus the hub
    /// locations a dropoff may be redirected to, exactly what the
    /// out-of-scope *MapCreator* collaborator is documented to yield.
    pub struct LoadedMap {
        pub map: CityMap,
        pub hubs: Vec<LocationOnRoad>,
    }

    /// Loads a [`CityMap`] (and its hub list) from the minimal JSON schema
    /// this crate defines as a stand-in for a production OSM/PBF loader.
    pub struct JsonMapSource;

    impl JsonMapSource {
        pub fn load(json: &str) -> Result<LoadedMap, Box<dyn std::error::Error>> {
            Self::load_with_options(json, 1.0, None)
        }

        pub fn load_file(path: &std::path::Path) -> Result<LoadedMap, Box<dyn std::error::Error>> {
            let contents = std::fs::read_to_string(path)?;
            Self::load(&contents)
        }

        /// Like [`Self::load`], but scales every road's travel time by
        /// `1.0 / speed_reduction` and, if `polygon` is given, drops any
        /// intersection outside it (and every road touching a dropped
        /// intersection) before the travel-time oracle is built — the
        /// stand-in for a KML bounding-polygon clip.
        pub fn load_with_options(
            json: &str,
            speed_reduction: f64,
            polygon: Option<&BoundingPolygon>,
        ) -> Result<LoadedMap, Box<dyn std::error::Error>> {
            let parsed: JsonCityMap = serde_json::from_str(json)?;

            let kept: Vec<bool> = parsed
                .intersections
                .iter()
                .map(|i| polygon.map(|p| p.contains(i.lat, i.lon)).unwrap_or(true))
                .collect();

            let mut builder = CityMapBuilder::new();
            let mut ids = Vec::with_capacity(parsed.intersections.len());
            for (intersection, keep) in parsed.intersections.iter().zip(&kept) {
                if *keep {
                    ids.push(Some(builder.add_intersection(intersection.lat, intersection.lon)));
                } else {
                    ids.push(None);
                }
            }
            for road in &parsed.roads {
                let from = *ids
                    .get(road.from as usize)
                    .ok_or("road references unknown 'from' intersection")?;
                let to = *ids
                    .get(road.to as usize)
                    .ok_or("road references unknown 'to' intersection")?;
                let (Some(from), Some(to)) = (from, to) else {
                    continue;
                };
                builder.add_road(from, to, road.travel_time);
            }

            let map = builder.build_with_speed_reduction(speed_reduction);
            let hubs: Vec<LocationOnRoad> = parsed
                .hubs
                .iter()
                .filter_map(|h| map_match(&map, h.lat, h.lon))
                .collect();

            Ok(LoadedMap { map, hubs })
        }

        pub fn load_file_with_options(
            path: &std::path::Path,
            speed_reduction: f64,
            polygon: Option<&BoundingPolygon>,
        ) -> Result<LoadedMap, Box<dyn std::error::Error>> {
            let contents = std::fs::read_to_string(path)?;
            Self::load_with_options(&contents, speed_reduction, polygon)
        }
    }

}

#[cfg(feature = "trace-csv")]
pub mod trace_csv {
    //! `CsvTraceSource`: the minimal resource-trace loader behind the
    //! `trace-csv` feature.

    use super::map_match;
    use crate::map::CityMap;
    use crate::scenario::ResourceSeed;

    #[derive(Debug, serde::Deserialize)]
    struct TraceRow {
        available_time: u64,
        pickup_lat: f64,
        pickup_lon: f64,
        dropoff_lat: f64,
        dropoff_lon: f64,
        trip_time: u64,
    }

    /// Loads `available_time,pickup_lat,pickup_lon,dropoff_lat,dropoff_lon,trip_time`
    /// rows and map-matches each lat/lon onto the nearest intersection.
    pub struct CsvTraceSource;

    impl CsvTraceSource {
        pub fn load(csv_text: &str, map: &CityMap) -> Result<Vec<ResourceSeed>, Box<dyn std::error::Error>> {
            let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
            let mut seeds = Vec::new();
            for result in reader.deserialize() {
                let row: TraceRow = result?;
                let pickup = map_match(map, row.pickup_lat, row.pickup_lon)
                    .ok_or("pickup coordinate could not be map-matched")?;
                let dropoff = map_match(map, row.dropoff_lat, row.dropoff_lon)
                    .ok_or("dropoff coordinate could not be map-matched")?;
                seeds.push(ResourceSeed {
                    pickup,
                    dropoff,
                    available_time: row.available_time,
                    trip_time: row.trip_time,
                });
            }
            Ok(seeds)
        }

        pub fn load_file(
            path: &std::path::Path,
            map: &CityMap,
        ) -> Result<Vec<ResourceSeed>, Box<dyn std::error::Error>> {
            let contents = std::fs::read_to_string(path)?;
            Self::load(&contents, map)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::map::CityMapBuilder;

        fn tiny_map() -> CityMap {
            let mut b = CityMapBuilder::new();
            let a = b.add_intersection(0.0, 0.0);
            let c = b.add_intersection(0.0, 0.01);
            b.add_road(a, c, 30);
            b.add_road(c, a, 30);
            b.build()
        }

        #[test]
        fn loads_and_map_matches_rows() {
            let map = tiny_map();
            let csv = "available_time,pickup_lat,pickup_lon,dropoff_lat,dropoff_lon,trip_time\n\
                       10,0.0,0.0,0.0,0.01,40\n";
            let seeds = CsvTraceSource::load(csv, &map).unwrap();
            assert_eq!(seeds.len(), 1);
            assert_eq!(seeds[0].available_time, 10);
        }
    }
}
