//! # Ride-Hailing Dispatch Kernel
//!
//! A discrete-event simulation engine for a crowdsourced-vehicle dispatch
//! problem over a real road network.
//!
//! ## Overview
//!
//! This crate provides the event-driven dispatch kernel, including:
//!
//! - **Event Scheduling**: a stable, cancellable discrete event queue
//! - **Road Network**: intersections, directed roads, and a travel-time oracle
//! - **ECS Framework**: Entity Component System for agent/resource state
//! - **Pool Batching & Stable Matching**: windowed resource batching matched
//!   against empty agents via deferred-acceptance stable matching
//! - **Dispatch Scheduling**: pickup/dropoff/hub transitions on the agent side
//! - **Telemetry**: an aggregate statistics report
//!
//! ## Key Concepts
//!
//! - **Discrete Events**: all simulation progress happens through scheduled events
//! - **Deterministic**: seeded RNG and stable tie-breaking ensure reproducible results
//! - **Pluggable Search Policy**: agents searching while empty delegate to a
//!   one-method collaborator, with a seeded-random default implementation
//!
//! ## Example
//!
//! ```rust,no_run
//! use bevy_ecs::prelude::World;
//! use sim_core::map::CityMapBuilder;
//! use sim_core::scenario::{build_scenario, ScenarioParams, ResourceSeed};
//! use sim_core::runner::{initialize_simulation, run_until_empty};
//!
//! let mut builder = CityMapBuilder::new();
//! let a = builder.add_intersection(37.77, -122.41);
//! let b = builder.add_intersection(37.78, -122.40);
//! builder.add_road(a, b, 120);
//! builder.add_road(b, a, 120);
//! let map = builder.build();
//!
//! let mut world = World::new();
//! build_scenario(
//!     &mut world,
//!     map,
//!     vec![],
//!     vec![],
//!     ScenarioParams::default().with_seed(42),
//! )
//! .expect("scenario setup");
//! initialize_simulation(&mut world);
//! let steps = run_until_empty(&mut world, 1_000_000);
//! let _ = steps;
//! ```

pub mod clock;
pub mod map;
pub mod ecs;
pub mod errors;
pub mod pool;
pub mod matching;
pub mod search_policy;
pub mod systems;
pub mod dispatch;
pub mod spawner;
pub mod scenario;
pub mod runner;
pub mod telemetry;
pub mod loaders;
pub mod test_helpers;
