//! `pt-graph`: patrol graph, spatial indexing, and travel-time estimation.
//!
//! The patrol graph is produced once, before the mission, from a floor plan.
//! This crate only stores and queries it; construction from real floor plans
//! is the application's job.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                      |
//! |---------------|---------------------------------------------------------------|
//! | [`graph`]     | `PatrolGraph` (CSR + R-tree), `PatrolGraphBuilder`            |
//! | [`dijkstra`]  | `single_source`, `multi_source` shortest-tick searches        |
//! | [`estimator`] | `PathEstimator` trait, `DijkstraEstimator`, `DistanceTable`   |
//! | [`error`]     | `GraphError`, `GraphResult<T>`                                |
//!
//! # Cost units
//!
//! Every edge cost is a whole number of ticks (at least 1).  Estimates are
//! exact shortest-path sums, so a travel estimate is also the travel time the
//! mobility layer will charge.

pub mod dijkstra;
pub mod error;
pub mod estimator;
pub mod graph;


pub use error::{GraphError, GraphResult};
pub use estimator::{DijkstraEstimator, DistanceTable, PathEstimator};
pub use graph::{PatrolGraph, PatrolGraphBuilder};
