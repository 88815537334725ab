//! # Murmuration
//!
//! Emergent boid flocking simulations with a small, host-agnostic API.
//!
//! A [`Flock`] owns a fixed population of [`Boid`]s and steps them once per
//! frame: a neighbor-aggregation pass collects what each boid's flockmates
//! are doing, then each boid composes alignment, cohesion, separation, and
//! boundary-avoidance steering forces and integrates under hard speed
//! bounds. The host owns the frame timer and the renderer; the engine owns
//! everything in between.
//!
//! ## Quick Start
//!
//! ```no_run
//! use murmuration::{Bounds, Flock};
//!
//! let bounds = Bounds::from_size(1920.0, 1080.0);
//! let mut flock = Flock::new(bounds)?.with_seed(7);
//! flock.populate(100)?;
//!
//! // Each frame:
//! flock.step_frame(bounds, 1.0 / 30.0)?;
//! for boid in flock.snapshot() {
//!     // draw boid.position / boid.velocity / boid.radius
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Core Concepts
//!
//! ### Boids
//!
//! Each boid carries kinematic state (position, velocity, radius) and a
//! [`Behavior`] of per-boid steering weights and radii. [`Flock::remix`]
//! re-randomizes every behavior within configured ranges without touching
//! kinematics, which keeps long-running simulations visually alive.
//!
//! ### The two-phase frame
//!
//! [`Flock::step_frame`] is a strict two-phase barrier. Phase one fills
//! every boid's [`NeighborSums`] from a snapshot taken at frame start;
//! phase two integrates each boid. No boid ever reacts to another boid's
//! same-frame movement.
//!
//! ### Aggregation strategies
//!
//! The O(n²) neighbor pass sits behind the [`NeighborAggregator`] trait.
//! [`PairwiseAggregator`] is the default CPU strategy; with the `gpu`
//! feature, `GpuAggregator` runs the same pass as a compute kernel, one
//! lane per boid, and returns identical sums:
//!
//! ```ignore
//! use murmuration::{Bounds, Flock, gpu::GpuAggregator};
//!
//! let accelerator = GpuAggregator::new()?; // fatal if no adapter
//! let mut flock = Flock::new(bounds)?
//!     .with_aggregator(Box::new(accelerator));
//! ```
//!
//! ### Tuning
//!
//! Every numeric constant of the behavior model (speed bounds, the
//! hard-edge force, jitter fractions, remix sampling ranges, the density
//! divisor behind the flock scale factor) lives in [`FlockConfig`].
//!
//! ### Numeric anomalies
//!
//! The integration is deliberately tolerant: NaN appearing in a boid's
//! force accumulation or velocity is contained to that boid, replaced with
//! a fresh random velocity, and counted in [`Diagnostics`] for the host to
//! inspect. A frame never aborts over one bad agent.

mod aggregator;
mod boid;
mod config;
mod error;
mod flock;
mod math;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use aggregator::{AgentView, NeighborAggregator, NeighborSums, PairwiseAggregator, AGGREGATE_WGSL};
pub use boid::{Behavior, Boid};
pub use config::FlockConfig;
pub use error::{AcceleratorError, ConfigError, MathError};
pub use flock::{BoidState, Bounds, Diagnostics, Flock};
pub use glam::Vec2;
pub use math::VecExt;
