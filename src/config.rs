//! Tuning constants for the behavior model.

use std::ops::Range;

/// Flock-wide tuning constants.
///
/// Every boid in a population shares one `FlockConfig`. Per-boid variation
/// lives in [`Behavior`](crate::Behavior); the ranges here bound how far
/// [`remix`](crate::Flock::remix) may push those per-boid parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct FlockConfig {
    /// Lower speed bound enforced after every update.
    pub min_speed: f32,
    /// Upper speed bound enforced after every update.
    pub max_speed: f32,
    /// Steering magnitude applied when a boid's body touches or crosses a
    /// bound. Large enough to dominate the flocking forces on that axis.
    pub hard_edge_force: f32,
    /// Divisor in the density-derived scale factor:
    /// `scale = sqrt((area / density_divisor) / pi)`.
    pub density_divisor: f32,
    /// Upper clamp for the per-frame time step, in seconds. A host that
    /// stalls (or hands in a negative delta) gets a bounded step instead of
    /// a teleporting flock.
    pub max_delta_time: f32,
    /// Upper bound of the per-axis velocity jitter, as a fraction of the
    /// component magnitude.
    pub jitter_spread: f32,
    /// Downward shift of the jitter, as a fraction of the component
    /// magnitude. With `spread` at 0.2 and `shift` at 0.1 the jitter is
    /// centered on zero and bounded by ±10% of the component.
    pub jitter_shift: f32,
    /// Sampling range for the steering biases (cohesion, separation,
    /// alignment) and the rotation speed.
    pub bias_range: Range<f32>,
    /// Sampling range for the view and avoid radii (pre-scale).
    pub radius_range: Range<f32>,
    /// Sampling range for the soft boundary-repulsion strength.
    pub obstacle_avoid_range: Range<f32>,
    /// Sampling range for the boundary-repulsion distance, as a multiple of
    /// the boid radius.
    pub repulsion_scale_range: Range<f32>,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            min_speed: 40.0,
            max_speed: 80.0,
            hard_edge_force: 150.0,
            density_divisor: 8192.0,
            max_delta_time: 0.25,
            jitter_spread: 0.2,
            jitter_shift: 0.1,
            bias_range: 5.0..20.0,
            radius_range: 5.0..10.0,
            obstacle_avoid_range: 25.0..100.0,
            repulsion_scale_range: 5.0..20.0,
        }
    }
}
