//! Boid state and per-frame behavior.
//!
//! Each boid follows the three classic flocking rules (separation,
//! alignment, cohesion) computed from the neighbor aggregates the flock
//! filled in during the aggregation pass, plus a two-tier boundary
//! avoidance policy and bounded-speed integration.

use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

use crate::aggregator::NeighborSums;
use crate::config::FlockConfig;
use crate::flock::{Bounds, Diagnostics};
use crate::math::VecExt;

/// Per-boid behavior parameters.
///
/// Mutable and independently re-randomizable via
/// [`Boid::mix_up`] without touching kinematic state.
#[derive(Clone, Debug, PartialEq)]
pub struct Behavior {
    /// Maximum steering-force magnitude: how sharply the boid may turn per
    /// unit time.
    pub rotation_speed: f32,
    /// Weight of the pull toward the perceived flock center.
    pub cohesion_bias: f32,
    /// Weight of the push away from too-close neighbors.
    pub separation_bias: f32,
    /// Weight of the pull toward the average neighbor heading.
    pub alignment_bias: f32,
    /// Perception radius, scaled by the flock scale factor when used.
    pub view_radius: f32,
    /// Too-close radius, scaled by the flock scale factor when used.
    pub avoid_radius: f32,
    /// Strength of the soft boundary-repulsion ramp.
    pub obstacle_avoid_bias: f32,
    /// Depth of the soft repulsion zone along each bound.
    pub boundary_repulsion_distance: f32,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            rotation_speed: 30.0,
            cohesion_bias: 10.0,
            separation_bias: 15.0,
            alignment_bias: 10.0,
            view_radius: 10.0,
            avoid_radius: 5.0,
            obstacle_avoid_bias: 50.0,
            boundary_repulsion_distance: 10.0,
        }
    }
}

impl Behavior {
    /// Default behavior for a boid of the given radius. The repulsion zone
    /// depth scales with the population density like the radii do.
    fn scaled(radius: f32) -> Self {
        let mut behavior = Self::default();
        behavior.boundary_repulsion_distance *= radius;
        behavior
    }
}

/// One simulated flocking agent.
#[derive(Debug)]
pub struct Boid {
    /// Stable identity, unique within a flock. Only ever compared for
    /// equality.
    pub id: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Body radius, derived from the population density at creation.
    pub radius: f32,
    pub behavior: Behavior,
    /// Neighbor aggregates for the current frame. Filled by the flock's
    /// aggregation pass, consumed once by [`update`](Boid::update), zeroed
    /// by [`reset`](Boid::reset) before the next pass.
    pub sums: NeighborSums,
}

impl PartialEq for Boid {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Boid {
    pub fn new(id: u32, position: Vec2, velocity: Vec2, radius: f32) -> Self {
        Self {
            id,
            position,
            velocity,
            radius,
            behavior: Behavior::scaled(radius),
            sums: NeighborSums::default(),
        }
    }

    /// Bounded correction force toward a desired heading.
    ///
    /// `normalize(desired) * max_speed - velocity`, clamped to the boid's
    /// rotation speed. The single primitive behind alignment, cohesion,
    /// separation, and boundary avoidance.
    pub fn steer(&self, desired: Vec2, max_speed: f32) -> Vec2 {
        (desired.normalize_or_zero() * max_speed - self.velocity)
            .clamp_length_max(self.behavior.rotation_speed)
    }

    /// Advance this boid by `dt` seconds.
    ///
    /// Composes steering forces from the frame's neighbor aggregates,
    /// applies boundary avoidance, integrates velocity and position, and
    /// clamps speed into `[min_speed, max_speed]`. NaN produced anywhere in
    /// the chain is contained here: the corrupted velocity is replaced with
    /// a fresh random one and the event is counted in `diagnostics`.
    pub fn update(
        &mut self,
        bounds: Bounds,
        dt: f32,
        config: &FlockConfig,
        rng: &mut impl Rng,
        diagnostics: &mut Diagnostics,
    ) {
        let mut accel = Vec2::ZERO;

        if self.sums.count > 0 {
            let center = self.sums.center / self.sums.count as f32;
            let center_offset = center - self.position;

            let alignment = self.steer(self.sums.heading, config.max_speed)
                * self.behavior.alignment_bias;
            let cohesion =
                self.steer(center_offset, config.max_speed) * self.behavior.cohesion_bias;
            let separation = self.steer(self.sums.avoidance, config.max_speed)
                * self.behavior.separation_bias;

            accel += alignment + cohesion + separation;
        }

        accel += self.boundary_force(
            self.position.x,
            bounds.min.x,
            bounds.max.x,
            Vec2::X,
            Vec2::NEG_X,
            config,
        );
        accel += self.boundary_force(
            self.position.y,
            bounds.min.y,
            bounds.max.y,
            Vec2::Y,
            Vec2::NEG_Y,
            config,
        );

        if accel.is_nan() {
            diagnostics.acceleration_anomalies += 1;
        }

        self.velocity += accel * dt;

        if self.velocity.is_nan() {
            diagnostics.velocity_anomalies += 1;
        } else {
            self.velocity.x += jitter(rng, self.velocity.x, config);
            self.velocity.y += jitter(rng, self.velocity.y, config);
        }

        let speed = self.velocity.length();
        // Zero speed leaves the heading undefined; fall back to +x so the
        // clamp below can still push the boid back up to min_speed.
        let direction = match self.velocity.checked_div(speed) {
            Ok(direction) => direction,
            Err(_) => Vec2::X,
        };
        self.velocity = direction * speed.clamp(config.min_speed, config.max_speed);

        if self.velocity.is_nan() {
            diagnostics.velocity_recoveries += 1;
            self.velocity = random_velocity(rng, config);
        }

        self.position += self.velocity * dt;
    }

    /// Avoidance force for one axis. The hard tier (body touching or past
    /// the bound) wins over the soft ramp on that axis.
    fn boundary_force(
        &self,
        coord: f32,
        min: f32,
        max: f32,
        inward_min: Vec2,
        inward_max: Vec2,
        config: &FlockConfig,
    ) -> Vec2 {
        if coord - self.radius <= min {
            return self.steer(inward_min, config.max_speed) * config.hard_edge_force;
        }
        if coord + self.radius >= max {
            return self.steer(inward_max, config.max_speed) * config.hard_edge_force;
        }

        // Soft zone: ramps from zero at the outer edge of the repulsion
        // zone up to the full obstacle_avoid_bias at the bound itself.
        let repulsion = self.behavior.boundary_repulsion_distance;
        if coord - self.radius <= min + repulsion {
            let ramp = 1.0 - (coord - min) / repulsion;
            if ramp > 0.0 {
                return self.steer(inward_min, config.max_speed)
                    * (self.behavior.obstacle_avoid_bias * ramp);
            }
        } else if coord + self.radius >= max - repulsion {
            let ramp = 1.0 - (max - coord) / repulsion;
            if ramp > 0.0 {
                return self.steer(inward_max, config.max_speed)
                    * (self.behavior.obstacle_avoid_bias * ramp);
            }
        }

        Vec2::ZERO
    }

    /// Zero the per-frame neighbor aggregates. Called by the flock exactly
    /// once per boid per frame, before the aggregation pass.
    pub fn reset(&mut self) {
        self.sums = NeighborSums::default();
    }

    /// Resample every behavior parameter within the configured ranges.
    ///
    /// Kinematic state and identity are untouched, so this can run at any
    /// point between frames to keep the emergent motion varied.
    pub fn mix_up(&mut self, config: &FlockConfig, rng: &mut impl Rng) {
        let behavior = &mut self.behavior;
        behavior.cohesion_bias = rng.gen_range(config.bias_range.clone());
        behavior.separation_bias = rng.gen_range(config.bias_range.clone());
        behavior.alignment_bias = rng.gen_range(config.bias_range.clone());
        behavior.rotation_speed = rng.gen_range(config.bias_range.clone());
        behavior.view_radius = rng.gen_range(config.radius_range.clone());
        behavior.avoid_radius = rng.gen_range(config.radius_range.clone());
        behavior.obstacle_avoid_bias = rng.gen_range(config.obstacle_avoid_range.clone());
        behavior.boundary_repulsion_distance =
            rng.gen_range(config.repulsion_scale_range.clone()) * self.radius;
    }
}

/// Asymmetric multiplicative jitter for one velocity component: up to
/// `spread` of the magnitude added, `shift` of the magnitude removed.
fn jitter(rng: &mut impl Rng, component: f32, config: &FlockConfig) -> f32 {
    let magnitude = component.abs();
    rng.gen_range(0.0..=magnitude * config.jitter_spread) - magnitude * config.jitter_shift
}

/// Fresh velocity within the speed bounds, for recovering a boid whose
/// velocity was lost to NaN.
fn random_velocity(rng: &mut impl Rng, config: &FlockConfig) -> Vec2 {
    let angle = rng.gen_range(0.0..TAU);
    let speed = rng.gen_range(config.min_speed..=config.max_speed);
    Vec2::from_angle(angle) * speed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn test_bounds() -> Bounds {
        Bounds::new(Vec2::ZERO, Vec2::new(1000.0, 1000.0))
    }

    fn centered_boid() -> Boid {
        Boid::new(0, Vec2::new(500.0, 500.0), Vec2::new(40.0, 0.0), 2.0)
    }

    #[test]
    fn steer_is_clamped_to_rotation_speed() {
        let boid = centered_boid();
        let config = FlockConfig::default();

        for desired in [
            Vec2::new(1.0, 0.0),
            Vec2::new(-300.0, 150.0),
            Vec2::new(0.0, -0.001),
        ] {
            let force = boid.steer(desired, config.max_speed);
            assert!(force.length() <= boid.behavior.rotation_speed + 1e-4);
        }
    }

    #[test]
    fn steer_of_zero_desired_counters_velocity() {
        let boid = centered_boid();
        let config = FlockConfig::default();

        // normalize(0) is the zero vector, so the force is -velocity,
        // clamped.
        let force = boid.steer(Vec2::ZERO, config.max_speed);
        let expected = (-boid.velocity).clamp_length_max(boid.behavior.rotation_speed);
        assert!((force - expected).length() < 1e-5);
    }

    #[test]
    fn body_touching_bound_gets_the_hard_force() {
        let config = FlockConfig::default();
        let bounds = test_bounds();
        let mut boid = centered_boid();
        boid.position.x = bounds.min.x + boid.radius; // exact touch

        let force = boid.boundary_force(
            boid.position.x,
            bounds.min.x,
            bounds.max.x,
            Vec2::X,
            Vec2::NEG_X,
            &config,
        );
        let expected = boid.steer(Vec2::X, config.max_speed) * config.hard_edge_force;
        assert_eq!(force, expected);
    }

    #[test]
    fn soft_zone_midpoint_ramps_to_half_bias() {
        let config = FlockConfig::default();
        let bounds = test_bounds();
        let mut boid = centered_boid();
        boid.velocity = Vec2::ZERO;
        boid.behavior.boundary_repulsion_distance = 100.0;
        boid.position.x = bounds.min.x + 50.0; // halfway into the zone

        let force = boid.boundary_force(
            boid.position.x,
            bounds.min.x,
            bounds.max.x,
            Vec2::X,
            Vec2::NEG_X,
            &config,
        );

        // With zero velocity, steer(+x) has magnitude rotation_speed.
        let expected = boid.behavior.rotation_speed * boid.behavior.obstacle_avoid_bias * 0.5;
        assert!((force.length() - expected).abs() < 1e-3);
        assert!(force.x > 0.0);
    }

    #[test]
    fn outside_the_soft_zone_no_boundary_force() {
        let config = FlockConfig::default();
        let bounds = test_bounds();
        let boid = centered_boid();

        let force = boid.boundary_force(
            boid.position.x,
            bounds.min.x,
            bounds.max.x,
            Vec2::X,
            Vec2::NEG_X,
            &config,
        );
        assert_eq!(force, Vec2::ZERO);
    }

    #[test]
    fn update_keeps_speed_within_bounds() {
        let config = FlockConfig::default();
        let mut rng = SmallRng::seed_from_u64(7);
        let mut diagnostics = Diagnostics::default();

        let mut boid = centered_boid();
        boid.sums = NeighborSums {
            heading: Vec2::new(120.0, -40.0),
            center: Vec2::new(1400.0, 900.0),
            avoidance: Vec2::new(-800.0, 300.0),
            count: 3,
        };

        for _ in 0..200 {
            boid.update(test_bounds(), 1.0 / 30.0, &config, &mut rng, &mut diagnostics);
            let speed = boid.velocity.length();
            assert!(speed >= config.min_speed - 1e-3);
            assert!(speed <= config.max_speed + 1e-3);
        }
        assert_eq!(diagnostics.velocity_recoveries, 0);
    }

    #[test]
    fn zero_velocity_falls_back_to_a_fixed_heading() {
        let config = FlockConfig::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut diagnostics = Diagnostics::default();

        let mut boid = centered_boid();
        boid.velocity = Vec2::ZERO;

        boid.update(test_bounds(), 0.0, &config, &mut rng, &mut diagnostics);

        // No neighbors, no boundary contact, zero jitter on zero velocity:
        // the deterministic fallback heading is +x at min_speed.
        assert_eq!(boid.velocity, Vec2::new(config.min_speed, 0.0));
        assert_eq!(diagnostics.velocity_recoveries, 0);
    }

    #[test]
    fn nan_velocity_is_contained_and_recovered() {
        let config = FlockConfig::default();
        let mut rng = SmallRng::seed_from_u64(99);
        let mut diagnostics = Diagnostics::default();

        let mut boid = centered_boid();
        // A corrupted velocity poisons every steering force through the
        // `desired - velocity` term.
        boid.velocity = Vec2::new(f32::NAN, 0.0);
        boid.sums = NeighborSums {
            heading: Vec2::new(50.0, 10.0),
            center: Vec2::new(600.0, 500.0),
            avoidance: Vec2::new(0.2, -0.1),
            count: 1,
        };

        boid.update(test_bounds(), 1.0 / 30.0, &config, &mut rng, &mut diagnostics);

        assert!(!boid.velocity.is_nan());
        assert!(!boid.position.is_nan());
        let speed = boid.velocity.length();
        assert!(speed >= config.min_speed - 1e-3 && speed <= config.max_speed + 1e-3);

        assert_eq!(diagnostics.acceleration_anomalies, 1);
        assert_eq!(diagnostics.velocity_anomalies, 1);
        assert_eq!(diagnostics.velocity_recoveries, 1);
    }

    #[test]
    fn mix_up_stays_in_range_and_preserves_kinematics() {
        let config = FlockConfig::default();
        let mut rng = SmallRng::seed_from_u64(5);

        let mut boid = centered_boid();
        let (id, position, velocity) = (boid.id, boid.position, boid.velocity);

        for _ in 0..50 {
            boid.mix_up(&config, &mut rng);
            let b = &boid.behavior;

            assert!(config.bias_range.contains(&b.cohesion_bias));
            assert!(config.bias_range.contains(&b.separation_bias));
            assert!(config.bias_range.contains(&b.alignment_bias));
            assert!(config.bias_range.contains(&b.rotation_speed));
            assert!(config.radius_range.contains(&b.view_radius));
            assert!(config.radius_range.contains(&b.avoid_radius));
            assert!(config.obstacle_avoid_range.contains(&b.obstacle_avoid_bias));

            let repulsion_scale = b.boundary_repulsion_distance / boid.radius;
            assert!(config.repulsion_scale_range.contains(&repulsion_scale));
        }

        assert_eq!(boid.id, id);
        assert_eq!(boid.position, position);
        assert_eq!(boid.velocity, velocity);
    }

    #[test]
    fn reset_zeroes_the_aggregates() {
        let mut boid = centered_boid();
        boid.sums = NeighborSums {
            heading: Vec2::ONE,
            center: Vec2::ONE,
            avoidance: Vec2::ONE,
            count: 4,
        };

        boid.reset();
        assert_eq!(boid.sums, NeighborSums::default());
    }

    #[test]
    fn boids_compare_by_identity() {
        let a = Boid::new(3, Vec2::ZERO, Vec2::X, 1.0);
        let mut b = Boid::new(3, Vec2::ONE, Vec2::Y, 2.0);
        assert_eq!(a, b);

        b.id = 4;
        assert_ne!(a, b);
    }
}
