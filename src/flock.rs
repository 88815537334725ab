//! Flock coordination: population lifecycle and the per-frame step.

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

use crate::aggregator::{AgentView, NeighborAggregator, PairwiseAggregator};
use crate::boid::Boid;
use crate::config::FlockConfig;
use crate::error::{AcceleratorError, ConfigError};

/// Axis-aligned simulation bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Bounds from origin to `(width, height)`.
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(Vec2::ZERO, Vec2::new(width, height))
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}

/// Cumulative counters for numeric anomalies observed during updates.
///
/// NaN never crashes a frame and never propagates past the boid it appeared
/// in; it is contained, recovered, and counted here for the host to read
/// between frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Frames stepped so far.
    pub frames: u64,
    /// Updates whose accumulated steering force contained NaN.
    pub acceleration_anomalies: u64,
    /// Updates whose integrated velocity contained NaN.
    pub velocity_anomalies: u64,
    /// Velocities discarded and replaced with a fresh random sample.
    pub velocity_recoveries: u64,
}

/// Read-only render state for one boid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoidState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
}

/// An owned population of boids plus the shared simulation state: bounds,
/// the density-derived scale factor, the randomness source, and the
/// configured aggregation strategy.
///
/// ```no_run
/// use murmuration::{Bounds, Flock};
///
/// let mut flock = Flock::new(Bounds::from_size(1920.0, 1080.0))?
///     .with_seed(42);
/// flock.populate(100)?;
///
/// // Host frame loop:
/// for _frame in 0..3 {
///     flock.step_frame(Bounds::from_size(1920.0, 1080.0), 1.0 / 30.0)?;
///     for _boid in flock.snapshot() {
///         // hand position/velocity/radius to the renderer
///     }
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Flock {
    boids: Vec<Boid>,
    bounds: Bounds,
    scale_factor: f32,
    config: FlockConfig,
    rng: SmallRng,
    aggregator: Box<dyn NeighborAggregator>,
    diagnostics: Diagnostics,
}

impl Flock {
    /// Create an empty flock for the given bounds.
    ///
    /// Fails with [`ConfigError::DegenerateBounds`] if the bounds enclose
    /// no area. The population-density scale factor is derived from these
    /// creation bounds and stays fixed for the flock's lifetime, even if
    /// later frames are stepped with resized bounds.
    pub fn new(bounds: Bounds) -> Result<Self, ConfigError> {
        let area = bounds.area();
        if !area.is_finite() || area <= 0.0 {
            return Err(ConfigError::DegenerateBounds);
        }

        let config = FlockConfig::default();
        Ok(Self {
            boids: Vec::new(),
            bounds,
            scale_factor: scale_factor(bounds, &config),
            config,
            rng: SmallRng::from_entropy(),
            aggregator: Box::new(PairwiseAggregator),
            diagnostics: Diagnostics::default(),
        })
    }

    /// Replace the tuning constants. Re-derives the scale factor, so call
    /// this before [`populate`](Flock::populate).
    pub fn with_config(mut self, config: FlockConfig) -> Self {
        self.scale_factor = scale_factor(self.bounds, &config);
        self.config = config;
        self
    }

    /// Seed the randomness source for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    /// Replace the neighbor-aggregation strategy.
    pub fn with_aggregator(mut self, aggregator: Box<dyn NeighborAggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Fill the flock with `count` boids at uniformly random positions
    /// inside the bounds, with random velocities and sequential ids.
    ///
    /// Fails with [`ConfigError::EmptyPopulation`] for a zero count. Any
    /// previous population is replaced.
    pub fn populate(&mut self, count: usize) -> Result<(), ConfigError> {
        if count < 1 {
            return Err(ConfigError::EmptyPopulation);
        }

        let half_speed = self.config.max_speed / 2.0;
        self.boids.clear();
        self.boids.reserve(count);
        for id in 0..count {
            let position = Vec2::new(
                self.rng.gen_range(self.bounds.min.x..self.bounds.max.x),
                self.rng.gen_range(self.bounds.min.y..self.bounds.max.y),
            );
            let velocity = Vec2::new(
                self.rng.gen_range(-half_speed..half_speed),
                self.rng.gen_range(-half_speed..half_speed),
            );
            self.boids
                .push(Boid::new(id as u32, position, velocity, self.scale_factor));
        }
        Ok(())
    }

    /// Advance the whole population by one frame.
    ///
    /// Two phases with a hard barrier between them: the aggregation pass
    /// runs to completion over a snapshot taken at frame start, then every
    /// boid integrates in order. No boid ever observes another boid's
    /// same-frame update.
    ///
    /// `delta_time` is clamped into `[0, max_delta_time]`, so a negative
    /// or absurdly large host delta becomes a bounded step. If the
    /// aggregator fails the error is returned and no boid has moved.
    pub fn step_frame(&mut self, bounds: Bounds, delta_time: f32) -> Result<(), AcceleratorError> {
        let dt = delta_time.clamp(0.0, self.config.max_delta_time);
        self.bounds = bounds;

        for boid in &mut self.boids {
            boid.reset();
        }

        let snapshot: Vec<AgentView> = self
            .boids
            .iter()
            .map(|boid| AgentView {
                position: boid.position,
                velocity: boid.velocity,
                view_radius: boid.behavior.view_radius,
                avoid_radius: boid.behavior.avoid_radius,
            })
            .collect();

        let sums = self.aggregator.aggregate(&snapshot, self.scale_factor)?;
        debug_assert_eq!(sums.len(), self.boids.len());
        for (boid, sums) in self.boids.iter_mut().zip(sums) {
            boid.sums = sums;
        }

        for boid in &mut self.boids {
            boid.update(bounds, dt, &self.config, &mut self.rng, &mut self.diagnostics);
        }

        self.diagnostics.frames += 1;
        Ok(())
    }

    /// Re-randomize every boid's behavior parameters.
    ///
    /// Kinematic state is untouched; safe to call between any two frames.
    /// Hosts typically invoke this every few hundred frames to keep the
    /// emergent motion from settling.
    pub fn remix(&mut self) {
        for boid in &mut self.boids {
            boid.mix_up(&self.config, &mut self.rng);
        }
    }

    /// Render state for every boid, in stable flock order.
    pub fn snapshot(&self) -> Vec<BoidState> {
        self.boids
            .iter()
            .map(|boid| BoidState {
                position: boid.position,
                velocity: boid.velocity,
                radius: boid.radius,
            })
            .collect()
    }

    /// The boid population, in stable order.
    pub fn boids(&self) -> &[Boid] {
        &self.boids
    }

    /// Mutable access to the population, for hosts that steer individual
    /// boids (demo modes, tests).
    pub fn boids_mut(&mut self) -> &mut [Boid] {
        &mut self.boids
    }

    /// Density-derived multiplier applied to every boid's radii.
    #[inline]
    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    #[inline]
    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    /// Anomaly counters accumulated since creation.
    #[inline]
    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }
}

/// `sqrt((area / density_divisor) / pi)`: the radius each boid would have
/// if `density_divisor` of them tiled the bounds as circles.
fn scale_factor(bounds: Bounds, config: &FlockConfig) -> f32 {
    ((bounds.area() / config.density_divisor) / PI).sqrt()
}
