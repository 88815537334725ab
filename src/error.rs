//! Error types for the flocking engine.
//!
//! This module provides error types for simulation setup, vector math,
//! and the optional GPU aggregation path.

use std::fmt;

/// Errors that can occur while setting up a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The simulation bounds enclose no area.
    DegenerateBounds,
    /// A population of zero boids was requested.
    EmptyPopulation,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DegenerateBounds => {
                write!(f, "Simulation bounds must enclose a positive, finite area")
            }
            ConfigError::EmptyPopulation => {
                write!(f, "A flock needs at least one boid")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors raised by vector math helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    /// A vector was divided by a zero scalar.
    DivisionByZero,
}

impl fmt::Display for MathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathError::DivisionByZero => write!(f, "Vector division by a zero scalar"),
        }
    }
}

impl std::error::Error for MathError {}

/// Errors that can occur during GPU aggregation setup or dispatch.
///
/// These are fatal: the engine never falls back to the CPU path on its own.
/// A host that wants a fallback constructs a
/// [`PairwiseAggregator`](crate::PairwiseAggregator) explicitly after
/// observing the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceleratorError {
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create a GPU device.
    DeviceCreation(String),
    /// Failed to map a result buffer for reading.
    BufferMapping(String),
}

impl fmt::Display for AcceleratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceleratorError::NoAdapter => write!(
                f,
                "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."
            ),
            AcceleratorError::DeviceCreation(e) => {
                write!(f, "Failed to create GPU device: {}", e)
            }
            AcceleratorError::BufferMapping(e) => {
                write!(f, "Failed to map GPU buffer: {}", e)
            }
        }
    }
}

impl std::error::Error for AcceleratorError {}
