//! Error types. Plain hand-rolled enums with manual `Display`/`Error` impls,
//! matching the rest of this crate's avoidance of error-derive crates.

use std::fmt;

/// Failures that can occur while assembling a scenario before the
/// simulation starts running.
#[derive(Debug, Clone, PartialEq)]
pub enum SetupError {
    EmptyMap,
    UnknownIntersection(u32),
    UnknownRoad(u32),
    InvalidSpeedReduction(f64),
    InvalidResourceWindow { available: u64, life_time: u64 },
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::EmptyMap => write!(f, "map has no intersections"),
            SetupError::UnknownIntersection(id) => {
                write!(f, "unknown intersection id {id}")
            }
            SetupError::UnknownRoad(id) => write!(f, "unknown road id {id}"),
            SetupError::InvalidSpeedReduction(v) => {
                write!(f, "speed_reduction must be in (0.0, 1.0], got {v}")
            }
            SetupError::InvalidResourceWindow {
                available,
                life_time,
            } => write!(
                f,
                "resource life_time {life_time} with available_time {available} yields a non-positive expiration window"
            ),
        }
    }
}

impl std::error::Error for SetupError {}

/// Raised when an event is popped from an empty queue where one was
/// expected, or the runner is asked to advance past exhaustion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueUnderflow;

impl fmt::Display for QueueUnderflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event queue is empty")
    }
}

impl std::error::Error for QueueUnderflow {}

/// An internal consistency check failed — these indicate a bug in the
/// dispatch kernel rather than bad input.
#[derive(Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    AgentNotEmpty(String),
    ResourceAlreadyResolved(String),
    MissingComponent(String),
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::AgentNotEmpty(detail) => {
                write!(f, "agent invariant violated: {detail}")
            }
            InvariantViolation::ResourceAlreadyResolved(detail) => {
                write!(f, "resource invariant violated: {detail}")
            }
            InvariantViolation::MissingComponent(detail) => {
                write!(f, "missing expected component: {detail}")
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}

/// Raised by the stable-matching stage when a non-empty pool cannot be
/// matched against any empty agent (the agent side is empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoFeasibleMatch {
    pub unmatched_resources: usize,
}

impl fmt::Display for NoFeasibleMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no empty agents available to match {} pooled resource(s)",
            self.unmatched_resources
        )
    }
}

impl std::error::Error for NoFeasibleMatch {}
