//! Error types for the collision-awareness core.
//!
//! Runtime conditions the caller can act on are returned as `Result`s built
//! from the enums below. Precondition violations (indexing an empty barrier
//! trace, asking an empty box for its centre, using a segment index outside
//! its body) are caller bugs and panic instead of returning an error.
//!
//! # Error Hierarchy
//!
//! - [`GuardError`]: top-level error type encompassing all subsystem errors
//! - [`StateError`]: indeterminate discrete-state comparisons
//! - [`BodyError`]: body construction and human-snapshot validation
//! - [`HistoryError`]: robot state-history ingestion and archive lookups
//! - [`IngestError`]: boundary-record validation

use thiserror::Error;

/// A specialized `Result` type for core operations.
pub type GuardResult<T> = Result<T, GuardError>;

/// Top-level error type for the collision-awareness core.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GuardError {
    /// Discrete-state comparison error
    #[error("discrete state error: {0}")]
    State(#[from] StateError),

    /// Body construction or validation error
    #[error("body error: {0}")]
    Body(#[from] BodyError),

    /// Robot state-history error
    #[error("history error: {0}")]
    History(#[from] HistoryError),

    /// Boundary-record validation error
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),
}

/// Errors from discrete-state comparisons.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The two states have differing key sets and every shared key agrees:
    /// they cannot be told apart by their shared variables, so neither
    /// "equal" nor "unequal" is a sound answer.
    #[error("states {left} and {right} are not distinguishable by their shared variables")]
    IndeterminateComparison {
        /// Rendering of the left-hand state
        left: String,
        /// Rendering of the right-hand state
        right: String,
    },
}

/// Errors from body construction and human-snapshot validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BodyError {
    /// The segment-endpoint list and the thickness list disagree in length.
    #[error("body '{body}' declares {segments} segments but {thicknesses} thicknesses")]
    SegmentCountMismatch {
        /// Body name
        body: String,
        /// Number of segment endpoint pairs
        segments: usize,
        /// Number of thickness entries
        thicknesses: usize,
    },

    /// A robot's packet frequency must be strictly positive.
    #[error("robot '{body}' has non-positive packet frequency {frequency_hz} Hz")]
    InvalidFrequency {
        /// Body name
        body: String,
        /// The rejected frequency
        frequency_hz: f64,
    },

    /// An observation carries a different number of point lists than the
    /// body has distinct point identifiers.
    #[error("observation carries {actual} point lists, body references {expected} points")]
    PointCountMismatch {
        /// Distinct point identifiers in the body
        expected: usize,
        /// Point lists supplied by the observation
        actual: usize,
    },
}

/// Errors from robot state-history ingestion and archive lookups.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    /// An acquired observation does not cover every point of the robot.
    #[error("observation carries {actual} point lists, robot references {expected} points")]
    PointCountMismatch {
        /// Distinct point identifiers in the robot's body
        expected: usize,
        /// Point lists supplied by the observation
        actual: usize,
    },

    /// A barrier-trace reset asked for an archived sample the history does
    /// not hold.
    #[error("no archived sample for segment {segment_id} at index {index} in location {location}")]
    MissingSample {
        /// Robot segment index
        segment_id: usize,
        /// Sample index within the location's archive
        index: usize,
        /// Rendering of the discrete location
        location: String,
    },
}

/// Errors from validating boundary records.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    /// A presentation flagged as a robot was used to build a human.
    #[error("body '{body_id}' is not presented as a human")]
    NotAHuman {
        /// Body identifier from the presentation
        body_id: String,
    },

    /// A presentation flagged as a human was used to build a robot.
    #[error("body '{body_id}' is not presented as a robot")]
    NotARobot {
        /// Body identifier from the presentation
        body_id: String,
    },

    /// A robot presentation is missing its packet frequency.
    #[error("robot presentation '{body_id}' carries no packet frequency")]
    MissingFrequency {
        /// Body identifier from the presentation
        body_id: String,
    },

    /// The presented topology is invalid.
    #[error(transparent)]
    Body(#[from] BodyError),
}
