//! # Cobot-Guard Core
//!
//! Geometric and temporal reasoning engine for human-robot collision
//! awareness.
//!
//! The crate continuously estimates, from noisy and partial positional
//! observations of articulated bodies, whether and when a collision could
//! occur, while tracking a robot's discrete operating mode to forecast its
//! near-future behavior. It provides:
//!
//! - **Geometry kernel**: [`Point`], [`Aabb`] and minimum-distance routines
//!   between finite 3D segments in the [`geometry`] module.
//!
//! - **Bodies and samples**: [`Body`], [`Human`], [`Robot`] skeletal
//!   topologies and the uncertainty-bounded [`BodySegmentSample`] with its
//!   coarse [`SphericalApproximation`].
//!
//! - **Barrier traces**: the resumable [`MinimumDistanceBarrierTrace`], a
//!   monotone checkpointed compression of the minimum distance between a
//!   human segment and a robot segment stream, with logarithmic-time
//!   resumption after the human moves.
//!
//! - **State history and forecasting**: the per-location
//!   [`RobotStateHistory`] archive with presence-interval analytics, and
//!   the [`RobotDiscreteTrace`] longest-matching-history predictor of the
//!   robot's next operating location.
//!
//! - **Boundary records**: validated [`ingest`] shapes exchanged with the
//!   out-of-crate serialization, broker, and decision layers.
//!
//! The engine only produces distances, resumption points, and forecasts;
//! deciding control actions (stopping or slowing a robot) belongs to the
//! consumer. Every trace and history is single-writer: callers sequence
//! concurrent packet streams before they reach this crate, in
//! non-decreasing timestamp order.
//!
//! ## Feature Flags
//!
//! - `serde` (default): serialization of boundary records via serde
//!
//! ## Example
//!
//! ```rust
//! use cobot_guard_core::{
//!     BodySegmentSample, DiscreteState, MinimumDistanceBarrierTrace, Point,
//! };
//!
//! let mut human_forearm = BodySegmentSample::new(0.05);
//! human_forearm.update(
//!     &[Point::new(0.0, 1.2, 0.4)],
//!     &[Point::new(0.0, 1.0, 0.7)],
//! );
//!
//! let mut robot_tool = BodySegmentSample::new(0.1);
//! robot_tool.update(
//!     &[Point::new(2.0, 1.0, 0.0)],
//!     &[Point::new(2.0, 1.5, 0.0)],
//! );
//!
//! let mut trace = MinimumDistanceBarrierTrace::new(0, 0, &human_forearm);
//! let location = DiscreteState::from_pairs([("station", "feed")]);
//! assert!(trace.try_update_with(&location, &robot_tool));
//! assert!(trace.current_minimum_distance() > 0.0);
//! ```

#![forbid(unsafe_code)]

pub mod barrier;
pub mod body;
pub mod error;
pub mod forecast;
pub mod geometry;
pub mod history;
pub mod ingest;
pub mod state;

// Re-export commonly used types at the crate root
pub use barrier::{MinimumDistanceBarrier, MinimumDistanceBarrierTrace};
pub use body::{
    approx_sample_distance, sample_distance, Body, BodySegment, BodySegmentSample, Human,
    HumanStateInstance, Robot, SphericalApproximation,
};
pub use error::{BodyError, GuardError, GuardResult, HistoryError, IngestError, StateError};
pub use forecast::RobotDiscreteTrace;
pub use geometry::{point_segment_distance, segment_segment_distance, Aabb, Point};
pub use history::{RobotLocationPresence, RobotStateHistory, Timestamp};
pub use ingest::{BodyPresentation, BodyState, CollisionNotification};
pub use state::DiscreteState;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
///
/// ```rust
/// use cobot_guard_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::barrier::{MinimumDistanceBarrier, MinimumDistanceBarrierTrace};
    pub use crate::body::{
        Body, BodySegment, BodySegmentSample, Human, HumanStateInstance, Robot,
        SphericalApproximation,
    };
    pub use crate::error::{GuardError, GuardResult};
    pub use crate::forecast::RobotDiscreteTrace;
    pub use crate::geometry::{Aabb, Point};
    pub use crate::history::{RobotLocationPresence, RobotStateHistory, Timestamp};
    pub use crate::ingest::{BodyPresentation, BodyState, CollisionNotification};
    pub use crate::state::DiscreteState;
}
