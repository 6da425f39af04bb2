//! Validated boundary records exchanged with the (out-of-core) ingestion
//! and decision layers.
//!
//! The wire formats and broker backends live outside this crate; what
//! arrives here is already decoded. [`BodyPresentation`] builds a
//! [`Human`]/[`Robot`] once per body, [`BodyState`] carries one observation
//! of a body's full point set, and [`CollisionNotification`] is the shape
//! the decision layer publishes from this crate's outputs.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::body::{Body, Human, HumanStateInstance, Robot};
use crate::error::{GuardResult, IngestError};
use crate::geometry::Point;
use crate::history::{RobotStateHistory, Timestamp};
use crate::state::DiscreteState;

/// Static description of one articulated body.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyPresentation {
    /// Stable identifier of the body across the system.
    pub body_id: String,
    /// Whether the body is a human (no sampling frequency) or a robot.
    pub is_human: bool,
    /// Sampling frequency of the body's state stream; robots only.
    pub packet_frequency_hz: Option<f64>,
    /// Per-segment `(head_point_id, tail_point_id)` pairs.
    pub segments: Vec<(String, String)>,
    /// Per-segment envelope half-widths, aligned with `segments`.
    pub thicknesses: Vec<f64>,
}

impl BodyPresentation {
    fn into_body(self) -> Result<Body, IngestError> {
        Ok(Body::new(self.body_id, &self.segments, &self.thicknesses)?)
    }

    /// Builds the human this presentation describes.
    pub fn into_human(self) -> Result<Human, IngestError> {
        if !self.is_human {
            return Err(IngestError::NotAHuman {
                body_id: self.body_id,
            });
        }
        Ok(Human::new(self.into_body()?))
    }

    /// Builds the robot this presentation describes.
    pub fn into_robot(self) -> Result<Robot, IngestError> {
        if self.is_human {
            return Err(IngestError::NotARobot {
                body_id: self.body_id,
            });
        }
        let frequency = self
            .packet_frequency_hz
            .ok_or_else(|| IngestError::MissingFrequency {
                body_id: self.body_id.clone(),
            })?;
        let body = self.into_body()?;
        Ok(Robot::new(body, frequency)?)
    }
}

/// One observation of a body's full point set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyState {
    /// Identifier matching a previously presented body.
    pub body_id: String,
    /// Discrete location of the observation; robots only.
    pub discrete_location: Option<BTreeMap<String, String>>,
    /// Per-point simultaneous observations, indexed by the body's point
    /// table; inner lists hold one point per sensor source.
    pub points_per_point_id: Vec<Vec<Point>>,
    /// Observation time.
    pub timestamp: Timestamp,
}

impl BodyState {
    /// The observation's discrete location; empty when none was attached.
    #[must_use]
    pub fn location(&self) -> DiscreteState {
        self.discrete_location
            .clone()
            .map_or_else(DiscreteState::new, DiscreteState::from_pairs)
    }

    /// Builds the one-shot human snapshot this observation describes.
    pub fn human_instance(&self, human: &Human) -> GuardResult<HumanStateInstance> {
        Ok(HumanStateInstance::new(human, &self.points_per_point_id)?)
    }

    /// Feeds this observation into a robot's state history.
    pub fn apply_to(&self, history: &mut RobotStateHistory) -> GuardResult<()> {
        history.acquire(&self.location(), &self.points_per_point_id, self.timestamp)?;
        Ok(())
    }
}

/// A forecast collision between one human segment and one robot segment,
/// published by the decision layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionNotification {
    pub human_id: String,
    pub human_segment_id: usize,
    pub robot_id: String,
    pub robot_segment_id: usize,
    /// Discrete location the robot is expected to be in at collision time.
    pub discrete_location: BTreeMap<String, String>,
    /// Earliest forecast collision time.
    pub lower_collision_time_ns: u64,
    /// Latest forecast collision time.
    pub upper_collision_time_ns: u64,
    /// Forecast likelihood in `[0, 1]`.
    pub likelihood: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn robot_presentation() -> BodyPresentation {
        BodyPresentation {
            body_id: "gantry".into(),
            is_human: false,
            packet_frequency_hz: Some(30.0),
            segments: vec![("base".into(), "tool".into())],
            thicknesses: vec![0.2],
        }
    }

    #[test]
    fn test_presentation_builds_robot() {
        let robot = robot_presentation().into_robot().expect("valid robot");
        assert_eq!(robot.body().name(), "gantry");
        assert_eq!(robot.body().num_points(), 2);
        assert_eq!(robot.packet_frequency_hz(), 30.0);
    }

    #[test]
    fn test_robot_presentation_requires_frequency() {
        let mut presentation = robot_presentation();
        presentation.packet_frequency_hz = None;
        let err = presentation.into_robot().expect_err("no frequency");
        assert!(matches!(err, IngestError::MissingFrequency { .. }));
    }

    #[test]
    fn test_presentation_kind_is_checked() {
        let err = robot_presentation().into_human().expect_err("is a robot");
        assert!(matches!(err, IngestError::NotAHuman { .. }));

        let mut presentation = robot_presentation();
        presentation.is_human = true;
        let err = presentation.into_robot().expect_err("is a human");
        assert!(matches!(err, IngestError::NotARobot { .. }));
    }

    #[test]
    fn test_body_state_location_defaults_to_empty() {
        let state = BodyState {
            body_id: "gantry".into(),
            discrete_location: None,
            points_per_point_id: vec![],
            timestamp: Timestamp::from_nanos(0),
        };
        assert!(state.location().is_empty());
    }

    #[test]
    fn test_body_state_drives_history() {
        let robot = robot_presentation().into_robot().expect("valid robot");
        let mut history = RobotStateHistory::new(robot);
        let state = BodyState {
            body_id: "gantry".into(),
            discrete_location: Some(BTreeMap::from([("station".into(), "a".into())])),
            points_per_point_id: vec![
                vec![Point::new(0.0, 0.0, 0.0)],
                vec![Point::new(0.0, 1.0, 0.0)],
            ],
            timestamp: Timestamp::from_nanos(0),
        };
        state.apply_to(&mut history).expect("matching point count");
        assert_eq!(history.current_location(), &state.location());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_records_round_trip_through_json() {
        let presentation = robot_presentation();
        let json = serde_json::to_string(&presentation).expect("serializable");
        let back: BodyPresentation = serde_json::from_str(&json).expect("deserializable");
        assert_eq!(back, presentation);

        let notification = CollisionNotification {
            human_id: "operator".into(),
            human_segment_id: 1,
            robot_id: "gantry".into(),
            robot_segment_id: 0,
            discrete_location: BTreeMap::from([("station".into(), "a".into())]),
            lower_collision_time_ns: 1_000,
            upper_collision_time_ns: 2_000,
            likelihood: 0.75,
        };
        let json = serde_json::to_string(&notification).expect("serializable");
        let back: CollisionNotification = serde_json::from_str(&json).expect("deserializable");
        assert_eq!(back, notification);
    }
}
