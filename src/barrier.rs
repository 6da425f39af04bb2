//! Resumable minimum-distance barrier traces.
//!
//! A [`MinimumDistanceBarrierTrace`] watches one (human segment, robot
//! segment) pair. The human segment is frozen into a spherical approximation
//! at construction; every robot-segment sample then updates a monotone
//! decreasing sequence of [`MinimumDistanceBarrier`] checkpoints: a
//! compression of "the minimum distance ever seen up to update *i*",
//! annotated with where and for how long each floor persisted. When the
//! human moves, [`MinimumDistanceBarrierTrace::resume_element`] finds the
//! latest checkpoint that provably survives the change, so a collision check
//! can restart there instead of replaying every update.

use tracing::{debug, trace};

use crate::body::{approx_sample_distance, BodySegmentSample, SphericalApproximation};
use crate::error::{GuardResult, HistoryError};
use crate::history::RobotStateHistory;
use crate::state::DiscreteState;

/// One checkpoint in a monotone-decreasing minimum-distance sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimumDistanceBarrier {
    minimum_distance: f64,
    farthest_location: DiscreteState,
    maximum_index: u64,
}

impl MinimumDistanceBarrier {
    fn new(minimum_distance: f64, farthest_location: DiscreteState, maximum_index: u64) -> Self {
        Self {
            minimum_distance,
            farthest_location,
            maximum_index,
        }
    }

    /// The lowest distance value confirmed when this barrier was recorded.
    #[must_use]
    pub fn minimum_distance(&self) -> f64 {
        self.minimum_distance
    }

    /// The discrete location at which this floor was last known to hold.
    #[must_use]
    pub fn farthest_location(&self) -> &DiscreteState {
        &self.farthest_location
    }

    /// How many consecutive same-location updates kept this floor unbeaten.
    #[must_use]
    pub fn maximum_index(&self) -> u64 {
        self.maximum_index
    }
}

/// Incremental, resumable tracking of the minimum distance between a fixed
/// human-segment approximation and an evolving robot-segment sample stream.
///
/// Single-writer: one logical stream mutates one trace. The type is a plain
/// cloneable value so callers can take deep copies for what-if resets.
#[derive(Debug, Clone)]
pub struct MinimumDistanceBarrierTrace {
    human_segment_id: usize,
    robot_segment_id: usize,
    approximation: SphericalApproximation,
    barriers: Vec<MinimumDistanceBarrier>,
    next_index: u64,
}

impl MinimumDistanceBarrierTrace {
    /// Opens a trace for one human/robot segment pair, freezing the human
    /// segment's spherical approximation as of `human_sample`.
    ///
    /// # Panics
    ///
    /// Panics if `human_sample` has no observation yet.
    #[must_use]
    pub fn new(
        human_segment_id: usize,
        robot_segment_id: usize,
        human_sample: &BodySegmentSample,
    ) -> Self {
        Self {
            human_segment_id,
            robot_segment_id,
            approximation: human_sample.spherical_approximation(),
            barriers: Vec::new(),
            next_index: 0,
        }
    }

    #[must_use]
    pub fn human_segment_id(&self) -> usize {
        self.human_segment_id
    }

    #[must_use]
    pub fn robot_segment_id(&self) -> usize {
        self.robot_segment_id
    }

    /// The frozen human-segment approximation the trace is measured against.
    #[must_use]
    pub fn approximation(&self) -> &SphericalApproximation {
        &self.approximation
    }

    /// Number of barriers recorded.
    #[must_use]
    pub fn size(&self) -> usize {
        self.barriers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.barriers.is_empty()
    }

    /// Number of updates applied since the approximation was fixed.
    #[must_use]
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// The barrier at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range; querying a barrier that was never
    /// recorded is a caller bug.
    #[must_use]
    pub fn barrier(&self, index: usize) -> &MinimumDistanceBarrier {
        &self.barriers[index]
    }

    /// The most recent barrier, if any.
    #[must_use]
    pub fn last_barrier(&self) -> Option<&MinimumDistanceBarrier> {
        self.barriers.last()
    }

    /// Removes and returns the barrier at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn remove_barrier(&mut self, index: usize) -> MinimumDistanceBarrier {
        self.barriers.remove(index)
    }

    /// The last barrier's minimum distance, or `+inf` for an empty trace.
    #[must_use]
    pub fn current_minimum_distance(&self) -> f64 {
        self.barriers
            .last()
            .map_or(f64::INFINITY, MinimumDistanceBarrier::minimum_distance)
    }

    /// Feeds one robot-segment sample observed at `location` into the trace.
    ///
    /// Returns `false`, recording nothing, when the conservative distance
    /// bound has collapsed to contact; the caller must stop trusting and
    /// advancing this trace. Otherwise the floor is either lowered (a new
    /// barrier is appended) or confirmed (the last barrier's location and
    /// persistence counter are advanced), `next_index` is incremented, and
    /// `true` is returned.
    pub fn try_update_with(
        &mut self,
        location: &DiscreteState,
        robot_sample: &BodySegmentSample,
    ) -> bool {
        let distance = approx_sample_distance(&self.approximation, robot_sample);
        if distance <= 0.0 {
            debug!(
                human_segment = self.human_segment_id,
                robot_segment = self.robot_segment_id,
                "distance bound collapsed to contact"
            );
            return false;
        }

        if distance < self.current_minimum_distance() {
            trace!(
                human_segment = self.human_segment_id,
                robot_segment = self.robot_segment_id,
                distance,
                "new minimum-distance floor"
            );
            self.barriers
                .push(MinimumDistanceBarrier::new(distance, location.clone(), 0));
        } else {
            let last = self
                .barriers
                .last_mut()
                .expect("non-empty: an empty trace takes the append branch");
            if *location != last.farthest_location {
                last.farthest_location = location.clone();
                last.maximum_index = 0;
            } else {
                last.maximum_index += 1;
            }
        }

        self.next_index += 1;
        true
    }

    /// Finds the latest barrier whose recorded floor provably survives
    /// replacing the trace's human approximation with `other`.
    ///
    /// The deviation `distance(centres) + max(0, other.radius - radius)` is
    /// a Lipschitz bound on how far any recorded minimum distance can be
    /// off under the change; a barrier with `minimum_distance >= deviation`
    /// is still valid. Returns `None` when the trace is empty or no
    /// checkpoint survives: the ordinary "restart from scratch" outcome,
    /// not an error.
    #[must_use]
    pub fn resume_element(&self, other: &SphericalApproximation) -> Option<usize> {
        let deviation = self.approximation.centre.distance(other.centre)
            + (other.radius - self.approximation.radius).max(0.0);

        let first = self.barriers.first()?;
        if deviation > first.minimum_distance {
            return None;
        }
        let last_index = self.barriers.len() - 1;
        if deviation <= self.barriers[last_index].minimum_distance {
            return Some(last_index);
        }

        // Barriers are strictly decreasing in minimum distance; find the
        // last one still at or above the deviation.
        let mut lower = 0;
        let mut upper = last_index;
        while upper - lower > 1 {
            let mid = (lower + upper) / 2;
            if self.barriers[mid].minimum_distance >= deviation {
                lower = mid;
            } else {
                upper = mid;
            }
        }
        Some(lower)
    }

    /// Re-anchors the trace to a fresh human sample.
    ///
    /// If no checkpoint survives the new approximation, the trace empties
    /// and restarts from index zero. Otherwise all barriers except the
    /// resumption point are discarded and the surviving floor is re-derived
    /// from the archived robot sample at the resumption slot, under the new
    /// approximation, tighter than the Lipschitz bound that validated the
    /// resumption. On a lookup failure nothing is modified.
    pub fn reset(
        &mut self,
        human_sample: &BodySegmentSample,
        history: &RobotStateHistory,
    ) -> GuardResult<()> {
        let approximation = human_sample.spherical_approximation();
        match self.resume_element(&approximation) {
            None => {
                debug!(
                    human_segment = self.human_segment_id,
                    robot_segment = self.robot_segment_id,
                    "no resumable checkpoint, clearing trace"
                );
                self.barriers.clear();
                self.next_index = 0;
            }
            Some(index) => {
                // Fetch the archived sample before touching any field, so a
                // missing sample leaves the trace exactly as it was.
                let resumed = &self.barriers[index];
                let next_index = resumed.maximum_index() + 1;
                let location = resumed.farthest_location().clone();
                let sample_index = (next_index - 1) as usize;
                let sample = history
                    .sample_at(&location, self.robot_segment_id, sample_index)
                    .ok_or_else(|| HistoryError::MissingSample {
                        segment_id: self.robot_segment_id,
                        index: sample_index,
                        location: location.to_string(),
                    })?;
                let distance = approx_sample_distance(&approximation, sample);
                self.barriers = vec![MinimumDistanceBarrier::new(
                    distance,
                    location,
                    next_index - 1,
                )];
                self.next_index = next_index;
                debug!(
                    human_segment = self.human_segment_id,
                    robot_segment = self.robot_segment_id,
                    resumed_index = index,
                    "trace resumed from checkpoint"
                );
            }
        }
        self.approximation = approximation;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use approx::assert_relative_eq;

    fn human_sample() -> BodySegmentSample {
        let mut sample = BodySegmentSample::new(0.0);
        sample.update(&[Point::new(0.0, 0.0, 0.0)], &[Point::new(0.0, 0.0, 0.0)]);
        sample
    }

    /// Thin robot sample at distance `d` along the x axis.
    fn robot_sample_at(d: f64) -> BodySegmentSample {
        let mut sample = BodySegmentSample::new(0.0);
        sample.update(&[Point::new(d, 0.0, 0.0)], &[Point::new(d, 0.0, 0.0)]);
        sample
    }

    fn location(name: &str) -> DiscreteState {
        DiscreteState::from_pairs([("cell", name)])
    }

    #[test]
    fn test_barrier_trace_populate() {
        let mut trace = MinimumDistanceBarrierTrace::new(0, 0, &human_sample());
        let at = location("a");

        // Four strictly decreasing distances, then contact.
        for (i, d) in [4.0, 3.0, 2.0, 1.0].iter().enumerate() {
            assert!(trace.try_update_with(&at, &robot_sample_at(*d)));
            assert_eq!(trace.size(), i + 1);
        }
        assert_eq!(trace.next_index(), 4);
        assert_relative_eq!(trace.current_minimum_distance(), 1.0);

        assert!(!trace.try_update_with(&at, &robot_sample_at(0.0)));
        // Contact records nothing.
        assert_eq!(trace.size(), 4);
        assert_eq!(trace.next_index(), 4);
    }

    #[test]
    fn test_flat_distances_extend_last_barrier() {
        let mut trace = MinimumDistanceBarrierTrace::new(0, 0, &human_sample());
        let at = location("a");

        for _ in 0..5 {
            assert!(trace.try_update_with(&at, &robot_sample_at(2.0)));
        }
        assert_eq!(trace.size(), 1);
        assert_eq!(trace.next_index(), 5);
        assert_eq!(trace.barrier(0).maximum_index(), 4);
    }

    #[test]
    fn test_location_change_relabels_last_barrier() {
        let mut trace = MinimumDistanceBarrierTrace::new(0, 0, &human_sample());

        assert!(trace.try_update_with(&location("a"), &robot_sample_at(2.0)));
        assert!(trace.try_update_with(&location("a"), &robot_sample_at(2.5)));
        assert_eq!(trace.barrier(0).maximum_index(), 1);

        // Floor held across a location change: relabel, reset the counter.
        assert!(trace.try_update_with(&location("b"), &robot_sample_at(3.0)));
        assert_eq!(trace.size(), 1);
        assert_eq!(trace.barrier(0).farthest_location(), &location("b"));
        assert_eq!(trace.barrier(0).maximum_index(), 0);
    }

    #[test]
    fn test_empty_trace_has_infinite_minimum() {
        let trace = MinimumDistanceBarrierTrace::new(0, 0, &human_sample());
        assert!(trace.is_empty());
        assert_eq!(trace.current_minimum_distance(), f64::INFINITY);
    }

    fn populated_trace() -> MinimumDistanceBarrierTrace {
        let mut trace = MinimumDistanceBarrierTrace::new(0, 0, &human_sample());
        let at = location("a");
        for d in [4.0, 3.0, 2.0, 1.0] {
            assert!(trace.try_update_with(&at, &robot_sample_at(d)));
        }
        trace
    }

    #[test]
    fn test_resume_element_near_approximation_keeps_full_trace() {
        let trace = populated_trace();
        let near = SphericalApproximation {
            centre: Point::new(0.1, 0.0, 0.0),
            radius: 0.0,
        };
        assert_eq!(trace.resume_element(&near), Some(3));
    }

    #[test]
    fn test_resume_element_far_approximation_fails() {
        let trace = populated_trace();
        let far = SphericalApproximation {
            centre: Point::new(5.0, 0.0, 0.0),
            radius: 0.0,
        };
        assert_eq!(trace.resume_element(&far), None);
    }

    #[test]
    fn test_resume_element_binary_search_midpoint() {
        let trace = populated_trace();
        // Deviation 2.5: barriers 4.0 and 3.0 survive, 2.0 and 1.0 do not.
        let mid = SphericalApproximation {
            centre: Point::new(2.5, 0.0, 0.0),
            radius: 0.0,
        };
        assert_eq!(trace.resume_element(&mid), Some(1));
    }

    #[test]
    fn test_resume_element_on_empty_trace() {
        let trace = MinimumDistanceBarrierTrace::new(0, 0, &human_sample());
        let approx = SphericalApproximation {
            centre: Point::ZERO,
            radius: 0.0,
        };
        assert_eq!(trace.resume_element(&approx), None);
    }

    /// History of a one-segment robot retreating along x through location
    /// `a` at 10 Hz, committed by a final move to `b`.
    fn retreat_history() -> RobotStateHistory {
        let body = crate::body::Body::new(
            "gantry",
            &[("base".into(), "tool".into())],
            &[0.0],
        )
        .expect("valid topology");
        let robot = crate::body::Robot::new(body, 10.0).expect("positive frequency");
        let mut history = RobotStateHistory::new(robot);

        for (slot, d) in [4.0, 3.0, 2.0, 1.0].iter().enumerate() {
            let points = vec![vec![Point::new(*d, 0.0, 0.0)], vec![Point::new(*d, 0.0, 0.0)]];
            history
                .acquire(
                    &location("a"),
                    &points,
                    crate::history::Timestamp::from_nanos(slot as u64 * 100_000_000),
                )
                .expect("matching point count");
        }
        let points = vec![vec![Point::new(9.0, 0.0, 0.0)], vec![Point::new(9.0, 0.0, 0.0)]];
        history
            .acquire(
                &location("b"),
                &points,
                crate::history::Timestamp::from_nanos(400_000_000),
            )
            .expect("matching point count");
        history
    }

    #[test]
    fn test_reset_resumes_from_surviving_checkpoint() {
        let mut trace = MinimumDistanceBarrierTrace::new(0, 0, &human_sample());
        let at = location("a");
        for d in [4.0, 3.0, 2.0, 1.0] {
            assert!(trace.try_update_with(&at, &robot_sample_at(d)));
        }
        let history = retreat_history();

        // Human moved to x = 2.5: barriers 4.0 and 3.0 survive, resumption
        // lands at slot 0 and re-derives the floor there.
        let mut moved = BodySegmentSample::new(0.0);
        moved.update(&[Point::new(2.5, 0.0, 0.0)], &[Point::new(2.5, 0.0, 0.0)]);
        trace.reset(&moved, &history).expect("archived sample exists");

        assert_eq!(trace.size(), 1);
        assert_eq!(trace.next_index(), 1);
        assert_eq!(trace.barrier(0).maximum_index(), 0);
        assert_relative_eq!(trace.current_minimum_distance(), 1.5);
    }

    #[test]
    fn test_reset_clears_when_nothing_survives() {
        let mut trace = populated_trace();
        let history = retreat_history();

        let mut far = BodySegmentSample::new(0.0);
        far.update(
            &[Point::new(100.0, 0.0, 0.0)],
            &[Point::new(100.0, 0.0, 0.0)],
        );
        trace.reset(&far, &history).expect("clearing never errors");

        assert!(trace.is_empty());
        assert_eq!(trace.next_index(), 0);
        assert_eq!(trace.current_minimum_distance(), f64::INFINITY);
    }

    #[test]
    fn test_reset_without_archived_sample_errors() {
        let mut trace = MinimumDistanceBarrierTrace::new(0, 0, &human_sample());
        // Updates observed in a location the history never committed.
        for d in [4.0, 3.0] {
            assert!(trace.try_update_with(&location("uncommitted"), &robot_sample_at(d)));
        }
        let history = retreat_history();

        let before = trace.clone();
        let err = trace
            .reset(&human_sample(), &history)
            .expect_err("no archive for the resumed location");
        assert!(matches!(
            err,
            crate::error::GuardError::History(HistoryError::MissingSample { .. })
        ));

        // A failed reset must leave the trace exactly as it was.
        assert_eq!(trace.next_index(), before.next_index());
        assert_eq!(trace.size(), before.size());
        assert_eq!(trace.approximation(), before.approximation());
        assert_eq!(trace.last_barrier(), before.last_barrier());
    }

    #[test]
    fn test_growing_radius_contributes_to_deviation() {
        let trace = populated_trace();
        // Centre unchanged, radius grown by 5: deviation 5 beats everything.
        let swollen = SphericalApproximation {
            centre: Point::ZERO,
            radius: 5.0,
        };
        assert_eq!(trace.resume_element(&swollen), None);
        // A shrunken radius costs nothing.
        let shrunk = SphericalApproximation {
            centre: Point::ZERO,
            radius: -0.0,
        };
        assert_eq!(trace.resume_element(&shrunk), Some(3));
    }
}
