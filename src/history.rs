//! Per-discrete-location archive of a robot's continuous state.
//!
//! A [`RobotStateHistory`] ingests a robot's live state stream through
//! [`RobotStateHistory::acquire`]: samples accumulate in an in-progress
//! buffer for the current discrete location and are committed to a
//! per-location archive when the location is exited. Alongside the archive
//! it keeps an ordered log of [`RobotLocationPresence`] entries (the
//! transitions between locations) with dwell-time analytics over them.
//!
//! Single-writer: one ingestion pipeline mutates one history, in
//! non-decreasing timestamp order.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::body::{BodySegmentSample, Robot};
use crate::error::HistoryError;
use crate::forecast::RobotDiscreteTrace;
use crate::geometry::Point;
use crate::state::DiscreteState;

const NANOS_PER_SECOND: f64 = 1e9;

/// A nanosecond wall-clock timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timestamp(u64);

impl Timestamp {
    #[must_use]
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// The current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .max(0);
        Self(nanos as u64)
    }

    #[must_use]
    pub fn as_nanos(self) -> u64 {
        self.0
    }

    /// Nanoseconds elapsed since `earlier`, zero if `earlier` is later.
    #[must_use]
    pub fn nanos_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// One entry in a robot's presence log, recorded at a location change.
///
/// The robot entered `location` at `to_ns`, leaving `exited_from`, which it
/// had occupied since `from_ns`, so `[from_ns, to_ns)` is the dwell
/// interval of `exited_from`. Entries are never mutated after creation and
/// are ordered by `from_ns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotLocationPresence {
    exited_from: DiscreteState,
    location: DiscreteState,
    from_ns: u64,
    to_ns: u64,
}

impl RobotLocationPresence {
    fn new(exited_from: DiscreteState, location: DiscreteState, from: Timestamp, to: Timestamp) -> Self {
        Self {
            exited_from,
            location,
            from_ns: from.as_nanos(),
            to_ns: to.as_nanos(),
        }
    }

    /// The location left behind at `to_ns`.
    #[must_use]
    pub fn exited_from(&self) -> &DiscreteState {
        &self.exited_from
    }

    /// The location entered at `to_ns`.
    #[must_use]
    pub fn location(&self) -> &DiscreteState {
        &self.location
    }

    /// Start of the `exited_from` dwell.
    #[must_use]
    pub fn from_ns(&self) -> u64 {
        self.from_ns
    }

    /// End of the `exited_from` dwell; entry time of `location`.
    #[must_use]
    pub fn to_ns(&self) -> u64 {
        self.to_ns
    }

    /// Length of the `exited_from` dwell in nanoseconds.
    #[must_use]
    pub fn duration_ns(&self) -> u64 {
        self.to_ns - self.from_ns
    }
}

/// Per-segment sample sequences for one discrete location: indexed first by
/// segment, then by sample slot within a visit.
type LocationArchive = Vec<Vec<BodySegmentSample>>;

/// Archive of a robot's segment samples keyed by discrete location, plus the
/// presence log.
#[derive(Debug, Clone)]
pub struct RobotStateHistory {
    robot: Robot,
    current_location: DiscreteState,
    /// In-progress samples for the current location: `[segment][k]` holds
    /// the sample slot and the (possibly merged) sample of the k-th acquire.
    buffer: Vec<Vec<(usize, BodySegmentSample)>>,
    archive: HashMap<DiscreteState, LocationArchive>,
    presences: VecDeque<RobotLocationPresence>,
    started: bool,
}

impl RobotStateHistory {
    #[must_use]
    pub fn new(robot: Robot) -> Self {
        let segments = robot.body().segments().len();
        Self {
            robot,
            current_location: DiscreteState::new(),
            buffer: vec![Vec::new(); segments],
            archive: HashMap::new(),
            presences: VecDeque::new(),
            started: false,
        }
    }

    #[must_use]
    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    /// The discrete location of the most recent acquisition; empty before
    /// the first one.
    #[must_use]
    pub fn current_location(&self) -> &DiscreteState {
        &self.current_location
    }

    /// Ingests one observation of the robot's full point set.
    ///
    /// A location change commits the in-progress buffer to the archive under
    /// the location being left (the initial empty location is a valid key)
    /// and logs a presence entry. Each segment's new head/tail points merge
    /// into the sample at the visit-relative slot: into the in-progress
    /// sample when this visit already observed that slot, into a copy of
    /// the archived sample when a prior visit produced one (widening its
    /// uncertainty envelope), and into a fresh sample otherwise.
    pub fn acquire(
        &mut self,
        location: &DiscreteState,
        points_per_point_id: &[Vec<Point>],
        timestamp: Timestamp,
    ) -> Result<(), HistoryError> {
        let body = self.robot.body();
        if points_per_point_id.len() != body.num_points() {
            return Err(HistoryError::PointCountMismatch {
                expected: body.num_points(),
                actual: points_per_point_id.len(),
            });
        }

        if !self.started || *location != self.current_location {
            self.commit_buffer();
            let from = self
                .presences
                .back()
                .map_or(timestamp, |p| Timestamp::from_nanos(p.to_ns()));
            debug!(
                robot = self.robot.body().name(),
                from = %self.current_location,
                to = %location,
                "discrete location change"
            );
            self.presences.push_back(RobotLocationPresence::new(
                self.current_location.clone(),
                location.clone(),
                from,
                timestamp,
            ));
            self.current_location = location.clone();
            self.started = true;
        }

        let entered = self
            .presences
            .back()
            .map_or(timestamp, |p| Timestamp::from_nanos(p.to_ns()));
        let elapsed_s = timestamp.nanos_since(entered) as f64 / NANOS_PER_SECOND;
        let slot = (elapsed_s * self.robot.packet_frequency_hz()).floor() as usize;

        let segments = self.robot.body().segments().to_vec();
        for segment in &segments {
            let heads = &points_per_point_id[segment.head()];
            let tails = &points_per_point_id[segment.tail()];
            let entries = &mut self.buffer[segment.index()];
            // Several observations can land in one sample slot (multi-source
            // fan-in inside a single 1/f window); they all merge into the
            // same in-progress sample.
            if let Some((_, sample)) = entries.iter_mut().rev().find(|(s, _)| *s == slot) {
                sample.update(heads, tails);
            } else {
                let mut sample = self
                    .archive
                    .get(&self.current_location)
                    .and_then(|per_segment| per_segment[segment.index()].get(slot))
                    .cloned()
                    .unwrap_or_else(|| BodySegmentSample::new(segment.thickness()));
                sample.update(heads, tails);
                entries.push((slot, sample));
            }
        }
        Ok(())
    }

    /// Moves the in-progress buffer into the archive under the current
    /// location, overwriting slots revisited during this visit.
    fn commit_buffer(&mut self) {
        let per_segment = self
            .archive
            .entry(self.current_location.clone())
            .or_insert_with(|| vec![Vec::new(); self.buffer.len()]);
        for (segment, entries) in self.buffer.iter_mut().enumerate() {
            for (slot, sample) in entries.drain(..) {
                if slot < per_segment[segment].len() {
                    per_segment[segment][slot] = sample;
                } else {
                    per_segment[segment].push(sample);
                }
            }
        }
    }

    /// Committed per-segment sample sequences for `location`, if any visit
    /// to it has been committed.
    #[must_use]
    pub fn samples(&self, location: &DiscreteState) -> Option<&LocationArchive> {
        self.archive.get(location)
    }

    /// One committed sample: `location`, then segment, then sample slot.
    #[must_use]
    pub fn sample_at(
        &self,
        location: &DiscreteState,
        segment_id: usize,
        index: usize,
    ) -> Option<&BodySegmentSample> {
        self.archive
            .get(location)?
            .get(segment_id)?
            .get(index)
    }

    /// The committed sequence of discrete locations entered, as a trace with
    /// probability one.
    #[must_use]
    pub fn discrete_trace(&self) -> RobotDiscreteTrace {
        let mut trace = RobotDiscreteTrace::new();
        for presence in &self.presences {
            trace.push_back(presence.location().clone());
        }
        trace
    }

    /// The full presence log, ordered by `from_ns`.
    #[must_use]
    pub fn presences(&self) -> &VecDeque<RobotLocationPresence> {
        &self.presences
    }

    /// Presence entries that put the robot in `location`.
    #[must_use]
    pub fn presences_in(&self, location: &DiscreteState) -> Vec<&RobotLocationPresence> {
        self.presences
            .iter()
            .filter(|p| p.location() == location)
            .collect()
    }

    /// Presence entries whose dwell ended with the robot moving into
    /// `destination`.
    #[must_use]
    pub fn presences_exiting_into(
        &self,
        destination: &DiscreteState,
    ) -> Vec<&RobotLocationPresence> {
        self.presence_pairs()
            .filter(|(_, next)| next.location() == destination)
            .map(|(p, _)| p)
            .collect()
    }

    /// Presence entries that put the robot in `source` and whose dwell there
    /// ended with a move into `target`.
    #[must_use]
    pub fn presences_between(
        &self,
        source: &DiscreteState,
        target: &DiscreteState,
    ) -> Vec<&RobotLocationPresence> {
        self.presence_pairs()
            .filter(|(p, next)| p.location() == source && next.location() == target)
            .map(|(p, _)| p)
            .collect()
    }

    fn presence_pairs(
        &self,
    ) -> impl Iterator<Item = (&RobotLocationPresence, &RobotLocationPresence)> {
        self.presences.iter().zip(self.presences.iter().skip(1))
    }

    /// `[min, max]` of per-visit sample counts over completed dwells in
    /// `location`; `[0, 0]` when no dwell in it has completed.
    #[must_use]
    pub fn range_of_num_samples_in(&self, location: &DiscreteState) -> [u64; 2] {
        self.sample_count_range(
            self.presences
                .iter()
                .filter(|p| p.exited_from() == location),
        )
    }

    /// `[min, max]` of per-visit sample counts over completed dwells in
    /// `source` that ended with a move into `target`.
    #[must_use]
    pub fn range_of_num_samples_between(
        &self,
        source: &DiscreteState,
        target: &DiscreteState,
    ) -> [u64; 2] {
        self.sample_count_range(
            self.presences
                .iter()
                .filter(|p| p.exited_from() == source && p.location() == target),
        )
    }

    fn sample_count_range<'a>(
        &self,
        presences: impl Iterator<Item = &'a RobotLocationPresence>,
    ) -> [u64; 2] {
        let frequency = self.robot.packet_frequency_hz();
        let mut range: Option<[u64; 2]> = None;
        for presence in presences {
            let count =
                (presence.duration_ns() as f64 / NANOS_PER_SECOND * frequency).floor() as u64;
            range = Some(match range {
                None => [count, count],
                Some([min, max]) => [min.min(count), max.max(count)],
            });
        }
        range.unwrap_or([0, 0])
    }
}
