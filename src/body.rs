//! Articulated bodies and uncertainty-bounded segment samples.
//!
//! A [`Body`] is a named chain of thick line segments over shared point
//! identifiers; a [`Human`] is a plain body, a [`Robot`] additionally carries
//! the sampling frequency of its state stream. A [`BodySegmentSample`]
//! accumulates one segment's observed pose across one or more simultaneous
//! sensor sources, tracking head/tail bounding boxes and a scalar
//! uncertainty, and reduces to a coarse [`SphericalApproximation`] for cheap
//! conservative distance bounds.

use crate::error::BodyError;
use crate::geometry::{point_segment_distance, segment_segment_distance, Aabb, Point};

/// One thick line segment of a body.
///
/// Head and tail are indices into the owning body's point-identifier table;
/// the segment itself never stores a reference back to the body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodySegment {
    index: usize,
    head: usize,
    tail: usize,
    thickness: f64,
}

impl BodySegment {
    fn new(index: usize, head: usize, tail: usize, thickness: f64) -> Self {
        Self {
            index,
            head,
            tail,
            thickness,
        }
    }

    /// Position of this segment within its body.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Index of the head point in the body's point table.
    #[must_use]
    pub fn head(&self) -> usize {
        self.head
    }

    /// Index of the tail point in the body's point table.
    #[must_use]
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Half-width of the physical envelope around the idealized segment.
    #[must_use]
    pub fn thickness(&self) -> f64 {
        self.thickness
    }
}

/// A named collection of segments built from point-identifier pairs.
#[derive(Debug, Clone)]
pub struct Body {
    name: String,
    point_ids: Vec<String>,
    segments: Vec<BodySegment>,
}

impl Body {
    /// Builds a body from per-segment `(head_id, tail_id)` pairs and
    /// thicknesses. Point identifiers are interned in order of first
    /// appearance; that order defines the layout of every observation fed to
    /// this body.
    pub fn new(
        name: impl Into<String>,
        endpoints: &[(String, String)],
        thicknesses: &[f64],
    ) -> Result<Self, BodyError> {
        let name = name.into();
        if endpoints.len() != thicknesses.len() {
            return Err(BodyError::SegmentCountMismatch {
                body: name,
                segments: endpoints.len(),
                thicknesses: thicknesses.len(),
            });
        }

        let mut point_ids: Vec<String> = Vec::new();
        let intern = |id: &String, point_ids: &mut Vec<String>| -> usize {
            match point_ids.iter().position(|p| p == id) {
                Some(i) => i,
                None => {
                    point_ids.push(id.clone());
                    point_ids.len() - 1
                }
            }
        };

        let segments = endpoints
            .iter()
            .zip(thicknesses)
            .enumerate()
            .map(|(index, ((head_id, tail_id), &thickness))| {
                let head = intern(head_id, &mut point_ids);
                let tail = intern(tail_id, &mut point_ids);
                BodySegment::new(index, head, tail, thickness)
            })
            .collect();

        Ok(Self {
            name,
            point_ids,
            segments,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of distinct point identifiers referenced by the segments.
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.point_ids.len()
    }

    /// Index of a point identifier, if the body references it.
    #[must_use]
    pub fn point_index(&self, id: &str) -> Option<usize> {
        self.point_ids.iter().position(|p| p == id)
    }

    #[must_use]
    pub fn segments(&self) -> &[BodySegment] {
        &self.segments
    }

    /// The segment at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range; segment indices are fixed at
    /// construction and an invalid one is a caller bug.
    #[must_use]
    pub fn segment(&self, index: usize) -> &BodySegment {
        &self.segments[index]
    }
}

/// A human body: purely geometric, no sampling frequency.
#[derive(Debug, Clone)]
pub struct Human {
    body: Body,
}

impl Human {
    #[must_use]
    pub fn new(body: Body) -> Self {
        Self { body }
    }

    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }
}

/// A robot body plus the frequency (Hz) at which its state stream samples
/// arrive, used to convert elapsed time into a sample index.
#[derive(Debug, Clone)]
pub struct Robot {
    body: Body,
    packet_frequency_hz: f64,
}

impl Robot {
    /// Pairs a body with its packet frequency.
    pub fn new(body: Body, packet_frequency_hz: f64) -> Result<Self, BodyError> {
        if packet_frequency_hz <= 0.0 {
            return Err(BodyError::InvalidFrequency {
                body: body.name().to_owned(),
                frequency_hz: packet_frequency_hz,
            });
        }
        Ok(Self {
            body,
            packet_frequency_hz,
        })
    }

    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    #[must_use]
    pub fn packet_frequency_hz(&self) -> f64 {
        self.packet_frequency_hz
    }
}

/// A coarse `(centre, radius)` reduction of a [`BodySegmentSample`], used to
/// prove lower bounds on distance without per-segment precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalApproximation {
    /// Centre of the sample's bounding box.
    pub centre: Point,
    /// Circle radius of the sample's bounding box.
    pub radius: f64,
}

/// One segment's accumulated observation.
///
/// Head and tail bounding boxes grow monotonically as observations are
/// merged in; the derived centres, scalar uncertainty (`error`) and overall
/// bounding box are recomputed on every update once both boxes hold at least
/// one point.
#[derive(Debug, Clone, PartialEq)]
pub struct BodySegmentSample {
    thickness: f64,
    head_bounds: Aabb,
    tail_bounds: Aabb,
    head_centre: Point,
    tail_centre: Point,
    error: f64,
    bounding_box: Aabb,
    populated: bool,
}

impl BodySegmentSample {
    /// An empty sample for a segment of the given thickness.
    #[must_use]
    pub fn new(thickness: f64) -> Self {
        Self {
            thickness,
            head_bounds: Aabb::EMPTY,
            tail_bounds: Aabb::EMPTY,
            head_centre: Point::ZERO,
            tail_centre: Point::ZERO,
            error: 0.0,
            bounding_box: Aabb::EMPTY,
            populated: false,
        }
    }

    /// Merges newly observed head and tail points into the running bounds.
    ///
    /// The lists may have unequal (even zero) length: an absent sensor
    /// source simply supplies fewer points. Pairs up to the common length
    /// update both boxes together, the remainder updates only its own box.
    pub fn update(&mut self, heads: &[Point], tails: &[Point]) {
        let common = heads.len().min(tails.len());
        for i in 0..common {
            self.head_bounds.expand(heads[i]);
            self.tail_bounds.expand(tails[i]);
        }
        for &p in &heads[common..] {
            self.head_bounds.expand(p);
        }
        for &p in &tails[common..] {
            self.tail_bounds.expand(p);
        }

        if !self.head_bounds.is_empty() && !self.tail_bounds.is_empty() {
            self.populated = true;
            self.head_centre = self.head_bounds.centre();
            self.tail_centre = self.tail_bounds.centre();
            self.error = self
                .head_bounds
                .circle_radius()
                .max(self.tail_bounds.circle_radius());
            self.bounding_box = Aabb::hull(self.head_centre, self.tail_centre)
                .widened(self.error + self.thickness);
        }
    }

    /// True once both head and tail have received at least one observation.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    #[must_use]
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    /// Centre of the accumulated head observations.
    ///
    /// # Panics
    ///
    /// Panics if the sample is still empty.
    #[must_use]
    pub fn head_centre(&self) -> Point {
        assert!(self.populated, "sample has no observation yet");
        self.head_centre
    }

    /// Centre of the accumulated tail observations.
    ///
    /// # Panics
    ///
    /// Panics if the sample is still empty.
    #[must_use]
    pub fn tail_centre(&self) -> Point {
        assert!(self.populated, "sample has no observation yet");
        self.tail_centre
    }

    /// Positional uncertainty: the larger of the two bounds' circle radii.
    ///
    /// # Panics
    ///
    /// Panics if the sample is still empty.
    #[must_use]
    pub fn error(&self) -> f64 {
        assert!(self.populated, "sample has no observation yet");
        self.error
    }

    /// Hull of the two centres widened by `error + thickness`.
    ///
    /// Empty while the sample has no observation.
    #[must_use]
    pub fn bounding_box(&self) -> &Aabb {
        &self.bounding_box
    }

    /// Conservative envelope intersection test accounting for both samples'
    /// positional uncertainty.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        if self.bounding_box.is_disjoint(&other.bounding_box) {
            return false;
        }
        sample_distance(self, other)
            <= self.thickness + self.error + other.thickness + other.error
    }

    /// Reduces the sample to its bounding box's centre and circle radius.
    ///
    /// # Panics
    ///
    /// Panics if the sample is still empty.
    #[must_use]
    pub fn spherical_approximation(&self) -> SphericalApproximation {
        assert!(self.populated, "sample has no observation yet");
        SphericalApproximation {
            centre: self.bounding_box.centre(),
            radius: self.bounding_box.circle_radius(),
        }
    }
}

/// Segment-segment distance between two samples' head/tail centres.
///
/// Radii are deliberately ignored; the uncertainty terms are added where
/// needed, e.g. in [`BodySegmentSample::intersects`].
///
/// # Panics
///
/// Panics if either sample is still empty.
#[must_use]
pub fn sample_distance(a: &BodySegmentSample, b: &BodySegmentSample) -> f64 {
    segment_segment_distance(
        a.head_centre(),
        a.tail_centre(),
        b.head_centre(),
        b.tail_centre(),
    )
}

/// One-sided conservative lower bound on the distance between a spherical
/// approximation and a segment sample: the point/segment distance minus the
/// sample's uncertainty and thickness and the approximation's radius,
/// clamped at zero.
///
/// # Panics
///
/// Panics if the sample is still empty.
#[must_use]
pub fn approx_sample_distance(approx: &SphericalApproximation, sample: &BodySegmentSample) -> f64 {
    let d = point_segment_distance(approx.centre, sample.head_centre(), sample.tail_centre());
    (d - sample.error() - sample.thickness() - approx.radius).max(0.0)
}

/// A one-shot snapshot of a human's pose: one populated sample per segment,
/// built from a single observation batch.
#[derive(Debug, Clone)]
pub struct HumanStateInstance {
    samples: Vec<BodySegmentSample>,
}

impl HumanStateInstance {
    /// Builds per-segment samples from one observation of every point of the
    /// human. `points_per_point_id` is indexed by the body's point table and
    /// must cover every point; each inner list holds the simultaneous
    /// observations of that point (one per sensor source).
    pub fn new(human: &Human, points_per_point_id: &[Vec<Point>]) -> Result<Self, BodyError> {
        let body = human.body();
        if points_per_point_id.len() != body.num_points() {
            return Err(BodyError::PointCountMismatch {
                expected: body.num_points(),
                actual: points_per_point_id.len(),
            });
        }

        let samples = body
            .segments()
            .iter()
            .map(|segment| {
                let mut sample = BodySegmentSample::new(segment.thickness());
                sample.update(
                    &points_per_point_id[segment.head()],
                    &points_per_point_id[segment.tail()],
                );
                sample
            })
            .collect();

        Ok(Self { samples })
    }

    #[must_use]
    pub fn samples(&self) -> &[BodySegmentSample] {
        &self.samples
    }

    /// The sample for one segment.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn segment_sample(&self, index: usize) -> &BodySegmentSample {
        &self.samples[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_segment_body() -> Body {
        Body::new(
            "arm",
            &[
                ("shoulder".into(), "elbow".into()),
                ("elbow".into(), "wrist".into()),
            ],
            &[0.1, 0.08],
        )
        .expect("valid topology")
    }

    #[test]
    fn test_body_interns_shared_points() {
        let body = two_segment_body();
        assert_eq!(body.num_points(), 3);
        assert_eq!(body.segments().len(), 2);
        assert_eq!(body.segment(0).tail(), body.segment(1).head());
        assert_eq!(body.point_index("wrist"), Some(2));
    }

    #[test]
    fn test_body_rejects_mismatched_lists() {
        let err = Body::new(
            "arm",
            &[("a".into(), "b".into())],
            &[0.1, 0.2],
        )
        .expect_err("length mismatch");
        assert!(matches!(err, BodyError::SegmentCountMismatch { .. }));
    }

    #[test]
    fn test_robot_rejects_non_positive_frequency() {
        let err = Robot::new(two_segment_body(), 0.0).expect_err("zero frequency");
        assert!(matches!(err, BodyError::InvalidFrequency { .. }));
        assert!(Robot::new(two_segment_body(), 30.0).is_ok());
    }

    #[test]
    fn test_sample_stays_empty_until_both_ends_observed() {
        let mut sample = BodySegmentSample::new(0.1);
        assert!(!sample.is_populated());

        sample.update(&[Point::new(0.0, 0.0, 0.0)], &[]);
        assert!(!sample.is_populated());

        sample.update(&[], &[Point::new(1.0, 0.0, 0.0)]);
        assert!(sample.is_populated());
        assert_eq!(sample.head_centre(), Point::new(0.0, 0.0, 0.0));
        assert_eq!(sample.tail_centre(), Point::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_update_split_matches_batch() {
        let heads = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(0.2, 0.1, 0.0),
            Point::new(0.1, -0.1, 0.1),
        ];
        let tails = [
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.1, 0.1, -0.1),
            Point::new(0.9, 0.0, 0.1),
        ];

        let mut batch = BodySegmentSample::new(0.05);
        batch.update(&heads, &tails);

        let mut split = BodySegmentSample::new(0.05);
        split.update(&heads[..1], &tails[..2]);
        split.update(&heads[1..], &tails[2..]);

        assert_relative_eq!(batch.error(), split.error(), epsilon = 1e-12);
        let (bb, sb) = (batch.bounding_box(), split.bounding_box());
        assert_relative_eq!(bb.min().x, sb.min().x, epsilon = 1e-12);
        assert_relative_eq!(bb.max().z, sb.max().z, epsilon = 1e-12);
    }

    #[test]
    fn test_error_is_larger_circle_radius() {
        let mut sample = BodySegmentSample::new(0.0);
        sample.update(
            &[Point::new(0.0, 0.0, 0.0), Point::new(0.2, 0.0, 0.0)],
            &[Point::new(1.0, 0.0, 0.0)],
        );
        // Head box diagonal 0.2, tail box is a point.
        assert_relative_eq!(sample.error(), 0.1);
    }

    #[test]
    fn test_intersects_uses_uncertainty_envelope() {
        let mut a = BodySegmentSample::new(0.1);
        a.update(&[Point::new(0.0, 0.0, 0.0)], &[Point::new(1.0, 0.0, 0.0)]);
        let mut b = BodySegmentSample::new(0.1);
        b.update(&[Point::new(0.0, 0.15, 0.0)], &[Point::new(1.0, 0.15, 0.0)]);

        // Centre distance 0.15 <= thickness sum 0.2.
        assert!(a.intersects(&b));

        let mut c = BodySegmentSample::new(0.01);
        c.update(&[Point::new(0.0, 5.0, 0.0)], &[Point::new(1.0, 5.0, 0.0)]);
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_spherical_approximation() {
        let mut sample = BodySegmentSample::new(0.0);
        sample.update(&[Point::new(0.0, 0.0, 0.0)], &[Point::new(2.0, 0.0, 0.0)]);
        let approx = sample.spherical_approximation();
        assert_eq!(approx.centre, Point::new(1.0, 0.0, 0.0));
        assert_relative_eq!(approx.radius, 1.0);
    }

    #[test]
    fn test_approx_sample_distance_clamps_at_zero() {
        let mut sample = BodySegmentSample::new(0.1);
        sample.update(&[Point::new(0.0, 0.0, 0.0)], &[Point::new(1.0, 0.0, 0.0)]);

        let near = SphericalApproximation {
            centre: Point::new(0.5, 0.1, 0.0),
            radius: 0.5,
        };
        assert_relative_eq!(approx_sample_distance(&near, &sample), 0.0);

        let far = SphericalApproximation {
            centre: Point::new(0.5, 2.0, 0.0),
            radius: 0.5,
        };
        // 2.0 - error(0) - thickness(0.1) - radius(0.5)
        assert_relative_eq!(approx_sample_distance(&far, &sample), 1.4);
    }

    #[test]
    fn test_human_state_instance_builds_all_segments() {
        let human = Human::new(two_segment_body());
        let points = vec![
            vec![Point::new(0.0, 1.6, 0.0)],
            vec![Point::new(0.0, 1.3, 0.0)],
            vec![Point::new(0.0, 1.0, 0.2)],
        ];
        let instance = HumanStateInstance::new(&human, &points).expect("valid point count");
        assert_eq!(instance.samples().len(), 2);
        assert!(instance.segment_sample(0).is_populated());
        assert_eq!(
            instance.segment_sample(1).head_centre(),
            Point::new(0.0, 1.3, 0.0)
        );
    }

    #[test]
    fn test_human_state_instance_rejects_wrong_point_count() {
        let human = Human::new(two_segment_body());
        let err = HumanStateInstance::new(&human, &[vec![Point::ZERO]])
            .expect_err("too few point lists");
        assert!(matches!(err, BodyError::PointCountMismatch { .. }));
    }
}
