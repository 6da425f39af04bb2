//! Discrete-trace analytics: forecasting the next operating location.
//!
//! A [`RobotDiscreteTrace`] is a probability-weighted sequence of discrete
//! locations. Its [`next_locations`](RobotDiscreteTrace::next_locations)
//! predictor finds every earlier occurrence of the current trace ending,
//! grows all of them backward in lock-step to the longest suffix any of them
//! shares with the present, and lets the survivors vote on what the robot
//! did next the last time it found itself in an identical recent context.

use std::collections::{HashMap, VecDeque};

use crate::state::DiscreteState;

/// A double-ended sequence of discrete locations with a cumulative
/// probability, plus a memoised next-location forecast.
#[derive(Debug, Clone)]
pub struct RobotDiscreteTrace {
    states: VecDeque<DiscreteState>,
    probability: f64,
    forecast: Option<HashMap<DiscreteState, f64>>,
    maximum_trace_size: usize,
}

impl Default for RobotDiscreteTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotDiscreteTrace {
    /// An empty trace with probability one.
    #[must_use]
    pub fn new() -> Self {
        Self::with_probability(1.0)
    }

    /// An empty trace carrying the given cumulative probability.
    #[must_use]
    pub fn with_probability(probability: f64) -> Self {
        Self {
            states: VecDeque::new(),
            probability,
            forecast: None,
            maximum_trace_size: 0,
        }
    }

    #[must_use]
    pub fn probability(&self) -> f64 {
        self.probability
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The most recent location, if any.
    #[must_use]
    pub fn last(&self) -> Option<&DiscreteState> {
        self.states.back()
    }

    /// Iterates locations oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &DiscreteState> {
        self.states.iter()
    }

    /// Appends the newest location, invalidating the cached forecast.
    pub fn push_back(&mut self, state: DiscreteState) {
        self.forecast = None;
        self.states.push_back(state);
    }

    /// Prepends an older location, invalidating the cached forecast.
    pub fn push_front(&mut self, state: DiscreteState) {
        self.forecast = None;
        self.states.push_front(state);
    }

    /// The longest suffix length any earlier repeat shared with the current
    /// trace ending, as of the most recent forecast computation.
    #[must_use]
    pub fn maximum_trace_size(&self) -> usize {
        self.maximum_trace_size
    }

    /// Forecasts the next location from repeated historical subsequences.
    ///
    /// Every earlier occurrence of the trace's last element seeds a
    /// candidate proposing its own successor. All candidates grow backward
    /// in lock-step against the trace ending; the round in which the last
    /// candidates survive fixes the matched suffix length, and those
    /// survivors vote. Each voted location maps to
    /// `probability * votes / survivors`. The result is empty when the last
    /// element never occurred before, and memoised until the trace changes.
    pub fn next_locations(&mut self) -> &HashMap<DiscreteState, f64> {
        if self.forecast.is_none() {
            let (forecast, matched) = self.compute_forecast();
            self.maximum_trace_size = matched;
            self.forecast = Some(forecast);
        }
        self.forecast
            .as_ref()
            .expect("forecast memoised just above")
    }

    fn compute_forecast(&self) -> (HashMap<DiscreteState, f64>, usize) {
        let states: Vec<&DiscreteState> = self.states.iter().collect();
        let n = states.len();
        let Some(&last) = states.last() else {
            return (HashMap::new(), 0);
        };

        // Anchor a candidate at every earlier occurrence of the last
        // element; each proposes its successor as the next location.
        let mut candidates: Vec<usize> = (0..n - 1).filter(|&i| states[i] == last).collect();
        if candidates.is_empty() {
            return (HashMap::new(), 0);
        }

        let mut matched = 0;
        loop {
            let step = matched + 1;
            let survivors: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|&i| i >= step && states[i - step] == states[n - 1 - step])
                .collect();
            if survivors.is_empty() {
                break;
            }
            candidates = survivors;
            matched = step;
        }

        let weight = self.probability / candidates.len() as f64;
        let mut forecast: HashMap<DiscreteState, f64> = HashMap::new();
        for i in candidates {
            *forecast.entry(states[i + 1].clone()).or_insert(0.0) += weight;
        }
        (forecast, matched)
    }
}

impl FromIterator<DiscreteState> for RobotDiscreteTrace {
    fn from_iter<I: IntoIterator<Item = DiscreteState>>(iter: I) -> Self {
        let mut trace = Self::new();
        for state in iter {
            trace.push_back(state);
        }
        trace
    }
}
