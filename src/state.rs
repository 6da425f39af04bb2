//! Discrete operating-mode labels.
//!
//! A [`DiscreteState`] is an ordered mapping from variable name to value that
//! labels a robot's operating mode or location, orthogonal to its continuous
//! geometric state. Two states built from different key sets are *not
//! comparable* by their shared variables; the domain-level comparison
//! [`DiscreteState::matches`] surfaces that case as an error instead of
//! silently answering.

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// An ordered key/value labeling of a discrete operating mode or location.
///
/// The empty state denotes "no location yet" and compares unequal to any
/// non-empty state. Structural equality (`==`, `Ord`, `Hash`) follows the
/// underlying map and is what containers use; [`DiscreteState::matches`] is
/// the domain comparison with the failing semantics described there.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiscreteState {
    variables: BTreeMap<String, String>,
}

impl DiscreteState {
    /// The empty, unconditioned state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a state from key/value pairs. Later duplicates overwrite
    /// earlier ones.
    #[must_use]
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            variables: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Sets one variable, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.variables.insert(key.into(), value.into())
    }

    /// Looks up one variable.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Iterates variables in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Domain-level comparison of two mode labels.
    ///
    /// Scanning keys in sorted order:
    ///
    /// - any key present in both states with differing values makes the
    ///   states distinct (`Ok(false)`);
    /// - identical key sets with all values equal make them equal
    ///   (`Ok(true)`);
    /// - differing key sets with no shared-key disagreement are
    ///   *indeterminate* ([`StateError::IndeterminateComparison`]): the
    ///   states cannot be distinguished by their shared variables, and
    ///   assuming either answer would be unsound.
    ///
    /// The empty state is explicitly comparable: it equals only itself and
    /// is unequal to every non-empty state.
    pub fn matches(&self, other: &Self) -> Result<bool, StateError> {
        if self.is_empty() || other.is_empty() {
            return Ok(self.is_empty() == other.is_empty());
        }

        let mut identical_key_sets = true;
        let mut lhs = self.variables.iter().peekable();
        let mut rhs = other.variables.iter().peekable();
        loop {
            match (lhs.peek(), rhs.peek()) {
                (None, None) => break,
                (Some(_), None) | (None, Some(_)) => {
                    identical_key_sets = false;
                    break;
                }
                (Some((lk, lv)), Some((rk, rv))) => match lk.cmp(rk) {
                    std::cmp::Ordering::Equal => {
                        if lv != rv {
                            return Ok(false);
                        }
                        lhs.next();
                        rhs.next();
                    }
                    std::cmp::Ordering::Less => {
                        identical_key_sets = false;
                        lhs.next();
                    }
                    std::cmp::Ordering::Greater => {
                        identical_key_sets = false;
                        rhs.next();
                    }
                },
            }
        }

        if identical_key_sets {
            Ok(true)
        } else {
            Err(StateError::IndeterminateComparison {
                left: self.to_string(),
                right: other.to_string(),
            })
        }
    }
}

impl fmt::Display for DiscreteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variables.is_empty() {
            return write!(f, "{{}}");
        }
        write!(f, "{{")?;
        for (i, (k, v)) in self.variables.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, "}}")
    }
}
