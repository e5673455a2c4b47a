//! Closed tours over stop indices.

use serde::{Deserialize, Serialize};

/// Ordered stop indices starting and ending at the depot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tour(Vec<usize>);

impl Tour {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// A tour that leaves the depot and immediately returns.
    pub fn empty(depot: usize) -> Self {
        Self(vec![depot, depot])
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Non-depot stops in visiting order.
    pub fn stops(&self, depot: usize) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied().filter(move |&i| i != depot)
    }

    /// Consecutive (from, to) pairs.
    pub fn legs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.windows(2).map(|w| (w[0], w[1]))
    }

    /// Whether this tour starts and ends at `depot`.
    pub fn is_closed_at(&self, depot: usize) -> bool {
        self.0.len() >= 2 && self.0.first() == Some(&depot) && self.0.last() == Some(&depot)
    }
}

/// Checks that `tours` cover every non-depot index in `0..stop_count`
/// exactly once and that every tour is closed at the depot.
pub fn is_valid_partition(tours: &[Tour], stop_count: usize, depot: usize) -> bool {
    if depot >= stop_count || tours.is_empty() {
        return false;
    }
    let mut seen = vec![false; stop_count];
    for tour in tours {
        if !tour.is_closed_at(depot) {
            return false;
        }
        let inner = &tour.indices()[1..tour.len() - 1];
        for &index in inner {
            if index >= stop_count || index == depot || seen[index] {
                return false;
            }
            seen[index] = true;
        }
    }
    seen.iter()
        .enumerate()
        .all(|(index, &visited)| visited || index == depot)
}
