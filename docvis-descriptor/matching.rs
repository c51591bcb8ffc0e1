use docvis_core::Descriptor;
use rayon::prelude::*;

use crate::error::{DescriptorError, DescriptorResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Query descriptor paired with a train descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Match {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f64,
}

/// The (up to) two nearest train descriptors of one query, closest first
#[derive(Debug, Clone, PartialEq)]
pub struct KnnMatch {
    pub query_idx: usize,
    pub neighbors: Vec<Match>,
}

impl KnnMatch {
    pub fn best(&self) -> Option<&Match> {
        self.neighbors.first()
    }

    pub fn second(&self) -> Option<&Match> {
        self.neighbors.get(1)
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn common_length(query: &[Descriptor], train: &[Descriptor]) -> DescriptorResult<()> {
    let Some(expected) = query.first().or_else(|| train.first()).map(|d| d.len()) else {
        return Ok(());
    };
    for d in query.iter().chain(train) {
        if d.len() != expected {
            return Err(DescriptorError::LengthMismatch {
                expected,
                actual: d.len(),
            });
        }
    }
    Ok(())
}

/// Brute-force k = 2 matcher with the nearest-neighbour ratio test
#[derive(Debug, Clone)]
pub struct RatioMatcher {
    ratio: f64,
}

impl Default for RatioMatcher {
    fn default() -> Self {
        Self { ratio: 0.05 }
    }
}

impl RatioMatcher {
    pub fn new(ratio: f64) -> DescriptorResult<Self> {
        if ratio.is_nan() || ratio <= 0.0 {
            return Err(DescriptorError::InvalidRatio(ratio));
        }
        Ok(Self { ratio })
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Two nearest train descriptors for every query, by Euclidean distance.
    /// Equal distances keep the lower train index first.
    pub fn knn_match(
        &self,
        query: &[Descriptor],
        train: &[Descriptor],
    ) -> DescriptorResult<Vec<KnnMatch>> {
        common_length(query, train)?;

        Ok(query
            .par_iter()
            .enumerate()
            .map(|(query_idx, q)| {
                let mut best: Option<Match> = None;
                let mut second: Option<Match> = None;
                for (train_idx, t) in train.iter().enumerate() {
                    let m = Match {
                        query_idx,
                        train_idx,
                        distance: euclidean(q, t),
                    };
                    if best.map_or(true, |b| m.distance < b.distance) {
                        second = best;
                        best = Some(m);
                    } else if second.map_or(true, |s| m.distance < s.distance) {
                        second = Some(m);
                    }
                }
                KnnMatch {
                    query_idx,
                    neighbors: best.into_iter().chain(second).collect(),
                }
            })
            .collect())
    }

    /// Best matches that pass `best < ratio * second`.
    ///
    /// Queries with fewer than two candidates are dropped.
    pub fn match_descriptors(
        &self,
        query: &[Descriptor],
        train: &[Descriptor],
    ) -> DescriptorResult<Vec<Match>> {
        let knn = self.knn_match(query, train)?;
        let matches: Vec<Match> = knn
            .iter()
            .filter_map(|k| match (k.best(), k.second()) {
                (Some(b), Some(s)) if b.distance < self.ratio * s.distance => Some(*b),
                _ => None,
            })
            .collect();
        log::debug!(
            "ratio test {}: kept {} of {} queries",
            self.ratio,
            matches.len(),
            query.len()
        );
        Ok(matches)
    }
}
