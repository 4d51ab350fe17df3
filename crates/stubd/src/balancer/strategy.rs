//! Response-selection strategies and the pure selection algorithms.

use rand::Rng;
use std::fmt;
use std::str::FromStr;

/// Errors raised when a response cannot be selected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectError {
    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),
    #[error("no candidate responses configured")]
    EmptyCandidates,
    #[error("total weight of candidate responses is zero")]
    ZeroTotalWeight,
}

/// Algorithm used to pick one response out of a route's candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Configured order, one step per request.
    RoundRobin,
    /// Weighted random draw, linear cumulative walk.
    Weighted,
    /// Uniform random draw.
    Random,
    /// Weighted random draw located by binary search over prefix sums.
    WeightedBinarySearch,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::RoundRobin,
        Strategy::Weighted,
        Strategy::Random,
        Strategy::WeightedBinarySearch,
    ];

    /// Canonical wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::RoundRobin => "round-robin",
            Strategy::Weighted => "weight",
            Strategy::Random => "random",
            Strategy::WeightedBinarySearch => "weighted-binary-search",
        }
    }

    pub fn is_weighted(&self) -> bool {
        matches!(self, Strategy::Weighted | Strategy::WeightedBinarySearch)
    }

    /// Check that `candidates` can be selected from under this strategy.
    pub fn validate<T: HasWeight>(&self, candidates: &[T]) -> Result<(), SelectError> {
        if candidates.is_empty() {
            return Err(SelectError::EmptyCandidates);
        }
        if self.is_weighted() && total_weight(candidates) == 0 {
            return Err(SelectError::ZeroTotalWeight);
        }
        Ok(())
    }
}

impl FromStr for Strategy {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "round-robin" => Ok(Strategy::RoundRobin),
            "weight" | "weighted" => Ok(Strategy::Weighted),
            "random" => Ok(Strategy::Random),
            "weighted-binary-search" | "weighted random with bs" => {
                Ok(Strategy::WeightedBinarySearch)
            }
            _ => Err(SelectError::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Types that carry a selection weight
pub trait HasWeight {
    fn weight(&self) -> u32;
}

impl HasWeight for crate::routes::ResponseSpec {
    fn weight(&self) -> u32 {
        self.weight
    }
}

pub fn total_weight<T: HasWeight>(candidates: &[T]) -> u64 {
    candidates.iter().map(|c| u64::from(c.weight())).sum()
}

/// Running sums of candidate weights, `prefix[i] = w[0] + .. + w[i]`.
pub fn cumulative_weights<T: HasWeight>(candidates: &[T]) -> Vec<u64> {
    candidates
        .iter()
        .scan(0u64, |acc, c| {
            *acc += u64::from(c.weight());
            Some(*acc)
        })
        .collect()
}

/// Return `candidates[cursor mod len]` and the cursor for the next call.
pub fn select_round_robin<T>(candidates: &[T], cursor: usize) -> Result<(&T, usize), SelectError> {
    if candidates.is_empty() {
        return Err(SelectError::EmptyCandidates);
    }
    let index = cursor % candidates.len();
    Ok((&candidates[index], (index + 1) % candidates.len()))
}

/// Draw in `[0, total)` and walk the candidates accumulating weight.
pub fn select_weighted<'a, T: HasWeight, R: Rng + ?Sized>(
    candidates: &'a [T],
    rng: &mut R,
) -> Result<&'a T, SelectError> {
    if candidates.is_empty() {
        return Err(SelectError::EmptyCandidates);
    }
    let total = total_weight(candidates);
    if total == 0 {
        return Err(SelectError::ZeroTotalWeight);
    }

    let draw = rng.gen_range(0..total);
    let mut cumulative = 0u64;
    for candidate in candidates {
        cumulative += u64::from(candidate.weight());
        if draw < cumulative {
            return Ok(candidate);
        }
    }
    // draw < total == final cumulative value, so the loop always returns
    candidates.last().ok_or(SelectError::EmptyCandidates)
}

/// Weighted draw located with a binary search over precomputed prefix sums.
///
/// `cumulative` must come from [`cumulative_weights`] over the same candidates.
pub fn select_weighted_binary<'a, T, R: Rng + ?Sized>(
    candidates: &'a [T],
    cumulative: &[u64],
    rng: &mut R,
) -> Result<&'a T, SelectError> {
    if candidates.is_empty() || cumulative.len() != candidates.len() {
        return Err(SelectError::EmptyCandidates);
    }
    let total = cumulative.last().copied().unwrap_or(0);
    if total == 0 {
        return Err(SelectError::ZeroTotalWeight);
    }

    let draw = rng.gen_range(0..total);
    // First prefix strictly greater than the draw; zero-weight entries share
    // their predecessor's prefix and are never the first one.
    let index = cumulative.partition_point(|&p| p <= draw);
    candidates.get(index).ok_or(SelectError::ZeroTotalWeight)
}

/// Uniform pick over `[0, len)`.
pub fn select_random<'a, T, R: Rng + ?Sized>(
    candidates: &'a [T],
    rng: &mut R,
) -> Result<&'a T, SelectError> {
    if candidates.is_empty() {
        return Err(SelectError::EmptyCandidates);
    }
    Ok(&candidates[rng.gen_range(0..candidates.len())])
}
