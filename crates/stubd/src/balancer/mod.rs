//! Response selection.
//!
//! - `Strategy`: the selection algorithms and their wire names
//! - `Balancer`: stateful engine picking one candidate per call, owning the
//!   per-route round-robin cursors
//!
//! The random strategies are stateless; only round-robin keeps state, and that
//! state is keyed by route path so it survives configuration updates that do not
//! touch the route.

mod cursor;
mod strategy;

pub use cursor::{CursorTable, RouteCursor};
pub use strategy::{
    cumulative_weights, select_random, select_round_robin, select_weighted,
    select_weighted_binary, total_weight, HasWeight, SelectError, Strategy,
};

/// Picks one response per request according to a route's strategy
#[derive(Default)]
pub struct Balancer {
    cursors: CursorTable,
}

impl Balancer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select one candidate for `route`.
    ///
    /// `cumulative` is only consulted by [`Strategy::WeightedBinarySearch`] and
    /// must be the prefix sums of `candidates`.
    pub fn select<'a, T: HasWeight>(
        &self,
        route: &str,
        strategy: Strategy,
        candidates: &'a [T],
        cumulative: &[u64],
    ) -> Result<&'a T, SelectError> {
        match strategy {
            Strategy::RoundRobin => {
                let cursor = self.cursors.next_index(route, candidates.len());
                select_round_robin(candidates, cursor).map(|(picked, _)| picked)
            }
            Strategy::Weighted => select_weighted(candidates, &mut rand::thread_rng()),
            Strategy::Random => select_random(candidates, &mut rand::thread_rng()),
            Strategy::WeightedBinarySearch => {
                select_weighted_binary(candidates, cumulative, &mut rand::thread_rng())
            }
        }
    }

    /// Keep cursors only for routes accepted by `keep`.
    pub fn retain_routes(&self, keep: impl FnMut(&str) -> bool) {
        self.cursors.retain(keep);
    }

    pub fn cursors(&self) -> &CursorTable {
        &self.cursors
    }
}
