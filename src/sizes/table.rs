//! Pre-computed table of prime-subset log-sizes for runtime set selection
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;
use tracing::error;

use crate::{
    chain::Context,
    collections::IndexSet,
    sdk::api::{ChainError, ChainResult},
};

/// A prime subset and the natural log of its product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeEntry {
    pub size: f64,
    pub set: IndexSet,
}

/// Sorted enumeration of the log-sizes of all subset-of-smallPrimes ×
/// prefix-interval-of-ctxtPrimes combinations.
///
/// Immutable once initialized; queries take `&self` and may run concurrently.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuliSizes {
    sizes: Vec<SizeEntry>,
}

impl ModuliSizes {
    /// Enumerate 2^|smallPrimes| · (|ctxtPrimes|+1) entries by doubling,
    /// then sort ascending by size with lexicographic set tie-break.
    pub fn init(context: &Context) -> ChainResult<Self> {
        let small = context.small_primes();
        let ctxt = context.ctxt_primes();
        let expected = (1usize << small.card()) * (ctxt.card() + 1);

        let mut sizes = Vec::with_capacity(expected);
        sizes.push(SizeEntry {
            size: 0.0,
            set: IndexSet::new(),
        });

        // each small prime doubles the table
        for index in small.iter() {
            let log_q = context.log_of_prime(index)?;
            let count = sizes.len();
            for j in 0..count {
                let mut entry = sizes[j].clone();
                entry.size += log_q;
                entry.set.insert(index);
                sizes.push(entry);
            }
        }

        // cross the small-prime subsets with every prefix interval of the
        // ctxt primes in registration order
        let count = sizes.len();
        let mut interval = IndexSet::new();
        let mut interval_size = 0.0;
        for index in ctxt.iter() {
            interval.insert(index);
            interval_size += context.log_of_prime(index)?;
            for j in 0..count {
                let mut entry = sizes[j].clone();
                entry.size += interval_size;
                entry.set.insert_set(&interval);
                sizes.push(entry);
            }
        }
        debug_assert_eq!(sizes.len(), expected);

        sizes.sort_by(|a, b| a.size.total_cmp(&b.size).then_with(|| a.set.cmp(&b.set)));
        Ok(Self { sizes })
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn entries(&self) -> &[SizeEntry] {
        &self.sizes
    }

    pub(super) fn from_entries(sizes: Vec<SizeEntry>) -> Self {
        Self { sizes }
    }

    /// Find a subset whose log-size lies in [low, high] dropping the fewest
    /// primes from `from`. Ties prefer the later (larger) entry. When the
    /// window is empty, fall back to entries within one bit of the nearest
    /// feasible size: below the window when `reverse` is false, above it
    /// otherwise.
    pub fn get_set_for_size(
        &self,
        low: f64,
        high: f64,
        from: &IndexSet,
        reverse: bool,
    ) -> ChainResult<IndexSet> {
        self.select(low, high, reverse, |set| from.diff_card(set))
    }

    /// Two-source form: cost is |from1 \ set| + |from2 \ set|.
    pub fn get_set_for_size2(
        &self,
        low: f64,
        high: f64,
        from1: &IndexSet,
        from2: &IndexSet,
        reverse: bool,
    ) -> ChainResult<IndexSet> {
        self.select(low, high, reverse, |set| {
            from1.diff_card(set) + from2.diff_card(set)
        })
    }

    fn select<F>(&self, low: f64, high: f64, reverse: bool, cost: F) -> ChainResult<IndexSet>
    where
        F: Fn(&IndexSet) -> usize,
    {
        let n = self.sizes.len();
        let idx = self.sizes.partition_point(|entry| entry.size < low);

        let mut best: Option<usize> = None;
        let mut best_cost = usize::MAX;

        // in-range scan: `<=` keeps the later entry on ties, leaving more
        // noise budget among equal-cost candidates
        let mut ii = idx;
        while ii < n && self.sizes[ii].size <= high {
            let this_cost = cost(&self.sizes[ii].set);
            if this_cost <= best_cost {
                best = Some(ii);
                best_cost = this_cost;
            }
            ii += 1;
        }

        if best.is_none() {
            if reverse {
                // nothing in [low, high]: consider entries within one bit
                // above the nearest feasible size
                if ii < n {
                    let upper_bound = self.sizes[ii].size + LN_2;
                    while ii < n && self.sizes[ii].size <= upper_bound {
                        let this_cost = cost(&self.sizes[ii].set);
                        if this_cost < best_cost {
                            best = Some(ii);
                            best_cost = this_cost;
                        }
                        ii += 1;
                    }
                }
            } else if idx > 0 {
                // within one bit below, scanning downwards so `<` keeps the
                // entry closest to the window
                let lower_bound = self.sizes[idx - 1].size - LN_2;
                let mut jj = idx;
                while jj > 0 && self.sizes[jj - 1].size >= lower_bound {
                    let this_cost = cost(&self.sizes[jj - 1].set);
                    if this_cost < best_cost {
                        best = Some(jj - 1);
                        best_cost = this_cost;
                    }
                    jj -= 1;
                }
            }
        }

        match best {
            Some(b) => Ok(self.sizes[b].set.clone()),
            None => {
                error!("no feasible prime subset for size window [{}, {}]", low, high);
                Err(ChainError::NoFeasibleSet)
            }
        }
    }
}
