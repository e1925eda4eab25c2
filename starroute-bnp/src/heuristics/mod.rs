//! Cheap column builders that complement pricing.
//!
//! [`InitialSolutionHeuristic`] seeds the root master with a feasible set of
//! routes. [`RearrangeCustomersHeuristic`] derives new columns from the
//! routes in the current primal solution without solving a pricing problem.

mod initial;
mod rearrange;

pub use initial::InitialSolutionHeuristic;
pub use rearrange::RearrangeCustomersHeuristic;

use std::collections::BTreeSet;

use starroute_core::Instance;

/// Merge drafts pairwise while their combined demand fits a vehicle.
///
/// Merged drafts are appended and may merge again; the pair they came from
/// is dropped from the result.
fn merge_pairwise<T>(
    mut drafts: Vec<T>,
    mut merge: impl FnMut(&T, &T) -> Option<T>,
) -> Vec<T> {
    let mut merged: BTreeSet<usize> = BTreeSet::new();
    let mut index = 0;
    while index < drafts.len() {
        for other in 0..index {
            if merged.contains(&index) || merged.contains(&other) {
                continue;
            }
            let (Some(first), Some(second)) = (drafts.get(index), drafts.get(other)) else {
                continue;
            };
            if let Some(replacement) = merge(first, second) {
                drafts.push(replacement);
                merged.insert(index);
                merged.insert(other);
            }
        }
        index += 1;
    }
    drafts
        .into_iter()
        .enumerate()
        .filter(|(position, _)| !merged.contains(position))
        .map(|(_, draft)| draft)
        .collect()
}

/// Whether two customer sets fit a single vehicle together.
fn fits_together<'c>(
    instance: &Instance,
    first: impl IntoIterator<Item = &'c usize>,
    second: impl IntoIterator<Item = &'c usize>,
) -> bool {
    instance
        .total_demand(first)
        .saturating_add(instance.total_demand(second))
        <= instance.capacity()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn merged_items_can_merge_again() {
        let merged = merge_pairwise(vec![1_u32, 2, 3], |a, b| {
            let sum = a + b;
            (sum <= 6).then_some(sum)
        });
        assert_eq!(merged, vec![6]);
    }

    #[rstest]
    fn unmergeable_items_survive() {
        let merged = merge_pairwise(vec![4_u32, 5, 1], |a, b| {
            let sum = a + b;
            (sum <= 5).then_some(sum)
        });
        assert_eq!(merged, vec![5, 5]);
    }
}
