//! Sorting a single integer sequence.

/// Return a sorted copy of `values` in non-decreasing order.
///
/// The input is left untouched. Equal integers are indistinguishable, so an unstable sort is
/// sufficient.
pub fn sort_sequence(values: &[i64]) -> Vec<i64> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted
}

/// Whether `values` is in non-decreasing order.
pub fn is_sorted(values: &[i64]) -> bool {
    values.windows(2).all(|w| w[0] <= w[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sorts_mixed_signs() {
        assert_eq!(sort_sequence(&[9, -1, 0]), vec![-1, 0, 9]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(sort_sequence(&[]).is_empty());
    }

    #[test]
    fn input_is_not_mutated() {
        let input = vec![3, 1, 2];
        let sorted = sort_sequence(&input);
        assert_eq!(input, vec![3, 1, 2]);
        assert_eq!(sorted, vec![1, 2, 3]);
    }

    #[test]
    fn handles_extremes_and_duplicates() {
        let input = [i64::MAX, 0, i64::MIN, 0, -7, i64::MAX];
        assert_eq!(
            sort_sequence(&input),
            vec![i64::MIN, -7, 0, 0, i64::MAX, i64::MAX]
        );
    }

    proptest! {
        #[test]
        fn output_is_ordered(values in prop::collection::vec(any::<i64>(), 0..512)) {
            prop_assert!(is_sorted(&sort_sequence(&values)));
        }

        #[test]
        fn sorting_is_idempotent(values in prop::collection::vec(any::<i64>(), 0..512)) {
            let once = sort_sequence(&values);
            prop_assert_eq!(sort_sequence(&once), once);
        }

        #[test]
        fn multiset_is_preserved(values in prop::collection::vec(-50i64..50, 0..512)) {
            let sorted = sort_sequence(&values);
            prop_assert_eq!(sorted.len(), values.len());

            let mut counts = std::collections::HashMap::<i64, isize>::new();
            for v in &values {
                *counts.entry(*v).or_default() += 1;
            }
            for v in &sorted {
                *counts.entry(*v).or_default() -= 1;
            }
            prop_assert!(counts.values().all(|c| *c == 0));
        }
    }
}
