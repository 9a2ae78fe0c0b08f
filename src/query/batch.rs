//! Splitting of `IN (...)` lists into bounded batches.

use itertools::Itertools;

/// Splits `values` into consecutive batches of at most `max_batch_size` elements and passes
/// every batch to `flush` as soon as it is complete. The last batch holds the remaining elements.
/// Nothing is flushed when `values` is empty.
///
/// Returns the number of flushed batches. Stops at the first error returned by `flush`;
/// batches flushed before that are not undone.
///
/// A `max_batch_size` of zero is treated as one.
pub fn for_each_batch<I, F, E>(values: I, max_batch_size: usize, mut flush: F) -> Result<usize, E>
where
    I: IntoIterator,
    F: FnMut(Vec<I::Item>) -> Result<(), E>,
{
    let chunks = values.into_iter().chunks(max_batch_size.max(1));
    let mut num_batches = 0;
    for chunk in &chunks {
        flush(chunk.collect())?;
        num_batches += 1;
    }
    Ok(num_batches)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::convert::Infallible;

    fn batches(n: usize, max: usize) -> Vec<Vec<usize>> {
        let mut batches = Vec::new();
        let num = for_each_batch(0..n, max, |b| {
            batches.push(b);
            Ok::<(), Infallible>(())
        })
        .unwrap();
        assert_eq!(num, batches.len(), "number of batches");
        batches
    }

    #[test]
    fn test_empty_input() {
        assert!(batches(0, 3).is_empty(), "no batch for empty input");
    }

    #[test]
    fn test_exact_multiple() {
        let batches = batches(6, 3);
        assert_eq!(batches, vec![vec![0, 1, 2], vec![3, 4, 5]]);
    }

    #[test]
    fn test_remainder() {
        let max = 4;
        let batches = batches(3 * max + 1, max);

        assert_eq!(batches.len(), 4);
        assert!(batches[..3].iter().all(|b| b.len() == max), "full batches: {:?}", batches);
        assert_eq!(batches[3], vec![12], "the last batch");
    }

    #[test]
    fn test_zero_max_size() {
        assert_eq!(batches(2, 0), vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_stop_at_first_error() {
        let mut flushed = Vec::new();
        let result = for_each_batch(0..10, 2, |b| {
            if b[0] == 4 {
                return Err("failure");
            }
            flushed.push(b);
            Ok(())
        });

        assert_eq!(result, Err("failure"));
        assert_eq!(flushed, vec![vec![0, 1], vec![2, 3]], "earlier batches remain flushed");
    }
}
