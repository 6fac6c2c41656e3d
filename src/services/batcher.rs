//! Batching of normalized items for queue dispatch.

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("batch size must be at least 1")]
pub struct InvalidBatchSize;

/// Split an ordered item sequence into ordered chunks of at most `size`.
/// Order is preserved within and across batches; the last batch may be short.
pub fn into_batches<T>(items: Vec<T>, size: usize) -> Result<Vec<Vec<T>>, InvalidBatchSize> {
    if size == 0 {
        return Err(InvalidBatchSize);
    }

    let mut batches = Vec::with_capacity(items.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(items.len()));

    for item in items {
        current.push(item);
        if current.len() == size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }

    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_250_items_into_100_100_50() {
        let items: Vec<u32> = (0..250).collect();
        let batches = into_batches(items, 100).unwrap();

        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);

        // Order preserved within and across batches.
        let flattened: Vec<u32> = batches.into_iter().flatten().collect();
        assert_eq!(flattened, (0..250).collect::<Vec<u32>>());
    }

    #[test]
    fn exact_multiple_has_no_short_tail() {
        let batches = into_batches((0..200).collect::<Vec<u32>>(), 100).unwrap();
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 100));
    }

    #[test]
    fn fewer_items_than_batch_size_yields_one_batch() {
        let batches = into_batches(vec![1, 2, 3], 100).unwrap();
        assert_eq!(batches, vec![vec![1, 2, 3]]);
    }

    #[test]
    fn empty_input_yields_no_batches() {
        let batches = into_batches(Vec::<u32>::new(), 100).unwrap();
        assert!(batches.is_empty());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert_eq!(into_batches(vec![1], 0), Err(InvalidBatchSize));
    }
}
