use crate::error::AppError;

/// Splits `items` into consecutive groups of at most `size`.
///
/// Only the last group may be shorter. Concatenating the groups gives back
/// `items` in the original order.
///
/// # Errors
///
/// Returns `AppError::InvalidBatchSize` when `size` is zero.
///
/// # Examples
///
/// ```
/// use leadsync_core::chunk::chunk;
///
/// let groups = chunk((1..=5).collect::<Vec<_>>(), 2).unwrap();
/// assert_eq!(groups, vec![vec![1, 2], vec![3, 4], vec![5]]);
/// ```
pub fn chunk<T>(items: Vec<T>, size: usize) -> Result<Vec<Vec<T>>, AppError> {
    if size == 0 {
        return Err(AppError::InvalidBatchSize(size));
    }

    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(items.len()));

    for item in items {
        current.push(item);
        if current.len() == size {
            chunks.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    Ok(chunks)
}
