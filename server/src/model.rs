//! Wire types for the sort endpoints and optional batch limits.

use serde::{Deserialize, Deserializer, Serialize};

/// A batch of integer sequences to sort. Positions are significant.
pub type Batch = Vec<Vec<i64>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
/// Request body accepted by `/process-single` and `/process-concurrent`.
pub struct SortRequest {
    /// Sub-arrays to sort. A missing or `null` field is an empty batch.
    #[serde(default, deserialize_with = "de_null_as_default")]
    pub to_sort: Batch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Response body for a processed batch.
pub struct SortResponse {
    /// `sorted_arrays[i]` is the sorted form of `to_sort[i]`.
    pub sorted_arrays: Batch,
    /// Time spent inside the processor, in nanoseconds.
    pub time_ns: u64,
}

fn de_null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Upper bounds on batch shape. `None` means unbounded.
pub struct BatchLimits {
    pub max_batch_len: Option<usize>,
    pub max_sub_array_len: Option<usize>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
/// A batch that exceeds the configured [`BatchLimits`].
pub enum LimitError {
    #[error("batch has {len} sub-arrays, limit is {max}")]
    TooManySubArrays { len: usize, max: usize },

    #[error("sub-array {index} has {len} elements, limit is {max}")]
    SubArrayTooLong { index: usize, len: usize, max: usize },
}

impl BatchLimits {
    /// Check `batch` against these limits.
    pub fn check(&self, batch: &[Vec<i64>]) -> Result<(), LimitError> {
        if let Some(max) = self.max_batch_len {
            if batch.len() > max {
                return Err(LimitError::TooManySubArrays {
                    len: batch.len(),
                    max,
                });
            }
        }

        if let Some(max) = self.max_sub_array_len {
            if let Some((index, sub)) = batch.iter().enumerate().find(|(_, s)| s.len() > max) {
                return Err(LimitError::SubArrayTooLong {
                    index,
                    len: sub.len(),
                    max,
                });
            }
        }

        Ok(())
    }
}
