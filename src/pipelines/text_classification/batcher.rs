use std::fmt::Debug;

use burn::tensor::{backend::Backend, Bool, Data, ElementConversion, Int, Shape, Tensor};
use derive_new::new;

use crate::datasets::Example;

/// An inference batch for text classification
#[derive(Debug, Clone, new)]
pub struct Infer<B: Backend> {
    /// Token ids as 2D tensor: [batch_size, seq_length]
    pub tokens: Tensor<B, 2, Int>,

    /// Padding mask containing `true` at padding locations: [batch_size, seq_length]
    pub mask_pad: Tensor<B, 2, Bool>,
}

/// A training batch for text classification
#[derive(Clone, Debug, new)]
pub struct Train<B: Backend> {
    /// Model input
    pub input: Infer<B>,

    /// Class ids for the batch
    pub targets: Tensor<B, 1, Int>,
}

/// Shape faults found while assembling a batch
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// No rows were given
    #[error("batch is empty")]
    Empty,

    /// The first row has no tokens
    #[error("sequences are empty")]
    EmptySequence,

    /// A row's length differs from the first row's
    #[error("row {row} has {found} tokens, expected {expected}")]
    SequenceLength {
        /// Row within the batch
        row: usize,
        /// Length of the first row
        expected: usize,
        /// Length of this row
        found: usize,
    },

    /// A row's mask length differs from its token count
    #[error("row {row} has {ids} tokens but an attention mask of length {mask}")]
    MaskLength {
        /// Row within the batch
        row: usize,
        /// Token count
        ids: usize,
        /// Mask length
        mask: usize,
    },

    /// A token id cannot be embedded
    #[error("row {row} contains token id {token}, outside a vocabulary of {vocab_size}")]
    TokenOutOfRange {
        /// Row within the batch
        row: usize,
        /// The offending token id
        token: u32,
        /// The model's vocabulary size
        vocab_size: usize,
    },
}

/// Struct for batching sentiment examples into tensors
#[derive(Clone, Debug, new)]
pub struct Batcher<B: Backend> {
    /// Number of token ids the model can embed
    pub vocab_size: usize,

    /// Device on which to perform computation (e.g., CPU or CUDA device)
    pub device: B::Device,
}

impl<B: Backend> Batcher<B> {
    /// Collects token id and attention mask rows into an inference batch
    pub fn infer<'a, I>(&self, rows: I) -> Result<Infer<B>, ShapeError>
    where
        I: IntoIterator<Item = (&'a [u32], &'a [u8])>,
    {
        let rows: Vec<_> = rows.into_iter().collect();
        let seq_length = self.check(&rows)?;
        let batch_size = rows.len();

        let tokens: Data<B::IntElem, 2> = Data::new(
            rows.iter()
                .flat_map(|(ids, _)| ids.iter().map(|&id| (id as i64).elem()))
                .collect(),
            Shape::new([batch_size, seq_length]),
        );

        let mask_pad: Data<bool, 2> = Data::new(
            rows.iter()
                .flat_map(|(_, mask)| mask.iter().map(|&m| m == 0))
                .collect(),
            Shape::new([batch_size, seq_length]),
        );

        Ok(Infer {
            tokens: Tensor::from_data(tokens, &self.device),
            mask_pad: Tensor::from_data(mask_pad, &self.device),
        })
    }

    /// Collects examples into a training batch. The batch may be shorter than the configured
    /// batch size, but its examples must share one sequence length.
    pub fn train(&self, items: &[Example]) -> Result<Train<B>, ShapeError> {
        let input = self.infer(
            items
                .iter()
                .map(|item| (item.input_ids.as_slice(), item.attention_mask.as_slice())),
        )?;

        let targets: Data<B::IntElem, 1> = Data::new(
            items.iter().map(|item| (item.label as i64).elem()).collect(),
            Shape::new([items.len()]),
        );

        Ok(Train {
            input,
            targets: Tensor::from_data(targets, &self.device),
        })
    }

    fn check(&self, rows: &[(&[u32], &[u8])]) -> Result<usize, ShapeError> {
        let Some((first, _)) = rows.first() else {
            return Err(ShapeError::Empty);
        };

        let expected = first.len();
        if expected == 0 {
            return Err(ShapeError::EmptySequence);
        }

        for (row, (ids, mask)) in rows.iter().enumerate() {
            if ids.len() != expected {
                return Err(ShapeError::SequenceLength {
                    row,
                    expected,
                    found: ids.len(),
                });
            }

            if mask.len() != ids.len() {
                return Err(ShapeError::MaskLength {
                    row,
                    ids: ids.len(),
                    mask: mask.len(),
                });
            }

            if let Some(&token) = ids.iter().find(|&&id| id as usize >= self.vocab_size) {
                return Err(ShapeError::TokenOutOfRange {
                    row,
                    token,
                    vocab_size: self.vocab_size,
                });
            }
        }

        Ok(expected)
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::{ndarray::NdArrayDevice, NdArray};
    use pretty_assertions::assert_eq;

    use super::*;

    type TestBackend = NdArray;

    fn batcher() -> Batcher<TestBackend> {
        Batcher::new(10, NdArrayDevice::Cpu)
    }

    #[test]
    fn test_train_batch() {
        let items = vec![
            Example::new(vec![1, 2, 0], vec![1, 1, 0], 1),
            Example::new(vec![3, 0, 0], vec![1, 0, 0], 0),
        ];

        let batch = batcher().train(&items).unwrap();

        assert_eq!(batch.input.tokens.dims(), [2, 3]);
        assert_eq!(
            batch.input.tokens.into_data().convert::<i64>().value,
            vec![1, 2, 0, 3, 0, 0]
        );
        assert_eq!(
            batch.input.mask_pad.into_data().value,
            vec![false, false, true, false, true, true]
        );
        assert_eq!(batch.targets.into_data().convert::<i64>().value, vec![1, 0]);
    }

    #[test]
    fn test_single_item_batch() {
        let items = vec![Example::new(vec![4, 5], vec![1, 1], 0)];

        assert_eq!(batcher().train(&items).unwrap().targets.dims(), [1]);
    }

    #[test]
    fn test_sequence_length_mismatch() {
        let items = vec![
            Example::new(vec![1, 2], vec![1, 1], 1),
            Example::new(vec![1, 2, 3], vec![1, 1, 1], 0),
        ];

        assert_eq!(
            batcher().train(&items).err(),
            Some(ShapeError::SequenceLength {
                row: 1,
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn test_mask_length_mismatch() {
        let items = vec![Example::new(vec![1, 2], vec![1], 1)];

        assert_eq!(
            batcher().train(&items).err(),
            Some(ShapeError::MaskLength {
                row: 0,
                ids: 2,
                mask: 1
            })
        );
    }

    #[test]
    fn test_token_out_of_range() {
        let items = vec![Example::new(vec![1, 10], vec![1, 1], 1)];

        assert_eq!(
            batcher().train(&items).err(),
            Some(ShapeError::TokenOutOfRange {
                row: 0,
                token: 10,
                vocab_size: 10
            })
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(batcher().train(&[]).err(), Some(ShapeError::Empty));
    }
}
