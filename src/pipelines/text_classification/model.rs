use burn::{
    module::Module,
    tensor::{backend::Backend, Tensor},
    train::ClassificationOutput,
};

use super::batcher::{Infer, Train};

/// A trait for models that can be fine-tuned and served by the text classification pipeline
pub trait Model<B: Backend>: Module<B> {
    /// Perform a forward pass, returning logits, targets and the cross-entropy loss
    fn forward(&self, item: Train<B>) -> ClassificationOutput<B>;

    /// Defines forward pass for inference, returning class probabilities
    fn infer(&self, input: Infer<B>) -> Tensor<B, 2>;

    /// The number of token ids the model can embed
    fn vocab_size(&self) -> usize;
}
