use burn::{
    module::Module,
    nn::{loss::CrossEntropyLossConfig, Dropout, Embedding, Linear},
    tensor::{
        activation::{relu, softmax},
        backend::Backend,
        Tensor,
    },
    train::ClassificationOutput,
};

use crate::pipelines::text_classification::{
    self,
    batcher::{Infer, Train},
};

/// Token embeddings averaged over the attention mask, followed by a two-layer classifier
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// Token embedding table
    pub embedding: Embedding<B>,

    /// Hidden classification layer
    pub hidden: Linear<B>,

    /// Linear layer producing class logits
    pub output: Linear<B>,

    /// Dropout applied before each linear layer while training
    pub dropout: Dropout,

    /// Total number of classes
    pub n_classes: usize,

    /// Number of rows in the embedding table
    pub vocab_size: usize,
}

impl<B: Backend> Model<B> {
    /// Class logits: [batch_size, n_classes]
    pub fn logits(&self, input: Infer<B>) -> Tensor<B, 2> {
        let [batch_size, seq_length] = input.tokens.dims();

        // 1.0 at real tokens, 0.0 at padding
        let weights = input
            .mask_pad
            .float()
            .neg()
            .add_scalar(1.0)
            .reshape([batch_size, seq_length, 1]);

        let embedded = self.embedding.forward(input.tokens);
        let [_, _, hidden_size] = embedded.dims();

        let summed = (embedded * weights.clone())
            .sum_dim(1)
            .reshape([batch_size, hidden_size]);
        let counts = weights
            .sum_dim(1)
            .reshape([batch_size, 1])
            .clamp_min(1.0);

        let pooled = summed / counts;

        let hidden = relu(self.hidden.forward(self.dropout.forward(pooled)));

        self.output.forward(self.dropout.forward(hidden))
    }
}

impl<B: Backend> text_classification::Model<B> for Model<B> {
    fn forward(&self, item: Train<B>) -> ClassificationOutput<B> {
        let targets = item.targets;
        let output = self.logits(item.input);

        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput {
            loss,
            output,
            targets,
        }
    }

    fn infer(&self, input: Infer<B>) -> Tensor<B, 2> {
        softmax(self.logits(input), 1)
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }
}
