//! Translation of block trees into external model representations.

use crate::compute::layers::Layer;
use crate::schema::Shape;

use super::Block;

/// Consumer of a block tree walked in execution order.
///
/// Implementations translate layers into a framework's tensors; the block
/// tree only decides order and where shortcut paths are merged.
pub trait ModelBuilder {
    type Tensor: Clone;

    /// Apply `layer` to `input`, whose shape is `input_shape`.
    fn layer(&mut self, layer: &Layer, input_shape: &Shape, input: Self::Tensor) -> Self::Tensor;

    /// Merge a shortcut with the output of the path it skipped. Both have the
    /// same shape.
    fn combine(&mut self, shortcut: Self::Tensor, path: Self::Tensor) -> Self::Tensor;
}

impl Block {
    /// Walk the subtree, feeding `input` through every layer.
    pub fn build<B: ModelBuilder>(&self, builder: &mut B, input: B::Tensor) -> B::Tensor {
        if let Some(layer) = &self.layer {
            return builder.layer(layer, &self.input_shape, input);
        }
        let mut tensor = input.clone();
        for child in self.children() {
            tensor = child.build(builder, tensor);
        }
        if self.kind.combines_input() {
            tensor = builder.combine(input, tensor);
        }
        tensor
    }
}

/// Builder that only counts trainable parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterCounter {
    pub total: u64,
}

impl ParameterCounter {
    /// Trainable parameters of a whole tree.
    pub fn count(block: &Block) -> u64 {
        let mut counter = Self::default();
        block.build(&mut counter, ());
        counter.total
    }
}

impl ModelBuilder for ParameterCounter {
    type Tensor = ();

    fn layer(&mut self, layer: &Layer, input_shape: &Shape, _input: ()) {
        self.total = self.total.saturating_add(layer.parameter_count(input_shape));
    }

    fn combine(&mut self, _shortcut: (), _path: ()) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::blocks::{BlockKind, ResidualBlock};
    use crate::compute::layers::{Activation, Conv2DArgs, DenseArgs, Padding};

    /// Records the order layers are visited in.
    #[derive(Default)]
    struct Trace {
        steps: Vec<String>,
    }

    impl ModelBuilder for Trace {
        type Tensor = usize;

        fn layer(&mut self, layer: &Layer, _input_shape: &Shape, input: usize) -> usize {
            self.steps.push(layer.layer_type().name().to_string());
            input + 1
        }

        fn combine(&mut self, shortcut: usize, path: usize) -> usize {
            self.steps.push(format!("add({shortcut},{path})"));
            path
        }
    }

    fn residual() -> Block {
        let input = Shape::from([8, 8, 4]);
        let conv = Layer::Conv2D(Conv2DArgs {
            filters: 4,
            kernel_size: (3, 3),
            strides: (1, 1),
            padding: Padding::Same,
            dilation_rate: (1, 1),
            activation: Activation::Relu,
        });
        let mut block = Block::empty(BlockKind::Residual(ResidualBlock), input.clone());
        block.middle_blocks.push(Block::leaf(conv, input));
        block.reindex();
        block
    }

    #[test]
    fn test_residual_combines_after_path() {
        let block = residual();
        let mut trace = Trace::default();
        let out = block.build(&mut trace, 0);
        assert_eq!(out, 1);
        assert_eq!(trace.steps, vec!["Conv2D".to_string(), "add(0,1)".to_string()]);
    }

    #[test]
    fn test_parameter_counter() {
        assert_eq!(ParameterCounter::count(&residual()), 3 * 3 * 4 * 4 + 4);

        let dense = Block::leaf(
            Layer::Dense(DenseArgs {
                units: 10,
                activation: Activation::Softmax,
            }),
            Shape::from([20]),
        );
        assert_eq!(ParameterCounter::count(&dense), 210);
    }
}
