// src/core/model/network.rs
//
// Full-precision feed-forward classifier.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::Classify;
use crate::classification::Label;
use crate::core::dsp::softmax;
use crate::error::{KwsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Softmax,
}

/// Fully connected layer, weights stored row-major as `outputs x inputs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
    pub activation: Activation,
}

impl DenseLayer {
    /// Glorot-uniform weights and zero biases
    pub fn glorot(inputs: usize, outputs: usize, activation: Activation, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (inputs + outputs) as f32).sqrt();
        let weights = (0..inputs * outputs)
            .map(|_| rng.gen_range(-limit..limit))
            .collect();
        Self {
            inputs,
            outputs,
            weights,
            bias: vec![0.0; outputs],
            activation,
        }
    }

    /// `W x + b`, before the activation
    pub fn linear(&self, input: &[f32]) -> Vec<f32> {
        self.weights
            .chunks_exact(self.inputs)
            .zip(self.bias.iter())
            .map(|(row, &b)| row.iter().zip(input.iter()).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect()
    }

    /// `W^T delta`: gradient with respect to this layer's input
    pub fn backward_input(&self, delta: &[f32]) -> Vec<f32> {
        let mut grad = vec![0.0; self.inputs];
        for (row, &d) in self.weights.chunks_exact(self.inputs).zip(delta.iter()) {
            for (g, &w) in grad.iter_mut().zip(row.iter()) {
                *g += w * d;
            }
        }
        grad
    }

    fn check(&self) -> Result<()> {
        if self.inputs == 0 || self.outputs == 0 {
            return Err(KwsError::invalid_input(format!(
                "dense layer {}x{} has a zero dimension",
                self.outputs, self.inputs
            )));
        }
        if self.weights.len() != self.inputs * self.outputs || self.bias.len() != self.outputs {
            return Err(KwsError::invalid_input(format!(
                "dense layer {}x{} has {} weights and {} biases",
                self.outputs,
                self.inputs,
                self.weights.len(),
                self.bias.len()
            )));
        }
        Ok(())
    }
}

/// `input -> Dense(ReLU) -> Dense(ReLU) -> Dense(softmax)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedForwardNet {
    pub layers: Vec<DenseLayer>,
}

impl FeedForwardNet {
    pub fn new(input_dim: usize, hidden: [usize; 2], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let layers = vec![
            DenseLayer::glorot(input_dim, hidden[0], Activation::Relu, &mut rng),
            DenseLayer::glorot(hidden[0], hidden[1], Activation::Relu, &mut rng),
            DenseLayer::glorot(hidden[1], Label::COUNT, Activation::Softmax, &mut rng),
        ];
        Self { layers }
    }

    /// Check that a loaded network has the fixed topology
    pub fn validate(&self) -> Result<()> {
        if self.layers.len() != 3 {
            return Err(KwsError::invalid_input(format!(
                "expected 3 dense layers, found {}",
                self.layers.len()
            )));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            layer.check()?;
            let expected = if i + 1 == self.layers.len() {
                Activation::Softmax
            } else {
                Activation::Relu
            };
            if layer.activation != expected {
                return Err(KwsError::invalid_input(format!(
                    "layer {i} uses {:?}, expected {expected:?}",
                    layer.activation
                )));
            }
        }
        for pair in self.layers.windows(2) {
            if pair[0].outputs != pair[1].inputs {
                return Err(KwsError::invalid_input("consecutive layer sizes do not chain"));
            }
        }
        if self.output_dim() != Label::COUNT {
            return Err(KwsError::invalid_input(format!(
                "classifier has {} outputs, expected {}",
                self.output_dim(),
                Label::COUNT
            )));
        }
        Ok(())
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map(|l| l.outputs).unwrap_or(0)
    }

    /// Output of every layer: ReLU activations for hidden layers, raw logits
    /// for the final one (softmax is applied separately)
    pub fn trace(&self, input: &[f32]) -> Vec<Vec<f32>> {
        let mut outputs: Vec<Vec<f32>> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let x = outputs.last().map(Vec::as_slice).unwrap_or(input);
            let mut z = layer.linear(x);
            if layer.activation == Activation::Relu {
                z.iter_mut().for_each(|v| *v = v.max(0.0));
            }
            outputs.push(z);
        }
        outputs
    }

    pub fn logits(&self, input: &[f32]) -> Vec<f32> {
        self.trace(input).pop().unwrap_or_default()
    }
}

impl Classify for FeedForwardNet {
    fn input_dim(&self) -> usize {
        self.layers.first().map(|l| l.inputs).unwrap_or(0)
    }

    fn kind(&self) -> &'static str {
        "float32"
    }

    fn predict_probabilities(&self, features: &[f32]) -> Result<[f32; Label::COUNT]> {
        self.check_input(features)?;
        let probs = softmax(&self.logits(features));
        Ok([probs[0], probs[1], probs[2]])
    }
}
