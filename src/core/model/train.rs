// src/core/model/train.rs
//
// Mini-batch Adam on categorical cross-entropy with a stratified hold-out.

use log::{debug, info, warn};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::network::{Activation, FeedForwardNet};
use super::Classify;
use crate::classification::Label;
use crate::config::TrainingConfig;
use crate::core::dsp::softmax;
use crate::core::features::FeatureVector;
use crate::error::{KwsError, Result};

const ADAM_BETA1: f32 = 0.9;
const ADAM_BETA2: f32 = 0.999;
const ADAM_EPSILON: f32 = 1e-7;
/// Keeps `ln(p)` finite for confidently wrong predictions
const PROB_FLOOR: f32 = 1e-7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub loss: f32,
    pub accuracy: f32,
    pub val_loss: Option<f32>,
    pub val_accuracy: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs: Vec<EpochStats>,
    pub train_size: usize,
    pub validation_size: usize,
    /// Accuracy on the held-out split, or on the training split when the
    /// corpus was too small to hold anything out
    pub validation_accuracy: f32,
    pub validation_indices: Vec<usize>,
}

/// Split example indices into (train, validation), drawing the same share of
/// every label into validation. Deterministic for a given seed.
pub fn stratified_split(labels: &[Label], fraction: f32, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut by_label: BTreeMap<Label, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_label.entry(label).or_default().push(i);
    }

    let mut train = Vec::new();
    let mut validation = Vec::new();
    for indices in by_label.values_mut() {
        indices.shuffle(&mut rng);
        let n_val = ((indices.len() as f32 * fraction).round() as usize).min(indices.len());
        validation.extend_from_slice(&indices[..n_val]);
        train.extend_from_slice(&indices[n_val..]);
    }

    train.sort_unstable();
    validation.sort_unstable();
    (train, validation)
}

/// Share of examples whose argmax matches the label
pub fn accuracy(model: &dyn Classify, features: &[FeatureVector], labels: &[Label]) -> Result<f32> {
    if features.is_empty() {
        return Ok(0.0);
    }
    let mut correct = 0;
    for (x, &y) in features.iter().zip(labels.iter()) {
        if model.classify(x)?.label == y {
            correct += 1;
        }
    }
    Ok(correct as f32 / features.len() as f32)
}

/// Accumulated gradients and Adam moments for one layer
struct LayerState {
    grad_w: Vec<f32>,
    grad_b: Vec<f32>,
    m_w: Vec<f32>,
    v_w: Vec<f32>,
    m_b: Vec<f32>,
    v_b: Vec<f32>,
}

impl LayerState {
    fn new(weights: usize, biases: usize) -> Self {
        Self {
            grad_w: vec![0.0; weights],
            grad_b: vec![0.0; biases],
            m_w: vec![0.0; weights],
            v_w: vec![0.0; weights],
            m_b: vec![0.0; biases],
            v_b: vec![0.0; biases],
        }
    }

    fn zero_grad(&mut self) {
        self.grad_w.iter_mut().for_each(|g| *g = 0.0);
        self.grad_b.iter_mut().for_each(|g| *g = 0.0);
    }
}

fn adam_step(params: &mut [f32], grads: &[f32], m: &mut [f32], v: &mut [f32], lr: f32, scale: f32, step: i32) {
    let bias1 = 1.0 - ADAM_BETA1.powi(step);
    let bias2 = 1.0 - ADAM_BETA2.powi(step);
    for i in 0..params.len() {
        let g = grads[i] * scale;
        m[i] = ADAM_BETA1 * m[i] + (1.0 - ADAM_BETA1) * g;
        v[i] = ADAM_BETA2 * v[i] + (1.0 - ADAM_BETA2) * g * g;
        let m_hat = m[i] / bias1;
        let v_hat = v[i] / bias2;
        params[i] -= lr * m_hat / (v_hat.sqrt() + ADAM_EPSILON);
    }
}

pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: &TrainingConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Train on already-normalized features
    pub fn train(&self, features: &[FeatureVector], labels: &[Label]) -> Result<(FeedForwardNet, TrainingReport)> {
        if features.is_empty() {
            return Err(KwsError::Training("no training examples".into()));
        }
        if features.len() != labels.len() {
            return Err(KwsError::Training(format!(
                "{} feature vectors but {} labels",
                features.len(),
                labels.len()
            )));
        }
        self.config
            .validate()
            .map_err(|e| KwsError::Training(e.to_string()))?;

        let input_dim = features[0].len();
        if input_dim == 0 {
            return Err(KwsError::Training("feature vectors are empty".into()));
        }
        let mut net = FeedForwardNet::new(input_dim, self.config.hidden_units, self.config.seed);

        let (mut train_idx, val_idx) =
            stratified_split(labels, self.config.validation_fraction, self.config.seed);
        if train_idx.is_empty() {
            return Err(KwsError::Training(
                "validation split left no training examples".into(),
            ));
        }
        info!(
            "training on {} examples, validating on {}",
            train_idx.len(),
            val_idx.len()
        );

        let mut states: Vec<LayerState> = net
            .layers
            .iter()
            .map(|l| LayerState::new(l.weights.len(), l.bias.len()))
            .collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(1));
        let mut step = 0i32;
        let mut epochs = Vec::with_capacity(self.config.epochs);

        for epoch in 1..=self.config.epochs {
            train_idx.shuffle(&mut rng);
            let mut loss_sum = 0.0;
            let mut correct = 0usize;

            for batch in train_idx.chunks(self.config.batch_size) {
                states.iter_mut().for_each(LayerState::zero_grad);
                for &i in batch {
                    let (loss, hit) = backprop(&net, &features[i], labels[i], &mut states);
                    loss_sum += loss;
                    correct += hit as usize;
                }

                step += 1;
                let scale = 1.0 / batch.len() as f32;
                for (layer, state) in net.layers.iter_mut().zip(states.iter_mut()) {
                    adam_step(&mut layer.weights, &state.grad_w, &mut state.m_w, &mut state.v_w, self.config.learning_rate, scale, step);
                    adam_step(&mut layer.bias, &state.grad_b, &mut state.m_b, &mut state.v_b, self.config.learning_rate, scale, step);
                }
            }

            let (val_loss, val_accuracy) = if val_idx.is_empty() {
                (None, None)
            } else {
                let (l, a) = evaluate_subset(&net, features, labels, &val_idx);
                (Some(l), Some(a))
            };
            let stats = EpochStats {
                epoch,
                loss: loss_sum / train_idx.len() as f32,
                accuracy: correct as f32 / train_idx.len() as f32,
                val_loss,
                val_accuracy,
            };
            debug!(
                "epoch {}/{}: loss {:.4} acc {:.3} val_loss {:?} val_acc {:?}",
                epoch, self.config.epochs, stats.loss, stats.accuracy, stats.val_loss, stats.val_accuracy
            );
            epochs.push(stats);
        }

        let validation_accuracy = if val_idx.is_empty() {
            warn!("corpus too small for a validation split; reporting training accuracy");
            evaluate_subset(&net, features, labels, &train_idx).1
        } else {
            evaluate_subset(&net, features, labels, &val_idx).1
        };
        info!("Validation accuracy: {validation_accuracy:.4}");

        let report = TrainingReport {
            epochs,
            train_size: train_idx.len(),
            validation_size: val_idx.len(),
            validation_accuracy,
            validation_indices: val_idx,
        };
        Ok((net, report))
    }
}

/// Mean loss and accuracy over a subset of examples
fn evaluate_subset(net: &FeedForwardNet, features: &[FeatureVector], labels: &[Label], indices: &[usize]) -> (f32, f32) {
    let mut loss = 0.0;
    let mut correct = 0;
    for &i in indices {
        let probs = softmax(&net.logits(&features[i]));
        let y = labels[i].index();
        loss -= probs[y].max(PROB_FLOOR).ln();
        if crate::core::dsp::argmax(&probs) == y {
            correct += 1;
        }
    }
    let n = indices.len().max(1) as f32;
    (loss / n, correct as f32 / n)
}

/// Accumulate gradients of one example; returns its loss and whether the
/// prediction was correct
fn backprop(net: &FeedForwardNet, x: &[f32], label: Label, states: &mut [LayerState]) -> (f32, bool) {
    let trace = net.trace(x);
    let probs = softmax(trace.last().map(Vec::as_slice).unwrap_or_default());
    let y = label.index();
    let loss = -probs[y].max(PROB_FLOOR).ln();
    let hit = crate::core::dsp::argmax(&probs) == y;

    // Softmax + cross-entropy: dL/dz = p - onehot
    let mut delta = probs;
    delta[y] -= 1.0;

    for l in (0..net.layers.len()).rev() {
        let layer = &net.layers[l];
        let input: &[f32] = if l == 0 { x } else { &trace[l - 1] };
        let state = &mut states[l];

        for (o, &d) in delta.iter().enumerate() {
            let row = &mut state.grad_w[o * layer.inputs..(o + 1) * layer.inputs];
            for (g, &a) in row.iter_mut().zip(input.iter()) {
                *g += d * a;
            }
            state.grad_b[o] += d;
        }

        if l > 0 {
            debug_assert_eq!(net.layers[l - 1].activation, Activation::Relu);
            delta = layer
                .backward_input(&delta)
                .into_iter()
                .zip(input.iter())
                .map(|(g, &a)| if a > 0.0 { g } else { 0.0 })
                .collect();
        }
    }

    (loss, hit)
}
