// src/core/model/quantize.rs
//
// Post-training int8 quantization.
//
// Weights and biases use symmetric per-tensor scales (zero-point 0).
// Activations use asymmetric per-tensor ranges observed while pushing the
// calibration set through the float network. Matrix products accumulate in
// i32 and are requantized into the next layer's int8 domain.

use log::info;
use serde::{Deserialize, Serialize};

use super::network::{Activation, DenseLayer, FeedForwardNet};
use super::Classify;
use crate::classification::Label;
use crate::core::dsp::softmax;
use crate::core::features::FeatureVector;
use crate::error::{KwsError, Result};

const Q_MIN: i32 = i8::MIN as i32;
const Q_MAX: i32 = i8::MAX as i32;

/// Affine int8 mapping: `real = (q - zero_point) * scale`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantParams {
    pub scale: f32,
    pub zero_point: i32,
}

impl QuantParams {
    /// Range-based mapping for activations. The range is widened to contain
    /// zero so that 0.0 is exactly representable.
    pub fn asymmetric(min: f32, max: f32) -> Self {
        let min = min.min(0.0);
        let max = max.max(0.0);
        if max - min <= f32::EPSILON {
            return Self {
                scale: 1.0,
                zero_point: 0,
            };
        }
        let scale = (max - min) / (Q_MAX - Q_MIN) as f32;
        let zero_point = (Q_MIN as f32 - min / scale).round() as i32;
        Self {
            scale,
            zero_point: zero_point.clamp(Q_MIN, Q_MAX),
        }
    }

    /// Zero-centred mapping for weights and biases
    pub fn symmetric(max_abs: f32) -> Self {
        let scale = if max_abs > 0.0 {
            max_abs / Q_MAX as f32
        } else {
            1.0
        };
        Self {
            scale,
            zero_point: 0,
        }
    }

    pub fn for_tensor(values: &[f32]) -> Self {
        Self::symmetric(values.iter().fold(0.0f32, |m, v| m.max(v.abs())))
    }

    pub fn quantize(&self, value: f32) -> i8 {
        let q = (value / self.scale).round() as i32 + self.zero_point;
        q.clamp(Q_MIN, Q_MAX) as i8
    }

    pub fn dequantize(&self, q: i8) -> f32 {
        (q as i32 - self.zero_point) as f32 * self.scale
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizedLayer {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<i8>,
    pub weight_params: QuantParams,
    pub bias: Vec<i8>,
    pub bias_params: QuantParams,
    /// Mapping of this layer's output (post-ReLU for hidden layers, logits
    /// for the last one)
    pub output_params: QuantParams,
    pub activation: Activation,
}

impl QuantizedLayer {
    fn from_dense(layer: &DenseLayer, output_params: QuantParams) -> Self {
        let weight_params = QuantParams::for_tensor(&layer.weights);
        let bias_params = QuantParams::for_tensor(&layer.bias);
        Self {
            inputs: layer.inputs,
            outputs: layer.outputs,
            weights: layer.weights.iter().map(|&w| weight_params.quantize(w)).collect(),
            weight_params,
            bias: layer.bias.iter().map(|&b| bias_params.quantize(b)).collect(),
            bias_params,
            output_params,
            activation: layer.activation,
        }
    }

    /// Integer forward pass from `input_params` domain to `output_params`
    pub fn forward(&self, input: &[i8], input_params: QuantParams) -> Vec<i8> {
        let acc_scale = input_params.scale as f64 * self.weight_params.scale as f64;
        let multiplier = acc_scale / self.output_params.scale as f64;
        // ReLU in the quantized domain clamps at the code for 0.0
        let floor = match self.activation {
            Activation::Relu => self.output_params.zero_point.max(Q_MIN),
            Activation::Softmax => Q_MIN,
        };

        self.weights
            .chunks_exact(self.inputs)
            .zip(self.bias.iter())
            .map(|(row, &b)| {
                let bias_acc = (self.bias_params.dequantize(b) as f64 / acc_scale).round() as i32;
                let acc = row
                    .iter()
                    .zip(input.iter())
                    .fold(bias_acc, |acc, (&w, &x)| {
                        acc + w as i32 * (x as i32 - input_params.zero_point)
                    });
                let q = (acc as f64 * multiplier).round() as i32 + self.output_params.zero_point;
                q.clamp(floor, Q_MAX) as i8
            })
            .collect()
    }

    fn check(&self) -> Result<()> {
        if self.inputs == 0 || self.outputs == 0 {
            return Err(KwsError::invalid_input(format!(
                "quantized layer {}x{} has a zero dimension",
                self.outputs, self.inputs
            )));
        }
        if self.weights.len() != self.inputs * self.outputs || self.bias.len() != self.outputs {
            return Err(KwsError::invalid_input(format!(
                "quantized layer {}x{} has {} weights and {} biases",
                self.outputs,
                self.inputs,
                self.weights.len(),
                self.bias.len()
            )));
        }
        let scales = [
            self.weight_params.scale,
            self.bias_params.scale,
            self.output_params.scale,
        ];
        if scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(KwsError::invalid_input("quantized layer has a non-positive scale"));
        }
        Ok(())
    }
}

/// Int8 counterpart of [`FeedForwardNet`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizedNet {
    pub input_params: QuantParams,
    pub layers: Vec<QuantizedLayer>,
}

impl QuantizedNet {
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(KwsError::invalid_input("quantized network has no layers"));
        }
        for layer in &self.layers {
            layer.check()?;
        }
        for pair in self.layers.windows(2) {
            if pair[0].outputs != pair[1].inputs {
                return Err(KwsError::invalid_input("consecutive layer sizes do not chain"));
            }
        }
        let outputs = self.layers.last().map(|l| l.outputs).unwrap_or(0);
        if outputs != Label::COUNT {
            return Err(KwsError::invalid_input(format!(
                "quantized classifier has {outputs} outputs, expected {}",
                Label::COUNT
            )));
        }
        Ok(())
    }

    pub fn quantize_input(&self, features: &[f32]) -> Vec<i8> {
        features.iter().map(|&x| self.input_params.quantize(x)).collect()
    }

    /// Int8 output codes of the final layer
    pub fn forward_int8(&self, features: &[f32]) -> Vec<i8> {
        let mut x = self.quantize_input(features);
        let mut params = self.input_params;
        for layer in &self.layers {
            x = layer.forward(&x, params);
            params = layer.output_params;
        }
        x
    }

    /// Dequantized logits
    pub fn logits(&self, features: &[f32]) -> Vec<f32> {
        let out = self.forward_int8(features);
        match self.layers.last() {
            Some(last) => out.iter().map(|&q| last.output_params.dequantize(q)).collect(),
            None => Vec::new(),
        }
    }
}

impl Classify for QuantizedNet {
    fn input_dim(&self) -> usize {
        self.layers.first().map(|l| l.inputs).unwrap_or(0)
    }

    fn kind(&self) -> &'static str {
        "int8"
    }

    fn predict_probabilities(&self, features: &[f32]) -> Result<[f32; Label::COUNT]> {
        self.check_input(features)?;
        let probs = softmax(&self.logits(features));
        Ok([probs[0], probs[1], probs[2]])
    }
}

/// Running min/max of one activation tensor
#[derive(Debug, Clone, Copy)]
struct Range {
    min: f32,
    max: f32,
}

impl Range {
    fn new() -> Self {
        Self {
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
        }
    }

    fn observe(&mut self, values: &[f32]) {
        for &v in values {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
    }

    fn params(&self) -> QuantParams {
        QuantParams::asymmetric(self.min, self.max)
    }
}

/// Quantize `model` using activation ranges observed on `calibration`.
///
/// Deterministic: the same model and calibration set always give the same
/// quantized network.
pub fn quantize(model: &FeedForwardNet, calibration: &[FeatureVector]) -> Result<QuantizedNet> {
    model.validate()?;
    if calibration.is_empty() {
        return Err(KwsError::invalid_input("calibration set is empty"));
    }
    let input_dim = model.input_dim();
    if let Some(bad) = calibration.iter().find(|v| v.len() != input_dim) {
        return Err(KwsError::invalid_input(format!(
            "calibration vector has {} dims, model expects {input_dim}",
            bad.len()
        )));
    }

    let mut input_range = Range::new();
    let mut layer_ranges = vec![Range::new(); model.layers.len()];
    for sample in calibration {
        input_range.observe(sample);
        for (range, output) in layer_ranges.iter_mut().zip(model.trace(sample)) {
            range.observe(&output);
        }
    }

    let layers = model
        .layers
        .iter()
        .zip(layer_ranges.iter())
        .map(|(layer, range)| QuantizedLayer::from_dense(layer, range.params()))
        .collect();

    let net = QuantizedNet {
        input_params: input_range.params(),
        layers,
    };
    info!(
        "quantized {} layers from {} calibration samples",
        net.layers.len(),
        calibration.len()
    );
    Ok(net)
}

/// Side-by-side evaluation of the float and int8 classifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizationReport {
    pub evaluated: usize,
    /// Fraction of inputs where both classifiers pick the same label
    pub agreement: f32,
    pub disagreement_rate: f32,
    pub float_accuracy: f32,
    pub quantized_accuracy: f32,
    /// Validation accuracy the float model was accepted with
    pub reference_accuracy: f32,
}

impl QuantizationReport {
    /// Quantization may not add error beyond what training accepted, and
    /// decisions may flip on at most `max_disagreement` of the inputs
    pub fn passes_gate(&self, max_disagreement: f32) -> bool {
        self.agreement + 1e-6 >= self.reference_accuracy
            && self.disagreement_rate <= max_disagreement + 1e-6
    }
}

pub fn compare_decisions(
    float_model: &dyn Classify,
    quantized: &dyn Classify,
    features: &[FeatureVector],
    labels: &[Label],
    reference_accuracy: f32,
) -> Result<QuantizationReport> {
    if features.len() != labels.len() {
        return Err(KwsError::invalid_input(format!(
            "{} feature vectors but {} labels",
            features.len(),
            labels.len()
        )));
    }

    let mut agree = 0usize;
    let mut float_correct = 0usize;
    let mut quant_correct = 0usize;
    for (x, &y) in features.iter().zip(labels.iter()) {
        let a = float_model.classify(x)?.label;
        let b = quantized.classify(x)?.label;
        agree += (a == b) as usize;
        float_correct += (a == y) as usize;
        quant_correct += (b == y) as usize;
    }

    let n = features.len();
    let frac = |k: usize| if n == 0 { 1.0 } else { k as f32 / n as f32 };
    let report = QuantizationReport {
        evaluated: n,
        agreement: frac(agree),
        disagreement_rate: 1.0 - frac(agree),
        float_accuracy: frac(float_correct),
        quantized_accuracy: frac(quant_correct),
        reference_accuracy,
    };
    info!(
        "int8 agreement {:.3} over {} clips (float acc {:.3}, int8 acc {:.3})",
        report.agreement, n, report.float_accuracy, report.quantized_accuracy
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use crate::core::model::Trainer;
    use crate::testgen;

    #[test]
    fn test_zero_is_exact() {
        for (min, max) in [(-3.0, 5.0), (0.0, 10.0), (0.5, 2.0), (-4.0, -1.0)] {
            let p = QuantParams::asymmetric(min, max);
            assert_eq!(p.dequantize(p.quantize(0.0)), 0.0, "range {min}..{max}");
        }
    }

    #[test]
    fn test_asymmetric_covers_range() {
        let p = QuantParams::asymmetric(-1.0, 3.0);
        assert!((p.scale - 4.0 / 255.0).abs() < 1e-7);
        assert_eq!(p.quantize(-1.0), -128);
        assert_eq!(p.quantize(3.0), 127);
        assert_eq!(p.quantize(100.0), 127);
        assert!((p.dequantize(p.quantize(1.3)) - 1.3).abs() <= p.scale / 2.0 + 1e-6);
    }

    #[test]
    fn test_symmetric() {
        let p = QuantParams::for_tensor(&[0.5, -2.54, 1.0]);
        assert_eq!(p.zero_point, 0);
        assert_eq!(p.quantize(-2.54), -127);
        assert_eq!(p.quantize(0.0), 0);

        let zeros = QuantParams::for_tensor(&[0.0, 0.0]);
        assert_eq!(zeros.scale, 1.0);
    }

    #[test]
    fn test_layer_forward_matches_float() {
        let layer = DenseLayer {
            inputs: 2,
            outputs: 2,
            weights: vec![0.5, -0.25, 1.0, 0.75],
            bias: vec![0.1, -0.2],
            activation: Activation::Relu,
        };
        let input = [1.0, 2.0];
        let expected: Vec<f32> = layer.linear(&input).iter().map(|v| v.max(0.0)).collect();

        let in_params = QuantParams::asymmetric(0.0, 2.0);
        let out_params = QuantParams::asymmetric(0.0, 3.0);
        let q = QuantizedLayer::from_dense(&layer, out_params);
        let x: Vec<i8> = input.iter().map(|&v| in_params.quantize(v)).collect();
        let y = q.forward(&x, in_params);

        for (got, want) in y.iter().zip(expected.iter()) {
            assert!((out_params.dequantize(*got) - want).abs() < 0.05, "{got} vs {want}");
        }
    }

    #[test]
    fn test_quantized_net_agrees_with_float() {
        let (features, labels) = testgen::feature_clusters(40, 13, 3.0, 21);
        let config = TrainingConfig {
            epochs: 60,
            learning_rate: 0.01,
            ..Default::default()
        };
        let (net, report) = Trainer::new(&config).train(&features, &labels).unwrap();

        let calibration = &features[..features.len().min(100)];
        let qnet = quantize(&net, calibration).unwrap();
        assert!(qnet.validate().is_ok());
        assert_eq!(qnet.kind(), "int8");

        let cmp = compare_decisions(&net, &qnet, &features, &labels, report.validation_accuracy)
            .unwrap();
        assert!(cmp.disagreement_rate <= 0.05, "{cmp:?}");

        let p = qnet.predict_probabilities(&features[0]).unwrap();
        assert!((p.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_quantize_is_pure() {
        let (features, _) = testgen::feature_clusters(5, 13, 2.0, 3);
        let net = FeedForwardNet::new(13, [32, 32], 9);
        assert_eq!(quantize(&net, &features).unwrap(), quantize(&net, &features).unwrap());
    }

    #[test]
    fn test_quantize_rejects_bad_calibration() {
        let net = FeedForwardNet::new(13, [32, 32], 9);
        assert!(quantize(&net, &[]).is_err());
        assert!(quantize(&net, &[FeatureVector::new(vec![0.0; 4])]).is_err());
    }

    #[test]
    fn test_zero_width_layer_rejected() {
        let (features, _) = testgen::feature_clusters(5, 13, 2.0, 3);
        assert!(quantize(&FeedForwardNet::new(13, [0, 32], 9), &features).is_err());

        let mut qnet = quantize(&FeedForwardNet::new(13, [32, 32], 9), &features).unwrap();
        qnet.layers[0].outputs = 0;
        qnet.layers[0].weights.clear();
        qnet.layers[0].bias.clear();
        qnet.layers[1].inputs = 0;
        qnet.layers[1].weights.clear();
        assert!(matches!(qnet.validate(), Err(KwsError::InvalidInput(_))));
    }

    #[test]
    fn test_gate() {
        let mut report = QuantizationReport {
            evaluated: 100,
            agreement: 0.97,
            disagreement_rate: 0.03,
            float_accuracy: 0.9,
            quantized_accuracy: 0.9,
            reference_accuracy: 0.92,
        };
        assert!(report.passes_gate(0.05));

        report.reference_accuracy = 0.98;
        assert!(!report.passes_gate(0.05));

        report.reference_accuracy = 0.9;
        report.agreement = 0.93;
        report.disagreement_rate = 0.07;
        assert!(!report.passes_gate(0.05));
    }
}
