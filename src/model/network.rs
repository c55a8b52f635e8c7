//! Dense feed-forward network: ReLU/sigmoid/softmax layers, inverted dropout during
//! training, Adam updates. Inference never applies dropout, so predictions are deterministic.

use crate::error::{EngineError, Result};
use ndarray::{Array1, Array2, Axis, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const PROB_EPSILON: f32 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Sigmoid,
    Softmax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    CategoricalCrossEntropy,
    MeanSquaredError,
}

/// One dense layer; `dropout` is applied to its output while training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub units: usize,
    pub activation: Activation,
    #[serde(default)]
    pub dropout: f32,
}

impl LayerSpec {
    pub const fn dense(units: usize, activation: Activation) -> Self {
        Self {
            units,
            activation,
            dropout: 0.0,
        }
    }

    pub const fn with_dropout(mut self, rate: f32) -> Self {
        self.dropout = rate;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub input: usize,
    pub layers: Vec<LayerSpec>,
    pub loss: Loss,
}

impl Architecture {
    /// 10 → dense(64, relu) → dropout(0.3) → dense(32, relu) → dense(4, softmax)
    pub fn learning_style() -> Self {
        Self {
            input: 10,
            layers: vec![
                LayerSpec::dense(64, Activation::Relu).with_dropout(0.3),
                LayerSpec::dense(32, Activation::Relu),
                LayerSpec::dense(4, Activation::Softmax),
            ],
            loss: Loss::CategoricalCrossEntropy,
        }
    }

    /// 5 → dense(32, relu) → dropout(0.2) → dense(16, relu) → dense(1, sigmoid)
    pub fn difficulty() -> Self {
        Self {
            input: 5,
            layers: vec![
                LayerSpec::dense(32, Activation::Relu).with_dropout(0.2),
                LayerSpec::dense(16, Activation::Relu),
                LayerSpec::dense(1, Activation::Sigmoid),
            ],
            loss: Loss::MeanSquaredError,
        }
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map(|l| l.units).unwrap_or(self.input)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input == 0 || self.layers.is_empty() {
            return Err(EngineError::ModelUnavailable(
                "architecture needs an input and at least one layer".into(),
            ));
        }
        let last = self.layers.len() - 1;
        for (i, l) in self.layers.iter().enumerate() {
            if l.units == 0 || !(0.0..1.0).contains(&l.dropout) {
                return Err(EngineError::ModelUnavailable(format!("layer {i} is malformed")));
            }
            if l.activation == Activation::Softmax && i != last {
                return Err(EngineError::ModelUnavailable(
                    "softmax is only supported on the output layer".into(),
                ));
            }
        }
        let out = self.layers[last].activation;
        if self.loss == Loss::CategoricalCrossEntropy && out != Activation::Softmax {
            return Err(EngineError::ModelUnavailable(
                "categorical cross-entropy requires a softmax output".into(),
            ));
        }
        Ok(())
    }
}

/// Serialized parameters (artifact payload). Weight matrices are row-major `[units, fan_in]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkWeights {
    pub architecture: Architecture,
    pub layers: Vec<LayerWeights>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerWeights {
    pub w: Vec<f32>,
    pub b: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_split: f32,
    pub learning_rate: f32,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub loss: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub val_loss: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitHistory {
    pub train_samples: usize,
    pub validation_samples: usize,
    pub epochs: Vec<EpochStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub loss: f32,
    pub mean_absolute_error: f32,
    /// Argmax agreement for classifiers
    pub accuracy: f32,
}

#[derive(Debug, Clone)]
struct Dense {
    w: Array2<f32>,
    b: Array1<f32>,
    activation: Activation,
    dropout: f32,
}

struct LayerCache {
    input: Array1<f32>,
    z: Array1<f32>,
    /// Post-activation, before dropout
    activated: Array1<f32>,
    mask: Option<Array1<f32>>,
}

struct Gradients {
    w: Vec<Array2<f32>>,
    b: Vec<Array1<f32>>,
}

struct Adam {
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    m_w: Vec<Array2<f32>>,
    v_w: Vec<Array2<f32>>,
    m_b: Vec<Array1<f32>>,
    v_b: Vec<Array1<f32>>,
    t: i32,
}

#[derive(Debug, Clone)]
pub struct Network {
    architecture: Architecture,
    layers: Vec<Dense>,
}

impl Network {
    /// Fresh network with seeded He-style uniform initialization.
    pub fn new(architecture: Architecture, seed: u64) -> Result<Self> {
        architecture.validate()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut fan_in = architecture.input;
        let mut layers = Vec::with_capacity(architecture.layers.len());
        for spec in &architecture.layers {
            let scale = (2.0 / fan_in as f32).sqrt();
            let w = Array2::from_shape_fn((spec.units, fan_in), |_| {
                (rng.gen::<f32>() - 0.5) * 2.0 * scale
            });
            layers.push(Dense {
                w,
                b: Array1::zeros(spec.units),
                activation: spec.activation,
                dropout: spec.dropout,
            });
            fan_in = spec.units;
        }
        Ok(Self {
            architecture,
            layers,
        })
    }

    pub fn from_weights(weights: NetworkWeights) -> Result<Self> {
        let NetworkWeights {
            architecture,
            layers: stored,
        } = weights;
        architecture.validate()?;
        if stored.len() != architecture.layers.len() {
            return Err(EngineError::ModelUnavailable(format!(
                "artifact has {} layers, architecture declares {}",
                stored.len(),
                architecture.layers.len()
            )));
        }
        let mut fan_in = architecture.input;
        let mut layers = Vec::with_capacity(stored.len());
        for (i, (spec, lw)) in architecture.layers.iter().zip(stored).enumerate() {
            let w = Array2::from_shape_vec((spec.units, fan_in), lw.w).map_err(|e| {
                EngineError::ModelUnavailable(format!("layer {i} weights: {e}"))
            })?;
            if lw.b.len() != spec.units {
                return Err(EngineError::ModelUnavailable(format!(
                    "layer {i} bias has {} values, expected {}",
                    lw.b.len(),
                    spec.units
                )));
            }
            if w.iter().chain(lw.b.iter()).any(|v| !v.is_finite()) {
                return Err(EngineError::ModelUnavailable(format!(
                    "layer {i} has non-finite parameters"
                )));
            }
            layers.push(Dense {
                w,
                b: Array1::from_vec(lw.b),
                activation: spec.activation,
                dropout: spec.dropout,
            });
            fan_in = spec.units;
        }
        Ok(Self {
            architecture,
            layers,
        })
    }

    pub fn weights(&self) -> NetworkWeights {
        NetworkWeights {
            architecture: self.architecture.clone(),
            layers: self
                .layers
                .iter()
                .map(|l| LayerWeights {
                    w: l.w.iter().copied().collect(),
                    b: l.b.to_vec(),
                })
                .collect(),
        }
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    /// Inference pass (no dropout).
    pub fn forward(&self, input: &[f32]) -> Result<Vec<f32>> {
        self.check_input(input)?;
        let mut a = Array1::from_vec(input.to_vec());
        for layer in &self.layers {
            let z = layer.w.dot(&a) + &layer.b;
            a = activate(&z, layer.activation);
        }
        Ok(a.to_vec())
    }

    /// Mini-batch Adam. The last `validation_split` fraction of the samples is held out.
    pub fn fit(&mut self, xs: &[Vec<f32>], ys: &[Vec<f32>], options: FitOptions) -> Result<FitHistory> {
        self.check_dataset(xs, ys)?;
        if options.epochs == 0 || options.batch_size == 0 {
            return Err(EngineError::invalid("epochs and batch size must be positive"));
        }
        let split = if options.validation_split.is_finite() {
            options.validation_split.clamp(0.0, 0.9)
        } else {
            0.0
        };
        let n = xs.len();
        let n_train = (n - (n as f32 * split) as usize).max(1);
        let train: Vec<usize> = (0..n_train).collect();
        let validation: Vec<usize> = (n_train..n).collect();

        let mut rng = StdRng::seed_from_u64(options.seed);
        let mut adam = Adam::new(&self.layers);
        let mut history = FitHistory {
            train_samples: train.len(),
            validation_samples: validation.len(),
            epochs: Vec::with_capacity(options.epochs),
        };

        let mut order = train.clone();
        for epoch in 0..options.epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;
            for batch in order.chunks(options.batch_size) {
                let mut grads = Gradients::zeros(&self.layers);
                for &i in batch {
                    epoch_loss += self.backprop(&xs[i], &ys[i], &mut grads, &mut rng);
                }
                grads.scale(1.0 / batch.len() as f32);
                adam.step(&mut self.layers, &grads, options.learning_rate);
            }
            let loss = epoch_loss / train.len() as f32;
            let val_loss = if validation.is_empty() {
                None
            } else {
                Some(self.mean_loss(xs, ys, &validation))
            };
            tracing::debug!(epoch, loss, ?val_loss, "epoch complete");
            history.epochs.push(EpochStats {
                epoch,
                loss,
                val_loss,
            });
        }
        Ok(history)
    }

    pub fn evaluate(&self, xs: &[Vec<f32>], ys: &[Vec<f32>]) -> Result<Evaluation> {
        self.check_dataset(xs, ys)?;
        let mut loss = 0.0;
        let mut abs_err = 0.0;
        let mut hits = 0usize;
        for (x, y) in xs.iter().zip(ys) {
            let out = Array1::from_vec(self.forward(x)?);
            let target = Array1::from_vec(y.clone());
            loss += sample_loss(&out, &target, self.architecture.loss);
            abs_err += (&out - &target).mapv(f32::abs).mean().unwrap_or(0.0);
            if argmax(&out) == argmax(&target) {
                hits += 1;
            }
        }
        let n = xs.len() as f32;
        Ok(Evaluation {
            loss: loss / n,
            mean_absolute_error: abs_err / n,
            accuracy: hits as f32 / n,
        })
    }

    fn mean_loss(&self, xs: &[Vec<f32>], ys: &[Vec<f32>], idx: &[usize]) -> f32 {
        let total: f32 = idx
            .iter()
            .map(|&i| {
                let out = self.forward(&xs[i]).map(Array1::from_vec);
                match out {
                    Ok(out) => sample_loss(&out, &Array1::from_vec(ys[i].clone()), self.architecture.loss),
                    Err(_) => 0.0,
                }
            })
            .sum();
        total / idx.len().max(1) as f32
    }

    /// Accumulates the gradient of one sample into `grads`; returns its loss.
    fn backprop(&self, x: &[f32], y: &[f32], grads: &mut Gradients, rng: &mut StdRng) -> f32 {
        let mut caches: Vec<LayerCache> = Vec::with_capacity(self.layers.len());
        let mut a = Array1::from_vec(x.to_vec());
        for layer in &self.layers {
            let z = layer.w.dot(&a) + &layer.b;
            let activated = activate(&z, layer.activation);
            let mask = (layer.dropout > 0.0).then(|| {
                let keep = 1.0 - layer.dropout;
                Array1::from_shape_fn(activated.len(), |_| {
                    if rng.gen::<f32>() < layer.dropout {
                        0.0
                    } else {
                        1.0 / keep
                    }
                })
            });
            let out = match &mask {
                Some(m) => &activated * m,
                None => activated.clone(),
            };
            caches.push(LayerCache {
                input: a,
                z,
                activated,
                mask,
            });
            a = out;
        }

        let target = Array1::from_vec(y.to_vec());
        let loss = sample_loss(&a, &target, self.architecture.loss);

        let last = self.layers.len() - 1;
        let mut da = match self.architecture.loss {
            Loss::CategoricalCrossEntropy => None,
            Loss::MeanSquaredError => Some((&a - &target) * (2.0 / target.len() as f32)),
        };
        for l in (0..=last).rev() {
            let cache = &caches[l];
            let layer = &self.layers[l];
            let delta = match da.take() {
                // softmax + cross-entropy at the output layer
                None => &a - &target,
                Some(mut upstream) => {
                    if let Some(m) = &cache.mask {
                        upstream = upstream * m;
                    }
                    upstream * derivative(&cache.z, &cache.activated, layer.activation)
                }
            };
            let outer = delta
                .view()
                .insert_axis(Axis(1))
                .dot(&cache.input.view().insert_axis(Axis(0)));
            grads.w[l] += &outer;
            grads.b[l] += &delta;
            if l > 0 {
                da = Some(layer.w.t().dot(&delta));
            }
        }
        loss
    }

    fn check_input(&self, input: &[f32]) -> Result<()> {
        if input.len() != self.architecture.input {
            return Err(EngineError::invalid(format!(
                "network expects {} inputs, got {}",
                self.architecture.input,
                input.len()
            )));
        }
        Ok(())
    }

    fn check_dataset(&self, xs: &[Vec<f32>], ys: &[Vec<f32>]) -> Result<()> {
        if xs.is_empty() {
            return Err(EngineError::invalid("dataset is empty"));
        }
        if xs.len() != ys.len() {
            return Err(EngineError::invalid("features and labels differ in length"));
        }
        let out = self.architecture.output_dim();
        for (x, y) in xs.iter().zip(ys) {
            self.check_input(x)?;
            if y.len() != out {
                return Err(EngineError::invalid(format!(
                    "labels need {out} values, got {}",
                    y.len()
                )));
            }
        }
        Ok(())
    }
}

impl Gradients {
    fn zeros(layers: &[Dense]) -> Self {
        Self {
            w: layers.iter().map(|l| Array2::zeros(l.w.dim())).collect(),
            b: layers.iter().map(|l| Array1::zeros(l.b.len())).collect(),
        }
    }

    fn scale(&mut self, factor: f32) {
        for w in &mut self.w {
            *w *= factor;
        }
        for b in &mut self.b {
            *b *= factor;
        }
    }
}

impl Adam {
    fn new(layers: &[Dense]) -> Self {
        let zeros = Gradients::zeros(layers);
        Self {
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            m_w: zeros.w.clone(),
            v_w: zeros.w,
            m_b: zeros.b.clone(),
            v_b: zeros.b,
            t: 0,
        }
    }

    fn step(&mut self, layers: &mut [Dense], grads: &Gradients, lr: f32) {
        self.t += 1;
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        let bc1 = 1.0 - b1.powi(self.t);
        let bc2 = 1.0 - b2.powi(self.t);
        for (i, layer) in layers.iter_mut().enumerate() {
            Zip::from(&mut layer.w)
                .and(&mut self.m_w[i])
                .and(&mut self.v_w[i])
                .and(&grads.w[i])
                .for_each(|p, m, v, &g| {
                    *m = b1 * *m + (1.0 - b1) * g;
                    *v = b2 * *v + (1.0 - b2) * g * g;
                    *p -= lr * (*m / bc1) / ((*v / bc2).sqrt() + eps);
                });
            Zip::from(&mut layer.b)
                .and(&mut self.m_b[i])
                .and(&mut self.v_b[i])
                .and(&grads.b[i])
                .for_each(|p, m, v, &g| {
                    *m = b1 * *m + (1.0 - b1) * g;
                    *v = b2 * *v + (1.0 - b2) * g * g;
                    *p -= lr * (*m / bc1) / ((*v / bc2).sqrt() + eps);
                });
        }
    }
}

fn activate(z: &Array1<f32>, activation: Activation) -> Array1<f32> {
    match activation {
        Activation::Relu => z.mapv(|v| v.max(0.0)),
        Activation::Sigmoid => z.mapv(|v| 1.0 / (1.0 + (-v).exp())),
        Activation::Softmax => {
            let max = z.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let exp = z.mapv(|v| (v - max).exp());
            let sum = exp.sum();
            exp / sum
        }
    }
}

/// d(activation)/dz, elementwise. Softmax never reaches here (handled with the loss).
fn derivative(z: &Array1<f32>, activated: &Array1<f32>, activation: Activation) -> Array1<f32> {
    match activation {
        Activation::Relu => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
        Activation::Sigmoid => activated.mapv(|s| s * (1.0 - s)),
        Activation::Softmax => Array1::ones(z.len()),
    }
}

fn sample_loss(out: &Array1<f32>, target: &Array1<f32>, loss: Loss) -> f32 {
    match loss {
        Loss::CategoricalCrossEntropy => -out
            .iter()
            .zip(target.iter())
            .map(|(p, y)| y * p.clamp(PROB_EPSILON, 1.0).ln())
            .sum::<f32>(),
        Loss::MeanSquaredError => (out - target).mapv(|d| d * d).mean().unwrap_or(0.0),
    }
}

fn argmax(v: &Array1<f32>) -> usize {
    v.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, &x)| if x > best.1 { (i, x) } else { best })
        .0
}
