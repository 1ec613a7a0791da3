// ABOUTME: Next-exercise sequence model: embedding, bidirectional GRU, attention pooling, projection
// ABOUTME: Pure ndarray inference over loaded or seeded weights producing a catalog-wide distribution
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::weights::{
    from_matrix, to_matrix, to_vector, uniform_matrix, uniform_vector, DenseFile, GruFile,
    SequenceWeightsFile,
};
use ndarray::{concatenate, s, Array1, Array2, ArrayView1, Axis};
use pierre_coach_core::errors::AppResult;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Numerically stable softmax
#[must_use]
pub fn softmax(logits: ArrayView1<'_, f64>) -> Array1<f64> {
    let max = logits.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
    if !max.is_finite() {
        return Array1::zeros(logits.len());
    }
    let exp = logits.mapv(|v| (v - max).exp());
    let total = exp.sum();
    exp / total
}

/// One direction of a gated recurrent unit
#[derive(Debug, Clone)]
struct GruDirection {
    w_ih: Array2<f64>,
    w_hh: Array2<f64>,
    b_ih: Array1<f64>,
    b_hh: Array1<f64>,
    hidden: usize,
}

impl GruDirection {
    fn from_file(file: &GruFile, input: usize, hidden: usize, name: &str) -> AppResult<Self> {
        Ok(Self {
            w_ih: to_matrix(&file.w_ih, (3 * hidden, input), &format!("{name}.w_ih"))?,
            w_hh: to_matrix(&file.w_hh, (3 * hidden, hidden), &format!("{name}.w_hh"))?,
            b_ih: to_vector(&file.b_ih, 3 * hidden, &format!("{name}.b_ih"))?,
            b_hh: to_vector(&file.b_hh, 3 * hidden, &format!("{name}.b_hh"))?,
            hidden,
        })
    }

    fn random(rng: &mut ChaCha8Rng, input: usize, hidden: usize) -> Self {
        let bound = 1.0 / (hidden.max(1) as f64).sqrt();
        Self {
            w_ih: uniform_matrix(rng, (3 * hidden, input), bound),
            w_hh: uniform_matrix(rng, (3 * hidden, hidden), bound),
            b_ih: uniform_vector(rng, 3 * hidden, bound),
            b_hh: uniform_vector(rng, 3 * hidden, bound),
            hidden,
        }
    }

    fn to_file(&self) -> GruFile {
        GruFile {
            w_ih: from_matrix(&self.w_ih),
            w_hh: from_matrix(&self.w_hh),
            b_ih: self.b_ih.to_vec(),
            b_hh: self.b_hh.to_vec(),
        }
    }

    fn step(&self, x: ArrayView1<'_, f64>, h: &Array1<f64>) -> Array1<f64> {
        let gi = self.w_ih.dot(&x) + &self.b_ih;
        let gh = self.w_hh.dot(h) + &self.b_hh;
        let n = self.hidden;

        let r = (&gi.slice(s![0..n]) + &gh.slice(s![0..n])).mapv(sigmoid);
        let z = (&gi.slice(s![n..2 * n]) + &gh.slice(s![n..2 * n])).mapv(sigmoid);
        let candidate =
            (&gi.slice(s![2 * n..3 * n]) + &(&r * &gh.slice(s![2 * n..3 * n]))).mapv(f64::tanh);

        let keep = z.mapv(|gate| 1.0 - gate);
        &keep * &candidate + &z * h
    }

    /// Hidden state after each step, in input order
    fn run<'a, I>(&self, steps: I, len: usize) -> Vec<Array1<f64>>
    where
        I: Iterator<Item = ArrayView1<'a, f64>>,
    {
        let mut h = Array1::zeros(self.hidden);
        let mut outputs = Vec::with_capacity(len);
        for x in steps {
            h = self.step(x, &h);
            outputs.push(h.clone());
        }
        outputs
    }
}

/// Two-layer perceptron `w2 · act(w1 · x + b1) + b2`
#[derive(Debug, Clone)]
struct Dense {
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array2<f64>,
    b2: Array1<f64>,
}

impl Dense {
    fn from_file(file: &DenseFile, dims: (usize, usize, usize), name: &str) -> AppResult<Self> {
        let (input, hidden, output) = dims;
        Ok(Self {
            w1: to_matrix(&file.w1, (hidden, input), &format!("{name}.w1"))?,
            b1: to_vector(&file.b1, hidden, &format!("{name}.b1"))?,
            w2: to_matrix(&file.w2, (output, hidden), &format!("{name}.w2"))?,
            b2: to_vector(&file.b2, output, &format!("{name}.b2"))?,
        })
    }

    fn random(rng: &mut ChaCha8Rng, dims: (usize, usize, usize)) -> Self {
        let (input, hidden, output) = dims;
        let b1 = 1.0 / (input.max(1) as f64).sqrt();
        let b2 = 1.0 / (hidden.max(1) as f64).sqrt();
        Self {
            w1: uniform_matrix(rng, (hidden, input), b1),
            b1: uniform_vector(rng, hidden, b1),
            w2: uniform_matrix(rng, (output, hidden), b2),
            b2: uniform_vector(rng, output, b2),
        }
    }

    fn to_file(&self) -> DenseFile {
        DenseFile {
            w1: from_matrix(&self.w1),
            b1: self.b1.to_vec(),
            w2: from_matrix(&self.w2),
            b2: self.b2.to_vec(),
        }
    }

    fn forward(&self, x: ArrayView1<'_, f64>, activation: fn(f64) -> f64) -> Array1<f64> {
        let hidden = (self.w1.dot(&x) + &self.b1).mapv(activation);
        self.w2.dot(&hidden) + &self.b2
    }
}

/// Predicts the next exercise from a short window of completed ones
///
/// Token `0` is padding; token `i` (1-based) is the i-th catalog item in id
/// order. Output column `k` scores token `k + 1`.
#[derive(Debug, Clone)]
pub struct SequenceModel {
    num_items: usize,
    embedding: Array2<f64>,
    forward: GruDirection,
    backward: GruDirection,
    attention: Dense,
    output: Dense,
}

impl SequenceModel {
    /// Build from a weight file, validating every tensor shape
    ///
    /// # Errors
    ///
    /// Returns `ModelUnavailable` naming the first mismatched tensor
    pub fn from_file(file: &SequenceWeightsFile) -> AppResult<Self> {
        let (n, e, h) = (file.num_items, file.embedding_dim, file.hidden_dim);
        Ok(Self {
            num_items: n,
            embedding: to_matrix(&file.embedding, (n + 1, e), "embedding")?,
            forward: GruDirection::from_file(&file.gru_forward, e, h, "gru_forward")?,
            backward: GruDirection::from_file(&file.gru_backward, e, h, "gru_backward")?,
            attention: Dense::from_file(&file.attention, (2 * h, h, 1), "attention")?,
            output: Dense::from_file(&file.output, (2 * h, h, n), "output")?,
        })
    }

    /// Seeded random weights for a catalog of `num_items`
    #[must_use]
    pub fn random(num_items: usize, embedding_dim: usize, hidden_dim: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut embedding = uniform_matrix(&mut rng, (num_items + 1, embedding_dim), 1.0);
        embedding.row_mut(0).fill(0.0);
        Self {
            num_items,
            forward: GruDirection::random(&mut rng, embedding_dim, hidden_dim),
            backward: GruDirection::random(&mut rng, embedding_dim, hidden_dim),
            attention: Dense::random(&mut rng, (2 * hidden_dim, hidden_dim, 1)),
            output: Dense::random(&mut rng, (2 * hidden_dim, hidden_dim, num_items)),
            embedding,
        }
    }

    /// Serialize the weights back to the file format
    #[must_use]
    pub fn to_file(&self) -> SequenceWeightsFile {
        SequenceWeightsFile {
            num_items: self.num_items,
            embedding_dim: self.embedding.ncols(),
            hidden_dim: self.forward.hidden,
            embedding: from_matrix(&self.embedding),
            gru_forward: self.forward.to_file(),
            gru_backward: self.backward.to_file(),
            attention: self.attention.to_file(),
            output: self.output.to_file(),
        }
    }

    /// Catalog size the model scores
    #[must_use]
    pub const fn num_items(&self) -> usize {
        self.num_items
    }

    /// Probability over the `num_items` output columns; unknown tokens act as padding
    #[must_use]
    pub fn distribution(&self, tokens: &[usize]) -> Array1<f64> {
        if tokens.is_empty() || self.num_items == 0 {
            return Array1::zeros(self.num_items);
        }
        let embedded: Vec<ArrayView1<'_, f64>> = tokens
            .iter()
            .map(|&token| {
                let row = if token <= self.num_items { token } else { 0 };
                self.embedding.row(row)
            })
            .collect();

        let forward = self.forward.run(embedded.iter().copied(), embedded.len());
        let mut backward = self
            .backward
            .run(embedded.iter().rev().copied(), embedded.len());
        backward.reverse();

        let states: Vec<Array1<f64>> = forward
            .iter()
            .zip(&backward)
            .map(|(f, b)| concatenate(Axis(0), &[f.view(), b.view()]).unwrap_or_else(|_| f.clone()))
            .collect();

        let scores: Array1<f64> = states
            .iter()
            .map(|state| self.attention.forward(state.view(), f64::tanh)[0])
            .collect();
        let weights = softmax(scores.view());

        let mut context = Array1::zeros(states[0].len());
        for (weight, state) in weights.iter().zip(&states) {
            context.scaled_add(*weight, state);
        }

        let logits = self.output.forward(context.view(), |v| v.max(0.0));
        softmax(logits.view())
    }
}
