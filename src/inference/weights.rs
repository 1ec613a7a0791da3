// ABOUTME: Serialized weight file formats and ndarray conversion with shape validation
// ABOUTME: Also provides seeded uniform initializers for randomly initialized models
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use ndarray::{Array1, Array2};
use pierre_coach_core::errors::{AppError, AppResult, ErrorCode};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Row-major matrix as stored in JSON
pub type RawMatrix = Vec<Vec<f64>>;

/// Convert a JSON matrix, checking its shape
///
/// # Errors
///
/// Returns `ModelUnavailable` naming the tensor when the shape is wrong
pub fn to_matrix(raw: &RawMatrix, shape: (usize, usize), name: &str) -> AppResult<Array2<f64>> {
    let (rows, cols) = shape;
    if raw.len() != rows || raw.iter().any(|row| row.len() != cols) {
        return Err(shape_error(
            name,
            &format!("{rows}x{cols}"),
            &format!("{}x{}", raw.len(), raw.first().map_or(0, Vec::len)),
        ));
    }
    let flat: Vec<f64> = raw.iter().flatten().copied().collect();
    Array2::from_shape_vec(shape, flat).map_err(|e| {
        AppError::new(ErrorCode::ModelUnavailable, format!("tensor {name}: {e}"))
    })
}

/// Convert a JSON vector, checking its length
///
/// # Errors
///
/// Returns `ModelUnavailable` naming the tensor when the length is wrong
pub fn to_vector(raw: &[f64], len: usize, name: &str) -> AppResult<Array1<f64>> {
    if raw.len() != len {
        return Err(shape_error(name, &len.to_string(), &raw.len().to_string()));
    }
    Ok(Array1::from(raw.to_vec()))
}

fn shape_error(name: &str, expected: &str, found: &str) -> AppError {
    AppError::new(
        ErrorCode::ModelUnavailable,
        format!("tensor {name} expected shape {expected}, found {found}"),
    )
}

/// Matrix back to JSON form
#[must_use]
pub fn from_matrix(matrix: &Array2<f64>) -> RawMatrix {
    matrix.outer_iter().map(|row| row.to_vec()).collect()
}

/// Matrix with entries drawn from `U(-bound, bound)`
pub fn uniform_matrix<R: Rng>(rng: &mut R, shape: (usize, usize), bound: f64) -> Array2<f64> {
    let dist = Uniform::new_inclusive(-bound, bound);
    Array2::from_shape_fn(shape, |_| dist.sample(rng))
}

/// Vector with entries drawn from `U(-bound, bound)`
pub fn uniform_vector<R: Rng>(rng: &mut R, len: usize, bound: f64) -> Array1<f64> {
    let dist = Uniform::new_inclusive(-bound, bound);
    Array1::from_shape_fn(len, |_| dist.sample(rng))
}

/// Recurrent layer tensors in `[reset | update | new]` gate order, `out × in`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GruFile {
    /// Input-to-hidden weights, `3H × E`
    pub w_ih: RawMatrix,
    /// Hidden-to-hidden weights, `3H × H`
    pub w_hh: RawMatrix,
    /// Input bias, `3H`
    pub b_ih: Vec<f64>,
    /// Hidden bias, `3H`
    pub b_hh: Vec<f64>,
}

/// Two-layer perceptron tensors, `out × in`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseFile {
    /// First layer weights
    pub w1: RawMatrix,
    /// First layer bias
    pub b1: Vec<f64>,
    /// Second layer weights
    pub w2: RawMatrix,
    /// Second layer bias
    pub b2: Vec<f64>,
}

/// `sequence_model.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceWeightsFile {
    /// Catalog size the model was trained for (output width)
    pub num_items: usize,
    /// Token embedding width
    pub embedding_dim: usize,
    /// Recurrent width per direction
    pub hidden_dim: usize,
    /// `(num_items + 1) × embedding_dim`; row 0 is padding
    pub embedding: RawMatrix,
    /// Forward-direction recurrent layer
    pub gru_forward: GruFile,
    /// Backward-direction recurrent layer
    pub gru_backward: GruFile,
    /// Attention scorer: `H × 2H` then `1 × H`
    pub attention: DenseFile,
    /// Output projection: `H × 2H` then `num_items × H`
    pub output: DenseFile,
}

/// One graph layer, `in × out`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcnLayerFile {
    /// Weight matrix
    pub weight: RawMatrix,
    /// Bias
    pub bias: Vec<f64>,
}

/// `graph_model.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphWeightsFile {
    /// Exactly two layers
    pub layers: Vec<GcnLayerFile>,
}
