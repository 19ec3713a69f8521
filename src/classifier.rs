//! L2-regularised binary logistic regression over sparse rows.
//!
//! Minimises
//!
//! ```text
//! ½‖w‖² + C · Σᵢ [ log(1 + exp(zᵢ)) − yᵢ·zᵢ ],   zᵢ = w·xᵢ + b
//! ```
//!
//! with the intercept `b` unpenalised. The solver is accelerated gradient
//! descent with a fixed step `1 / L` and gradient-based momentum restart,
//! where `L = 1 + C/4 · Σᵢ (‖xᵢ‖² + 1)` bounds the gradient's Lipschitz
//! constant. It stops once every gradient component is below `tolerance`.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::traits::{Classifier, SparseVec, Trainer};

/// Solver parameters.
#[derive(Debug, Clone, Copy)]
pub struct LogisticRegressionTrainer {
    /// Inverse regularisation strength.
    pub c: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for LogisticRegressionTrainer {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    intercept: f64,
    iterations: usize,
    converged: bool,
}

/// σ(z) = 1 / (1 + e^(−z)), evaluated without overflow.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn dot(w: &[f64], x: &SparseVec) -> f64 {
    x.iter().map(|&(i, v)| w[i] * v).sum()
}

impl LogisticRegression {
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Raw margin `w·x + b`.
    pub fn decision_function(&self, x: &SparseVec) -> f64 {
        dot(&self.weights, x) + self.intercept
    }
}

impl Classifier for LogisticRegression {
    fn predict_probability(&self, x: &SparseVec) -> f64 {
        sigmoid(self.decision_function(x))
    }

    fn feature_weights(&self) -> &[f64] {
        &self.weights
    }
}

impl LogisticRegressionTrainer {
    /// Gradient of the objective at `(w, b)`, written into `grad_w`;
    /// returns the intercept component.
    fn gradient(
        &self,
        matrix: &[SparseVec],
        targets: &[bool],
        w: &[f64],
        b: f64,
        grad_w: &mut [f64],
    ) -> f64 {
        grad_w.copy_from_slice(w);
        let mut grad_b = 0.0;
        for (x, &y) in matrix.iter().zip(targets) {
            let residual = self.c * (sigmoid(dot(w, x) + b) - if y { 1.0 } else { 0.0 });
            for &(i, v) in x {
                grad_w[i] += residual * v;
            }
            grad_b += residual;
        }
        grad_b
    }
}

impl Trainer for LogisticRegressionTrainer {
    type Output = LogisticRegression;

    fn fit(&self, matrix: &[SparseVec], targets: &[bool], dims: usize) -> Result<LogisticRegression> {
        if matrix.len() != targets.len() {
            bail!(
                "feature matrix has {} rows but membership vector has {} entries",
                matrix.len(),
                targets.len()
            );
        }
        if matrix.is_empty() {
            bail!("cannot fit a classifier on zero documents");
        }
        if let Some(&(i, _)) = matrix.iter().flat_map(|x| x.iter()).find(|&&(i, _)| i >= dims) {
            bail!("feature index {} out of range for {} features", i, dims);
        }

        let positives = targets.iter().filter(|&&y| y).count();
        let negatives = targets.len() - positives;
        if positives == 0 || negatives == 0 {
            // One class only: a constant model at the smoothed log-odds.
            let intercept = ((positives as f64 + 0.5) / (negatives as f64 + 0.5)).ln();
            return Ok(LogisticRegression {
                weights: vec![0.0; dims],
                intercept,
                iterations: 0,
                converged: true,
            });
        }

        let frobenius: f64 = matrix
            .iter()
            .map(|x| x.iter().map(|(_, v)| v * v).sum::<f64>() + 1.0)
            .sum();
        let step = 1.0 / (1.0 + self.c * frobenius / 4.0);

        let mut w = vec![0.0; dims];
        let mut b = 0.0;
        // Look-ahead point for the momentum step.
        let mut y_w = w.clone();
        let mut y_b = b;
        let mut grad_w = vec![0.0; dims];
        let mut k = 0usize;
        let mut iterations = 0usize;
        let mut converged = false;

        while iterations < self.max_iter {
            iterations += 1;
            let grad_b = self.gradient(matrix, targets, &y_w, y_b, &mut grad_w);

            let max_grad = grad_w
                .iter()
                .fold(grad_b.abs(), |acc, g| acc.max(g.abs()));
            if max_grad < self.tolerance {
                w.copy_from_slice(&y_w);
                b = y_b;
                converged = true;
                break;
            }

            let next_w: Vec<f64> = y_w
                .iter()
                .zip(&grad_w)
                .map(|(yw, g)| yw - step * g)
                .collect();
            let next_b = y_b - step * grad_b;

            // Restart momentum when it points against the gradient.
            let alignment: f64 = grad_w
                .iter()
                .zip(next_w.iter().zip(&w))
                .map(|(g, (nw, ow))| g * (nw - ow))
                .sum::<f64>()
                + grad_b * (next_b - b);
            k = if alignment > 0.0 { 0 } else { k + 1 };
            let momentum = k as f64 / (k as f64 + 3.0);

            for ((yw, nw), ow) in y_w.iter_mut().zip(&next_w).zip(&w) {
                *yw = nw + momentum * (nw - ow);
            }
            y_b = next_b + momentum * (next_b - b);
            w = next_w;
            b = next_b;
        }

        if !converged {
            tracing::debug!(iterations, "logistic regression stopped at max_iter");
        }

        Ok(LogisticRegression {
            weights: w,
            intercept: b,
            iterations,
            converged,
        })
    }
}
