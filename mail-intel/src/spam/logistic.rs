//! L2-regularized binary logistic regression
//!
//! Minimizes `C * sum(log(1 + exp(-y * (w.x + b)))) + 0.5 * |w|^2` with the
//! intercept left unpenalized. Optimization is limited-memory BFGS with a
//! backtracking line search, started from zero, so fitting is deterministic.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

use super::types::{Label, Prediction};
use super::vectorizer::FeatureVector;
use crate::config::TrainingConfig;
use crate::error::{MlError, Result};

/// Correction pairs kept by L-BFGS
const HISTORY: usize = 10;
/// Sufficient decrease constant for the Armijo condition
const ARMIJO: f64 = 1e-4;
const MAX_LINE_SEARCH_STEPS: usize = 50;

/// Optimizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
    /// Stop once the largest gradient component falls below this
    pub tolerance: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for LogisticParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            c: config.c,
            max_iter: config.max_iter,
            tolerance: config.tolerance,
        }
    }
}

/// Fitted classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    weights: Vec<f64>,
    intercept: f64,
    params: LogisticParams,
    iterations: usize,
    converged: bool,
}

impl LogisticModel {
    /// Fit on labelled feature vectors sharing one dimensionality
    pub fn fit(samples: &[FeatureVector], labels: &[Label], params: LogisticParams) -> Result<Self> {
        if samples.is_empty() {
            return Err(MlError::Training("No training samples".to_string()));
        }
        if samples.len() != labels.len() {
            return Err(MlError::Training(format!(
                "{} samples but {} labels",
                samples.len(),
                labels.len()
            )));
        }
        if !labels.contains(&Label::Spam) || !labels.contains(&Label::Ham) {
            return Err(MlError::Training(
                "Training data must contain both spam and ham examples".to_string(),
            ));
        }
        let dim = samples[0].dim();
        if samples.iter().any(|s| s.dim() != dim) {
            return Err(MlError::Training(
                "Feature vectors have inconsistent dimensions".to_string(),
            ));
        }

        let targets: Vec<f64> = labels
            .iter()
            .map(|label| match label {
                Label::Spam => 1.0,
                Label::Ham => -1.0,
            })
            .collect();
        let objective = Objective {
            samples,
            targets: &targets,
            c: params.c,
            dim,
        };

        let outcome = minimize_lbfgs(&objective, params.max_iter, params.tolerance);
        if outcome.converged {
            debug!(
                "Logistic regression converged after {} iterations (loss {:.6})",
                outcome.iterations, outcome.loss
            );
        } else {
            warn!(
                "Logistic regression stopped after {} iterations without converging (loss {:.6})",
                outcome.iterations, outcome.loss
            );
        }

        let mut theta = outcome.theta;
        let intercept = theta.pop().unwrap_or(0.0);

        Ok(Self {
            weights: theta,
            intercept,
            params,
            iterations: outcome.iterations,
            converged: outcome.converged,
        })
    }

    /// Signed distance `w.x + b`
    pub fn decision_function(&self, x: &FeatureVector) -> f64 {
        x.dot(&self.weights) + self.intercept
    }

    /// Probability of the spam class
    pub fn predict_proba(&self, x: &FeatureVector) -> f64 {
        sigmoid(self.decision_function(x))
    }

    pub fn predict(&self, x: &FeatureVector) -> Prediction {
        Prediction::from_spam_probability(self.predict_proba(x))
    }

    /// One coefficient per vocabulary index
    pub fn coefficients(&self) -> &[f64] {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn dim(&self) -> usize {
        self.weights.len()
    }

    pub fn params(&self) -> &LogisticParams {
        &self.params
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `log(1 + exp(-m))` without overflow
fn log_loss(margin: f64) -> f64 {
    if margin > 0.0 {
        (-margin).exp().ln_1p()
    } else {
        -margin + margin.exp().ln_1p()
    }
}

struct Objective<'a> {
    samples: &'a [FeatureVector],
    targets: &'a [f64],
    c: f64,
    dim: usize,
}

impl Objective<'_> {
    /// Loss and gradient at `theta = [w..., b]`
    fn evaluate(&self, theta: &[f64]) -> (f64, Vec<f64>) {
        let (weights, bias) = theta.split_at(self.dim);
        let bias = bias[0];

        let mut loss = 0.5 * dot(weights, weights);
        let mut grad = Vec::with_capacity(self.dim + 1);
        grad.extend_from_slice(weights);
        grad.push(0.0);

        for (x, &y) in self.samples.iter().zip(self.targets) {
            let margin = y * (x.dot(weights) + bias);
            loss += self.c * log_loss(margin);
            // d/dz log(1 + exp(-y z)) = -y * sigmoid(-y z)
            let coef = -self.c * y * sigmoid(-margin);
            for (i, v) in x.iter() {
                grad[i] += coef * v;
            }
            grad[self.dim] += coef;
        }

        (loss, grad)
    }
}

struct Outcome {
    theta: Vec<f64>,
    loss: f64,
    iterations: usize,
    converged: bool,
}

fn minimize_lbfgs(objective: &Objective<'_>, max_iter: usize, tolerance: f64) -> Outcome {
    let n = objective.dim + 1;
    let mut theta = vec![0.0; n];
    let (mut loss, mut grad) = objective.evaluate(&theta);
    let mut history: VecDeque<(Vec<f64>, Vec<f64>, f64)> = VecDeque::with_capacity(HISTORY);
    let mut iterations = 0;
    let mut converged = inf_norm(&grad) < tolerance;

    while !converged && iterations < max_iter {
        iterations += 1;

        let mut direction = two_loop(&grad, &history);
        let mut slope = dot(&direction, &grad);
        if slope >= 0.0 {
            // Curvature information went stale; fall back to steepest descent.
            history.clear();
            direction = grad.iter().map(|g| -g).collect();
            slope = -dot(&grad, &grad);
        }

        let mut step = if history.is_empty() {
            (1.0 / norm(&grad)).min(1.0)
        } else {
            1.0
        };

        let mut accepted = None;
        for _ in 0..MAX_LINE_SEARCH_STEPS {
            let candidate: Vec<f64> = theta
                .iter()
                .zip(&direction)
                .map(|(t, d)| t + step * d)
                .collect();
            let (candidate_loss, candidate_grad) = objective.evaluate(&candidate);
            if candidate_loss <= loss + ARMIJO * step * slope {
                accepted = Some((candidate, candidate_loss, candidate_grad));
                break;
            }
            step *= 0.5;
        }

        let Some((next, next_loss, next_grad)) = accepted else {
            debug!("Line search failed at iteration {}", iterations);
            break;
        };

        let s: Vec<f64> = next.iter().zip(&theta).map(|(a, b)| a - b).collect();
        let y: Vec<f64> = next_grad.iter().zip(&grad).map(|(a, b)| a - b).collect();
        let sy = dot(&s, &y);
        if sy > 1e-10 {
            if history.len() == HISTORY {
                history.pop_front();
            }
            history.push_back((s, y, 1.0 / sy));
        }

        theta = next;
        loss = next_loss;
        grad = next_grad;
        converged = inf_norm(&grad) < tolerance;
    }

    Outcome {
        theta,
        loss,
        iterations,
        converged,
    }
}

/// Approximate `H^-1 * grad` and negate it
fn two_loop(grad: &[f64], history: &VecDeque<(Vec<f64>, Vec<f64>, f64)>) -> Vec<f64> {
    let mut q = grad.to_vec();
    let mut alphas = Vec::with_capacity(history.len());

    for (s, y, rho) in history.iter().rev() {
        let alpha = rho * dot(s, &q);
        axpy(-alpha, y, &mut q);
        alphas.push(alpha);
    }

    if let Some((s, y, _)) = history.back() {
        let gamma = dot(s, y) / dot(y, y);
        q.iter_mut().for_each(|v| *v *= gamma);
    }

    for ((s, y, rho), alpha) in history.iter().zip(alphas.iter().rev()) {
        let beta = rho * dot(y, &q);
        axpy(alpha - beta, s, &mut q);
    }

    q.iter().map(|v| -v).collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

fn inf_norm(a: &[f64]) -> f64 {
    a.iter().fold(0.0, |m, v| m.max(v.abs()))
}

fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}
