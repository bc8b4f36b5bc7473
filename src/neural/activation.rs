//! Activation functions and the numerical derivative used by weight updates.

use serde::{Deserialize, Serialize};

/// Weights of new synapses are drawn from `[-WEIGHT_RANGE, WEIGHT_RANGE]`
pub const WEIGHT_RANGE: f64 = 0.5;
/// Output of a neuron before its first forward pass
pub const OUTPUT_DEFAULT: f64 = 0.5;
/// Error of a neuron before its first backward pass
pub const ERROR_DEFAULT: f64 = 0.5;
pub const LEARNING_RATE_DEFAULT: f64 = 0.1;
/// Step of the forward finite difference
pub const EPSILON: f64 = 0.01;
/// Threshold of the step function
pub const STEP_THRESHOLD: f64 = 10.0;
/// Steepness of the sigmoid
pub const SIGMOID_DEGREE: f64 = 1.0;

/// Logistic sigmoid
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (SIGMOID_DEGREE * -x).exp())
}

/// Heaviside step at `STEP_THRESHOLD`
#[inline]
pub fn single_jump(x: f64) -> f64 {
    if x >= STEP_THRESHOLD {
        1.0
    } else {
        0.0
    }
}

/// Forward finite difference: `(f(x + ε) - f(x)) / ε`.
///
/// Weight updates use this estimate instead of a closed-form derivative; the
/// step is fixed at [`EPSILON`].
#[inline]
pub fn differential<F: Fn(f64) -> f64>(f: F, x: f64) -> f64 {
    (f(x + EPSILON) - f(x)) / EPSILON
}

/// Activation a neuron is configured with at creation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Sigmoid,
    Step,
}

impl Activation {
    pub fn function(self) -> fn(f64) -> f64 {
        match self {
            Activation::Sigmoid => sigmoid,
            Activation::Step => single_jump,
        }
    }

    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        (self.function())(x)
    }

    /// Numerical derivative of this activation at `x`
    #[inline]
    pub fn derivative(self, x: f64) -> f64 {
        differential(self.function(), x)
    }
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Activation::Sigmoid => write!(f, "sigmoid"),
            Activation::Step => write!(f, "step"),
        }
    }
}
