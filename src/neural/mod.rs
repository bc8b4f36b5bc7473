//! Neuron graph engine.
//!
//! Implements a feed-forward network of individually wired neurons with:
//! - Sigmoid activation and a finite-difference derivative
//! - Shape-tagged stages (single layer or stacked groups)
//! - Backpropagated errors and per-synapse gradient steps
//! - Two-phase training over a labelled dataset

pub mod activation;
mod layer;
mod network;
mod neuron;
mod training;

pub use activation::{differential, sigmoid, single_jump, Activation};
pub use layer::{Layer, Shape, Stage};
pub use network::{Network, Topology};
pub use neuron::{ErrorSignal, Neuron, NeuronId, NeuronRef, Synapse};
pub use training::{SampleOutcome, SkipReason, TrainingPlan};
