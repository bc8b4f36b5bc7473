//! A single neuron and its outgoing synapses.
//!
//! Neurons are owned by the [`Layer`](super::Layer) they were created in.
//! A synapse never owns its endpoint: it stores a [`NeuronRef`], the id and
//! position of the target inside the upstream layer, and is resolved against
//! that layer when the network runs a pass.

use super::activation::{Activation, ERROR_DEFAULT, OUTPUT_DEFAULT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NEURON_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique neuron identity, never reused
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NeuronId(u64);

impl NeuronId {
    /// Mint a fresh id
    pub fn next() -> Self {
        Self(NEXT_NEURON_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Make sure ids minted from now on are greater than `id`.
    ///
    /// Called after deserializing a network so that restored neurons keep
    /// their identity without colliding with new ones.
    pub fn reserve_past(id: NeuronId) {
        NEXT_NEURON_ID.fetch_max(id.0 + 1, Ordering::Relaxed);
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NeuronId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-owning handle to a neuron inside another layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NeuronRef {
    pub id: NeuronId,
    /// Position of the target inside its layer
    pub position: usize,
}

/// Weighted edge to an upstream neuron
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Synapse {
    pub target: NeuronRef,
    pub weight: f64,
}

/// What a neuron compares itself against when computing its error
#[derive(Clone, Copy, Debug)]
pub enum ErrorSignal<'a> {
    /// Expected category of the current sample (output layer)
    Category(&'a str),
    /// Error already backpropagated from the downstream layer
    Upstream(f64),
}

impl<'a> From<&'a str> for ErrorSignal<'a> {
    fn from(category: &'a str) -> Self {
        ErrorSignal::Category(category)
    }
}

impl From<f64> for ErrorSignal<'_> {
    fn from(error: f64) -> Self {
        ErrorSignal::Upstream(error)
    }
}

/// Computational unit of the network
#[derive(Debug, Serialize, Deserialize)]
pub struct Neuron {
    id: NeuronId,
    output: f64,
    error: f64,
    /// Keyed by target id: at most one edge per target
    synapses: BTreeMap<NeuronId, Synapse>,
    /// Labels this neuron votes for (output layer only)
    categories: Vec<String>,
    activation: Activation,
}

impl Neuron {
    pub fn new() -> Self {
        Self::with_activation(Activation::default())
    }

    pub fn with_activation(activation: Activation) -> Self {
        Self {
            id: NeuronId::next(),
            output: OUTPUT_DEFAULT,
            error: ERROR_DEFAULT,
            synapses: BTreeMap::new(),
            categories: Vec::new(),
            activation,
        }
    }

    #[inline]
    pub fn id(&self) -> NeuronId {
        self.id
    }

    #[inline]
    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn set_output(&mut self, output: f64) {
        self.output = output;
    }

    #[inline]
    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Make `category` the only label of this neuron
    pub fn set_category(&mut self, category: &str) {
        self.categories.clear();
        self.categories.push(category.to_string());
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Number of outgoing synapses
    #[inline]
    pub fn size(&self) -> usize {
        self.synapses.len()
    }

    /// Synapses ordered by target id
    pub fn synapses(&self) -> impl Iterator<Item = &Synapse> {
        self.synapses.values()
    }

    /// Create a synapse to `target` unless one already exists.
    ///
    /// An existing edge keeps its weight. Returns the stored target handle.
    pub fn create_synapse(&mut self, target: NeuronRef, weight: f64) -> NeuronRef {
        self.synapses
            .entry(target.id)
            .or_insert(Synapse { target, weight })
            .target
    }

    /// Weight of the synapse to `target`, if any
    pub fn weight(&self, target: Option<NeuronId>) -> Option<f64> {
        target
            .and_then(|id| self.synapses.get(&id))
            .map(|s| s.weight)
    }

    /// Weighted input `Σ target.output × weight` over synapses resolvable in `upstream`
    fn weighted_sum(&self, upstream: &[Neuron]) -> f64 {
        self.synapses
            .values()
            .filter_map(|s| {
                upstream
                    .get(s.target.position)
                    .filter(|n| n.id == s.target.id)
                    .map(|n| n.output * s.weight)
            })
            .sum()
    }

    /// Forward pass: `output = activation(Σ target.output × weight)`
    pub fn compute_output_value(&mut self, upstream: &[Neuron]) {
        debug_assert!(!self.synapses.is_empty(), "neuron {} is not connected", self.id);
        self.output = self.activation.apply(self.weighted_sum(upstream));
    }

    /// Backward pass.
    ///
    /// A category yields `(1 if category ∈ labels else 0) - output`; an
    /// upstream value is stored verbatim.
    pub fn compute_error<'a, S: Into<ErrorSignal<'a>>>(&mut self, signal: S) {
        self.error = match signal.into() {
            ErrorSignal::Category(category) => {
                let expected = if self.has_category(category) { 1.0 } else { 0.0 };
                expected - self.output
            }
            ErrorSignal::Upstream(error) => error,
        };
    }

    /// Gradient step on every synapse:
    /// `weight += rate × error × target.output × f'(output)`, with `f'` the
    /// finite-difference derivative of the activation.
    pub fn compute_weights(&mut self, upstream: &[Neuron], learning_rate: f64) {
        let slope = self.activation.derivative(self.output);
        let step = learning_rate * self.error * slope;

        for synapse in self.synapses.values_mut() {
            if let Some(target) = upstream
                .get(synapse.target.position)
                .filter(|n| n.id == synapse.target.id)
            {
                synapse.weight += step * target.output;
            }
        }
    }
}

impl Default for Neuron {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity equality: two neurons are equal only if they are the same unit
impl PartialEq for Neuron {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Neuron {}

impl std::fmt::Display for Neuron {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[id:{}, synapses:", self.id)?;
        for synapse in self.synapses.values() {
            write!(f, "(id:{}, weight:{})", synapse.target.id, synapse.weight)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::activation::{differential, sigmoid};

    fn handle(neuron: &Neuron, position: usize) -> NeuronRef {
        NeuronRef {
            id: neuron.id(),
            position,
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Neuron::new();
        let b = Neuron::new();
        assert_ne!(a.id(), b.id());
        assert!(b.id() > a.id());
        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn test_reserve_past() {
        let a = Neuron::new();
        NeuronId::reserve_past(NeuronId(a.id().value() + 100));
        let b = Neuron::new();
        assert!(b.id().value() > a.id().value() + 100);
    }

    #[test]
    fn test_create_synapse_is_idempotent() {
        let target = Neuron::new();
        let mut neuron = Neuron::new();

        let first = neuron.create_synapse(handle(&target, 0), 0.25);
        let second = neuron.create_synapse(handle(&target, 0), -0.4);

        assert_eq!(first, second);
        assert_eq!(neuron.size(), 1);
        assert_eq!(neuron.weight(Some(target.id())), Some(0.25));
    }

    #[test]
    fn test_weight_lookup() {
        let target = Neuron::new();
        let other = Neuron::new();
        let mut neuron = Neuron::new();
        neuron.create_synapse(handle(&target, 0), 0.1);

        assert_eq!(neuron.weight(None), None);
        assert_eq!(neuron.weight(Some(other.id())), None);
        assert_eq!(neuron.weight(Some(target.id())), Some(0.1));
    }

    #[test]
    fn test_compute_output_value() {
        let mut upstream = vec![Neuron::new(), Neuron::new()];
        upstream[0].set_output(1.0);
        upstream[1].set_output(0.5);

        let mut neuron = Neuron::new();
        neuron.create_synapse(handle(&upstream[0], 0), 0.4);
        neuron.create_synapse(handle(&upstream[1], 1), -0.2);

        neuron.compute_output_value(&upstream);
        assert!((neuron.output() - sigmoid(0.3)).abs() < 1e-12);

        // No hidden state: a second pass gives the same value
        let first = neuron.output();
        neuron.compute_output_value(&upstream);
        assert_eq!(neuron.output(), first);
    }

    #[test]
    fn test_stale_handle_is_ignored() {
        let mut upstream = vec![Neuron::new()];
        upstream[0].set_output(1.0);
        let stranger = Neuron::new();

        let mut neuron = Neuron::new();
        neuron.create_synapse(handle(&stranger, 0), 3.0);
        neuron.compute_output_value(&upstream);

        assert_eq!(neuron.output(), sigmoid(0.0));
    }

    #[test]
    fn test_compute_error_from_category() {
        let mut neuron = Neuron::new();
        neuron.set_output(0.3);
        neuron.set_category("cat");

        neuron.compute_error("cat");
        assert!((neuron.error() - 0.7).abs() < 1e-12);

        neuron.compute_error("dog");
        assert!((neuron.error() + 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_compute_error_from_upstream() {
        let mut neuron = Neuron::new();
        assert_eq!(neuron.error(), ERROR_DEFAULT);
        neuron.compute_error(-0.125);
        assert_eq!(neuron.error(), -0.125);
    }

    #[test]
    fn test_set_category_replaces_label() {
        let mut neuron = Neuron::new();
        neuron.set_category("cat");
        neuron.set_category("dog");
        assert_eq!(neuron.categories(), &["dog".to_string()]);
        assert!(neuron.has_category("dog"));
        assert!(!neuron.has_category("cat"));
    }

    #[test]
    fn test_compute_weights() {
        let mut upstream = vec![Neuron::new()];
        upstream[0].set_output(0.8);

        let mut neuron = Neuron::new();
        neuron.create_synapse(handle(&upstream[0], 0), 0.2);
        neuron.set_output(0.6);
        neuron.compute_error(0.5);

        neuron.compute_weights(&upstream, 0.1);

        let expected = 0.2 + 0.1 * 0.5 * 0.8 * differential(sigmoid, 0.6);
        let weight = neuron.weight(Some(upstream[0].id())).unwrap();
        assert!((weight - expected).abs() < 1e-12);
    }

    #[test]
    fn test_display() {
        let target = Neuron::new();
        let mut neuron = Neuron::new();
        neuron.create_synapse(handle(&target, 0), 0.5);

        let text = neuron.to_string();
        assert!(text.starts_with(&format!("[id:{}, synapses:", neuron.id())));
        assert!(text.contains(&format!("(id:{}, weight:0.5)", target.id())));
    }
}
