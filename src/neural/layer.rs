//! Layers of neurons and the stages that group them.

use super::activation::{Activation, WEIGHT_RANGE};
use super::neuron::{Neuron, NeuronId, NeuronRef};
use crate::error::NetworkError;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Ordered group of neurons with bulk operations
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Layer {
    neurons: Vec<Neuron>,
}

impl Layer {
    /// Layer of `size` freshly minted neurons
    pub fn new(size: usize) -> Self {
        Self::with_activation(size, Activation::default())
    }

    pub fn with_activation(size: usize, activation: Activation) -> Self {
        Self {
            neurons: (0..size).map(|_| Neuron::with_activation(activation)).collect(),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Neuron> {
        self.neurons.iter()
    }

    pub fn get(&self, position: usize) -> Option<&Neuron> {
        self.neurons.get(position)
    }

    /// Connect every neuron of this layer to every neuron of `upstream`
    /// with a weight drawn uniformly from `[-0.5, 0.5]`
    pub fn connect<R: Rng>(&mut self, upstream: &Layer, rng: &mut R) {
        for neuron in &mut self.neurons {
            for (position, target) in upstream.neurons.iter().enumerate() {
                let handle = NeuronRef {
                    id: target.id(),
                    position,
                };
                neuron.create_synapse(handle, rng.gen_range(-WEIGHT_RANGE..=WEIGHT_RANGE));
            }
        }
    }

    /// Forward pass of every neuron against `upstream`
    pub fn calculate(&mut self, upstream: &Layer) {
        for neuron in &mut self.neurons {
            neuron.compute_output_value(&upstream.neurons);
        }
    }

    /// Error of every neuron against the expected category (output layer)
    pub fn update_category(&mut self, category: &str) {
        for neuron in &mut self.neurons {
            neuron.compute_error(category);
        }
    }

    /// Backpropagate errors from `downstream`: each neuron receives the sum of
    /// `weight × error` over the downstream neurons that hold a synapse to it
    pub fn update(&mut self, downstream: &Layer) {
        for neuron in &mut self.neurons {
            let id: Option<NeuronId> = Some(neuron.id());
            let error: f64 = downstream
                .neurons
                .iter()
                .filter_map(|after| after.weight(id).map(|w| w * after.error()))
                .sum();
            neuron.compute_error(error);
        }
    }

    /// Gradient step on every neuron's synapses into `upstream`
    pub fn update_weight(&mut self, upstream: &Layer, learning_rate: f64) {
        for neuron in &mut self.neurons {
            neuron.compute_weights(&upstream.neurons, learning_rate);
        }
    }

    /// Set the output of the neuron at `position` (input injection)
    pub fn set(&mut self, position: usize, value: f64) -> Result<(), NetworkError> {
        let len = self.neurons.len();
        self.neurons
            .get_mut(position)
            .ok_or(NetworkError::OutOfRange { position, len })?
            .set_output(value);
        Ok(())
    }

    /// Assign the category label of the neuron at `position`, replacing any
    /// earlier one
    pub fn set_category(&mut self, position: usize, category: &str) -> Result<(), NetworkError> {
        let len = self.neurons.len();
        self.neurons
            .get_mut(position)
            .ok_or(NetworkError::OutOfRange { position, len })?
            .set_category(category);
        Ok(())
    }

    /// Output values in neuron order
    pub fn outputs(&self) -> Vec<f64> {
        self.neurons.iter().map(Neuron::output).collect()
    }

    /// Position of the neuron with the largest output; ties go to the first
    pub fn winner(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (position, neuron) in self.neurons.iter().enumerate() {
            match best {
                Some((_, value)) if neuron.output() <= value => {}
                _ => best = Some((position, neuron.output())),
            }
        }
        best.map(|(position, _)| position)
    }

    pub(crate) fn max_id(&self) -> Option<NeuronId> {
        self.neurons.iter().map(Neuron::id).max()
    }
}

impl<'a> IntoIterator for &'a Layer {
    type Item = &'a Neuron;
    type IntoIter = std::slice::Iter<'a, Neuron>;

    fn into_iter(self) -> Self::IntoIter {
        self.neurons.iter()
    }
}

/// How a stage holds its layers, fixed at creation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    /// Exactly one layer (input and output boundary)
    Single,
    /// One or more stacked layers (hidden depth)
    Grouped,
}

#[derive(Debug, Serialize, Deserialize)]
enum Slot {
    Single(Layer),
    Grouped(Vec<Layer>),
}

/// A named stage of the network holding either one layer or a stack of them.
///
/// The shape is chosen once at construction; `create` either replaces the
/// single layer or appends a new group.
#[derive(Debug, Serialize, Deserialize)]
pub struct Stage {
    shape: Shape,
    activation: Activation,
    slot: Option<Slot>,
}

impl Stage {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            activation: Activation::default(),
            slot: None,
        }
    }

    pub fn single() -> Self {
        Self::new(Shape::Single)
    }

    pub fn grouped() -> Self {
        Self::new(Shape::Grouped)
    }

    /// Activation given to neurons created from now on
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Single stage of `size` neurons
    pub fn single_of(size: usize) -> Self {
        let mut stage = Self::single();
        stage.create(size);
        stage
    }

    /// Grouped stage with one layer per entry of `sizes`
    pub fn grouped_of(sizes: &[usize]) -> Self {
        let mut stage = Self::grouped();
        for &size in sizes {
            stage.create(size);
        }
        stage
    }

    /// Allocate `size` neurons: the single layer for a single stage, a new
    /// trailing group for a grouped stage
    pub fn create(&mut self, size: usize) {
        let layer = Layer::with_activation(size, self.activation);
        match (self.shape, &mut self.slot) {
            (Shape::Single, slot) => *slot = Some(Slot::Single(layer)),
            (Shape::Grouped, Some(Slot::Grouped(groups))) => groups.push(layer),
            (Shape::Grouped, slot) => *slot = Some(Slot::Grouped(vec![layer])),
        }
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.is_some()
    }

    /// Layers in order: one for a single stage, every group for a grouped one
    pub fn layers(&self) -> &[Layer] {
        match &self.slot {
            Some(Slot::Single(layer)) => std::slice::from_ref(layer),
            Some(Slot::Grouped(groups)) => groups,
            None => &[],
        }
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        match &mut self.slot {
            Some(Slot::Single(layer)) => std::slice::from_mut(layer),
            Some(Slot::Grouped(groups)) => groups,
            None => &mut [],
        }
    }

    /// Number of groups (1 for an initialized single stage)
    pub fn len(&self) -> usize {
        self.layers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers().is_empty()
    }

    /// Neuron count of each group
    pub fn sizes(&self) -> Vec<usize> {
        self.layers().iter().map(Layer::size).collect()
    }

    pub fn first(&self) -> Option<&Layer> {
        self.layers().first()
    }

    pub fn last(&self) -> Option<&Layer> {
        self.layers().last()
    }

    pub(crate) fn max_id(&self) -> Option<NeuronId> {
        self.layers().iter().filter_map(Layer::max_id).max()
    }
}
