//! Network construction, wiring and the forward/backward passes.

use super::activation::LEARNING_RATE_DEFAULT;
use super::layer::{Layer, Shape, Stage};
use crate::dataset::{ImageDecoder, SampleDecoder};
use crate::error::NetworkError;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Layer sizes of a network
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub input: usize,
    pub hidden: Vec<usize>,
    pub output: usize,
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:?}-{}", self.input, self.hidden, self.output)
    }
}

/// Feed-forward network: one input stage, a grouped hidden stage and one
/// output stage.
///
/// The network owns every neuron; synapses only refer to neurons of the
/// adjacent layer by handle. It is intentionally not `Clone`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Network {
    input: Stage,
    hidden: Stage,
    output: Stage,

    // Session state
    dataset: Option<PathBuf>,
    categories: Vec<String>,
    epoch: Option<usize>,
    learning_rate: f64,
}

impl Network {
    /// Wire the stages with randomly initialised weights
    pub fn new(input: Stage, hidden: Stage, output: Stage) -> Result<Self, NetworkError> {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(input, hidden, output, seed)
    }

    /// Wire the stages with weights drawn from a seeded generator
    pub fn new_with_seed(
        input: Stage,
        hidden: Stage,
        output: Stage,
        seed: u64,
    ) -> Result<Self, NetworkError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Self::new_with_rng(input, hidden, output, &mut rng)
    }

    pub fn new_with_rng<R: Rng>(
        input: Stage,
        mut hidden: Stage,
        mut output: Stage,
        rng: &mut R,
    ) -> Result<Self, NetworkError> {
        check_shapes(&input, &hidden, &output)?;

        // Output layer to the back hidden group
        if let Some(back) = hidden.last() {
            output.layers_mut()[0].connect(back, rng);
        }

        // Hidden group i+1 to hidden group i
        let groups = hidden.layers_mut();
        for i in 0..groups.len().saturating_sub(1) {
            let (before, after) = groups.split_at_mut(i + 1);
            after[0].connect(&before[i], rng);
        }

        // Front hidden group to the input layer
        groups[0].connect(&input.layers()[0], rng);

        let network = Self {
            input,
            hidden,
            output,
            dataset: None,
            categories: Vec::new(),
            epoch: None,
            learning_rate: LEARNING_RATE_DEFAULT,
        };
        network.check_fan_in()?;

        log::info!("Network created: topology {}", network.topology());
        Ok(network)
    }

    /// Check the structural invariants of an existing network.
    ///
    /// Used after deserialization, where the wiring was not built here.
    pub fn validate(&self) -> Result<(), NetworkError> {
        check_shapes(&self.input, &self.hidden, &self.output)?;
        self.check_fan_in()
    }

    /// Every neuron holds exactly one synapse per neuron of its upstream layer
    fn check_fan_in(&self) -> Result<(), NetworkError> {
        let input = self.input_layer();
        let groups = self.hidden.layers();
        let upstream = std::iter::once(input).chain(groups.iter());
        let downstream = groups.iter().chain(std::iter::once(self.output_layer()));

        for (depth, (before, after)) in upstream.zip(downstream).enumerate() {
            for neuron in after {
                let wired = before
                    .iter()
                    .all(|target| neuron.weight(Some(target.id())).is_some());
                if neuron.size() != before.size() || !wired {
                    return Err(NetworkError::Structure(format!(
                        "neuron {} at depth {} has fan-in {}, expected {}",
                        neuron.id(),
                        depth + 1,
                        neuron.size(),
                        before.size()
                    )));
                }
            }
        }
        Ok(())
    }

    // === Session state ===

    pub fn set_dataset<P: AsRef<Path>>(&mut self, dataset: P) {
        self.dataset = Some(dataset.as_ref().to_path_buf());
    }

    pub fn set_categories<S: AsRef<str>>(&mut self, categories: &[S]) {
        self.categories = categories.iter().map(|c| c.as_ref().to_string()).collect();
    }

    pub fn set_epoch(&mut self, epoch: usize) {
        self.epoch = Some(epoch);
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    pub fn dataset(&self) -> Option<&Path> {
        self.dataset.as_deref()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn epoch(&self) -> Option<usize> {
        self.epoch
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    // === Structure ===

    pub fn input(&self) -> &Stage {
        &self.input
    }

    pub fn hidden(&self) -> &Stage {
        &self.hidden
    }

    pub fn output(&self) -> &Stage {
        &self.output
    }

    pub fn topology(&self) -> Topology {
        Topology {
            input: self.input_layer().size(),
            hidden: self.hidden.sizes(),
            output: self.output_layer().size(),
        }
    }

    pub(crate) fn input_layer(&self) -> &Layer {
        &self.input.layers()[0]
    }

    pub(crate) fn output_layer(&self) -> &Layer {
        &self.output.layers()[0]
    }

    pub(crate) fn output_layer_mut(&mut self) -> &mut Layer {
        &mut self.output.layers_mut()[0]
    }

    /// Every synapse weight: hidden groups front to back, then the output
    /// layer; neurons in layer order, synapses in target order
    pub fn synapse_weights(&self) -> Vec<f64> {
        self.hidden
            .layers()
            .iter()
            .chain(self.output.layers())
            .flat_map(|layer| layer.iter())
            .flat_map(|neuron| neuron.synapses().map(|s| s.weight))
            .collect()
    }

    /// Output-layer values after the last forward pass
    pub fn outputs(&self) -> Vec<f64> {
        self.output_layer().outputs()
    }

    /// Largest neuron id held by this network
    pub(crate) fn max_neuron_id(&self) -> Option<super::NeuronId> {
        [&self.input, &self.hidden, &self.output]
            .iter()
            .filter_map(|stage| stage.max_id())
            .max()
    }

    // === Passes ===

    /// Write one value per input neuron
    pub(crate) fn inject(&mut self, pixels: &[f64]) -> Result<(), NetworkError> {
        let input = &mut self.input.layers_mut()[0];
        for (position, &value) in pixels.iter().enumerate() {
            input.set(position, value)?;
        }
        Ok(())
    }

    /// Hidden groups front to back, then the output layer
    pub(crate) fn forward(&mut self) {
        let input = &self.input.layers()[0];
        let groups = self.hidden.layers_mut();
        for i in 0..groups.len() {
            let (done, rest) = groups.split_at_mut(i);
            rest[0].calculate(done.last().unwrap_or(input));
        }

        if let Some(back) = self.hidden.last() {
            self.output.layers_mut()[0].calculate(back);
        }
    }

    /// Output errors against `category`, then hidden errors back to front
    pub(crate) fn backward(&mut self, category: &str) {
        let output = &mut self.output.layers_mut()[0];
        output.update_category(category);

        let groups = self.hidden.layers_mut();
        if let Some(back) = groups.last_mut() {
            back.update(output);
        }
        for j in (1..groups.len()).rev() {
            let (before, after) = groups.split_at_mut(j);
            before[j - 1].update(&after[0]);
        }
    }

    /// Gradient step on every layer that owns synapses
    pub(crate) fn update_weights(&mut self) {
        let rate = self.learning_rate;
        let input = &self.input.layers()[0];
        let groups = self.hidden.layers_mut();
        for i in 0..groups.len() {
            let (done, rest) = groups.split_at_mut(i);
            rest[0].update_weight(done.last().unwrap_or(input), rate);
        }

        if let Some(back) = self.hidden.last() {
            self.output.layers_mut()[0].update_weight(back, rate);
        }
    }

    // === Inference ===

    /// Classify an already decoded sample: forward pass only, then the
    /// categories of the output neuron with the largest value
    pub fn classify(&mut self, pixels: &[f64]) -> Result<Vec<String>, NetworkError> {
        let len = self.input_layer().size();
        if pixels.len() != len {
            return Err(NetworkError::OutOfRange {
                position: pixels.len(),
                len,
            });
        }

        self.inject(pixels)?;
        self.forward();
        log::debug!("Output values: {:?}", self.outputs());

        let output = self.output_layer();
        Ok(output
            .winner()
            .and_then(|position| output.get(position))
            .map(|neuron| neuron.categories().to_vec())
            .unwrap_or_default())
    }

    /// Classify the sample at `sample`; empty if it does not exist or
    /// cannot be decoded
    pub fn perception<P: AsRef<Path>>(&mut self, sample: P) -> Vec<String> {
        self.perception_with(sample, &ImageDecoder)
    }

    pub fn perception_with<P: AsRef<Path>>(
        &mut self,
        sample: P,
        decoder: &dyn SampleDecoder,
    ) -> Vec<String> {
        self.infer(sample.as_ref(), decoder).unwrap_or_default()
    }

    /// `None` when the sample was rejected before the forward pass
    pub(crate) fn infer(&mut self, sample: &Path, decoder: &dyn SampleDecoder) -> Option<Vec<String>> {
        if !sample.exists() {
            log::warn!("Sample {} does not exist", sample.display());
            return None;
        }

        let pixels = decoder.decode(sample)?;
        match self.classify(&pixels) {
            Ok(categories) => Some(categories),
            Err(e) => {
                log::warn!("Sample {} rejected: {}", sample.display(), e);
                None
            }
        }
    }
}

fn check_shapes(input: &Stage, hidden: &Stage, output: &Stage) -> Result<(), NetworkError> {
    for (name, stage, shape) in [
        ("input", input, Shape::Single),
        ("hidden", hidden, Shape::Grouped),
        ("output", output, Shape::Single),
    ] {
        if stage.shape() != shape {
            return Err(NetworkError::Structure(format!(
                "{} stage must be {:?}, got {:?}",
                name,
                shape,
                stage.shape()
            )));
        }
        if !stage.is_initialized() || stage.is_empty() {
            return Err(NetworkError::Structure(format!(
                "{} stage is not initialized",
                name
            )));
        }
        if stage.layers().iter().any(Layer::is_empty) {
            return Err(NetworkError::Structure(format!(
                "{} stage has an empty layer",
                name
            )));
        }
    }
    Ok(())
}
