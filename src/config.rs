//! Configuration loader for network topology and training sessions.
//!
//! Reads JSON files, or YAML when the extension is `.yaml`/`.yml`.

use crate::error::NetworkError;
use crate::neural::{Activation, Network, Stage};
use crate::neural::activation::LEARNING_RATE_DEFAULT;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub dimensions: Dimensions,
    /// Category names, in output-neuron order
    #[serde(rename = "category")]
    pub categories: Vec<String>,
    pub topology: TopologyConfig,
    /// Training epochs
    pub epoch: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Seed for weight initialisation (random when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub activation: Activation,
}

/// Sample image size in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    pub layers: LayersConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayersConfig {
    pub input: LayerSizes,
    pub hidden: LayerSizes,
    pub output: LayerSizes,
}

/// A layer given as one size or as a list of group sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerSizes {
    One(i64),
    Many(Vec<i64>),
}

impl LayerSizes {
    fn as_slice(&self) -> &[i64] {
        match self {
            LayerSizes::One(size) => std::slice::from_ref(size),
            LayerSizes::Many(sizes) => sizes,
        }
    }

    /// Sizes as unsigned counts; a negative entry is a parse error
    pub fn sizes(&self, name: &str) -> Result<Vec<usize>, NetworkError> {
        self.as_slice()
            .iter()
            .map(|&size| {
                usize::try_from(size).map_err(|_| {
                    NetworkError::Parse(format!("size of neurons in {} layer is < 0", name))
                })
            })
            .collect()
    }

    /// Size of a single-shape layer
    pub fn single(&self, name: &str) -> Result<usize, NetworkError> {
        match self.sizes(name)?.as_slice() {
            [size] => Ok(*size),
            _ => Err(NetworkError::Parse(format!(
                "{} layer must have exactly one size",
                name
            ))),
        }
    }
}

fn default_learning_rate() -> f64 {
    LEARNING_RATE_DEFAULT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dimensions: Dimensions {
                width: 16,
                height: 16,
            },
            categories: vec!["cat".to_string(), "dog".to_string()],
            topology: TopologyConfig {
                layers: LayersConfig {
                    input: LayerSizes::One(256),
                    hidden: LayerSizes::Many(vec![32]),
                    output: LayerSizes::One(2),
                },
            },
            epoch: 10,
            learning_rate: LEARNING_RATE_DEFAULT,
            seed: None,
            activation: Activation::Sigmoid,
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

impl Config {
    /// Load configuration from a JSON or YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, NetworkError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(NetworkError::FileNotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config = if is_yaml(path) {
            Self::from_yaml(&contents)?
        } else {
            Self::from_json(&contents)?
        };
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self, NetworkError> {
        let config: Config =
            serde_json::from_str(contents).map_err(|e| NetworkError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, NetworkError> {
        let config: Config =
            serde_yaml::from_str(contents).map_err(|e| NetworkError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration, as YAML for `.yaml`/`.yml` paths and JSON otherwise
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), NetworkError> {
        let path = path.as_ref();
        let contents = if is_yaml(path) {
            serde_yaml::to_string(self).map_err(|e| NetworkError::Parse(e.to_string()))?
        } else {
            serde_json::to_string_pretty(self).map_err(|e| NetworkError::Parse(e.to_string()))?
        };
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), NetworkError> {
        if self.categories.is_empty() {
            return Err(NetworkError::Parse("category list is empty".to_string()));
        }
        if self.dimensions.width < 0 || self.dimensions.height < 0 {
            return Err(NetworkError::Parse("dimensions must be >= 0".to_string()));
        }
        self.pixel_count()?;
        let layers = &self.topology.layers;
        layers.input.single("input")?;
        layers.output.single("output")?;
        if layers.hidden.sizes("hidden")?.is_empty() {
            return Err(NetworkError::Parse("hidden layer has no groups".to_string()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(NetworkError::Parse("learning_rate must be > 0".to_string()));
        }
        Ok(())
    }

    /// Pixels per sample, `width × height`
    pub fn pixel_count(&self) -> Result<usize, NetworkError> {
        self.dimensions
            .width
            .checked_mul(self.dimensions.height)
            .and_then(|count| usize::try_from(count).ok())
            .ok_or_else(|| {
                NetworkError::Parse(format!(
                    "dimensions {}x{} are out of range",
                    self.dimensions.width, self.dimensions.height
                ))
            })
    }

    /// Input size: always `width × height`
    pub fn input_size(&self) -> Result<usize, NetworkError> {
        let computed = self.pixel_count()?;
        let declared = self.topology.layers.input.single("input")?;
        if declared != computed {
            log::warn!(
                "dimensions.width * dimensions.height != topology.layers.input size, set to {}",
                computed
            );
        }
        Ok(computed)
    }

    /// Output size: always the number of categories
    pub fn output_size(&self) -> Result<usize, NetworkError> {
        let computed = self.categories.len();
        let declared = self.topology.layers.output.single("output")?;
        if declared != computed {
            log::warn!(
                "category count != topology.layers.output size, set to {}",
                computed
            );
        }
        Ok(computed)
    }

    pub fn hidden_sizes(&self) -> Result<Vec<usize>, NetworkError> {
        self.topology.layers.hidden.sizes("hidden")
    }

    /// Construct and wire the network described by this configuration
    pub fn network(&self) -> Result<Network, NetworkError> {
        let mut input = Stage::single().with_activation(self.activation);
        input.create(self.input_size()?);

        let mut hidden = Stage::grouped().with_activation(self.activation);
        for size in self.hidden_sizes()? {
            hidden.create(size);
        }

        let mut output = Stage::single().with_activation(self.activation);
        output.create(self.output_size()?);

        let mut network = match self.seed {
            Some(seed) => Network::new_with_seed(input, hidden, output, seed)?,
            None => Network::new(input, hidden, output)?,
        };
        network.set_categories(&self.categories);
        network.set_epoch(self.epoch);
        network.set_learning_rate(self.learning_rate);
        Ok(network)
    }

    /// Construct the network and attach it to the dataset at `dataset`
    pub fn build_network<P: AsRef<Path>>(&self, dataset: P) -> Result<Network, NetworkError> {
        let dataset = dataset.as_ref();
        if !dataset.is_dir() {
            return Err(NetworkError::FolderNotFound(dataset.to_path_buf()));
        }

        let mut network = self.network()?;
        network.set_dataset(dataset);
        Ok(network)
    }
}
